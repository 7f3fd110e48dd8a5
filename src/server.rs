use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::task;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::{
    config::AppConfig,
    error::ServiceError,
    handler::RequestHandler,
    model::{AllPredictions, FeatureMap, ModelRegistry, ProductScore, RegistryMetadata},
    synthetic::random_features,
    telemetry::Telemetry,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub handler: RequestHandler,
    pub telemetry: Telemetry,
}

#[derive(Debug, Default, Deserialize)]
pub struct PredictQuery {
    pub product: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PredictResponse {
    Product(ProductScore),
    All(AllPredictions),
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct MetadataResponse {
    #[serde(flatten)]
    registry: RegistryMetadata,
    model_dir: String,
    metrics_enabled: bool,
}

#[derive(Serialize)]
struct SyntheticResponse {
    input: FeatureMap,
    result: Value,
}

pub fn build_router(
    config: Arc<AppConfig>,
    registry: Arc<ModelRegistry>,
    telemetry: Telemetry,
) -> Router {
    let metrics_route = telemetry.is_enabled();
    let state = AppState {
        handler: RequestHandler::new(registry),
        telemetry,
        config,
    };

    let mut router = Router::new()
        .route("/service-status", get(service_status))
        .route("/predict", post(predict))
        .route("/test_all", get(test_all))
        .route("/metadata", get(metadata));
    if metrics_route {
        router = router.route("/metrics", get(metrics));
    }

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn respond<T: Serialize>(config: &AppConfig, result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(err) if config.legacy_status_codes => err.into_legacy_response(),
        Err(err) => err.into_response(),
    }
}

async fn service_status() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

/// Takes the product from the query string, falling back to a `product`
/// field in the body. The remaining body fields are the feature map.
fn split_request(
    query: PredictQuery,
    mut body: Map<String, Value>,
) -> Result<(Option<String>, FeatureMap), ServiceError> {
    let body_product = match body.remove("product") {
        None => None,
        Some(Value::String(product)) => Some(product),
        Some(other) => {
            return Err(ServiceError::BadRequest(format!(
                "product must be a string, got {other}"
            )));
        }
    };
    let product = query
        .product
        .filter(|p| !p.is_empty())
        .or(body_product.filter(|p| !p.is_empty()));

    let features = FeatureMap::try_from(body).map_err(|err| {
        debug!(feature = %err.0, "non-scalar feature value");
        ServiceError::InvalidParameters
    })?;
    Ok((product, features))
}

fn run_prediction(
    handler: &RequestHandler,
    telemetry: &Telemetry,
    product: Option<String>,
    features: FeatureMap,
) -> Result<PredictResponse, ServiceError> {
    let result = match product {
        Some(product) => handler
            .handle(&product, &features)
            .inspect(|scored| telemetry.record_scores([scored.score]))
            .map(PredictResponse::Product),
        None => handler
            .handle_all(&features)
            .inspect(|all| telemetry.record_scores(all.predictions.values().copied()))
            .map(PredictResponse::All),
    };
    telemetry.refresh_host_gauges();
    result
}

async fn predict(
    State(state): State<AppState>,
    query: Result<Query<PredictQuery>, QueryRejection>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Response {
    let parts = match (query, body) {
        (Ok(Query(query)), Ok(Json(body))) => split_request(query, body),
        (Err(rejection), _) => Err(ServiceError::BadRequest(rejection.body_text())),
        (_, Err(rejection)) => Err(ServiceError::BadRequest(rejection.body_text())),
    };
    let (product, features) = match parts {
        Ok(parts) => parts,
        Err(err) => return respond::<PredictResponse>(&state.config, Err(err)),
    };

    let handler = state.handler.clone();
    let telemetry = state.telemetry.clone();
    let result = task::spawn_blocking(move || {
        run_prediction(&handler, &telemetry, product, features)
    })
    .await
    .unwrap_or_else(|err| Err(ServiceError::Internal(err.to_string())));

    respond(&state.config, result)
}

async fn test_all(State(state): State<AppState>) -> Json<SyntheticResponse> {
    let input = random_features(&mut rand::thread_rng());

    let handler = state.handler.clone();
    let telemetry = state.telemetry.clone();
    let features = input.clone();
    let result = task::spawn_blocking(move || {
        run_prediction(&handler, &telemetry, None, features)
    })
    .await
    .unwrap_or_else(|err| Err(ServiceError::Internal(err.to_string())));
    let result = match result {
        Ok(predictions) => serde_json::to_value(predictions).unwrap_or(Value::Null),
        Err(err) => err.body(),
    };
    info!(products = state.handler.registry().len(), "served synthetic prediction");

    Json(SyntheticResponse { input, result })
}

async fn metadata(State(state): State<AppState>) -> Json<MetadataResponse> {
    Json(MetadataResponse {
        registry: state.handler.registry().metadata(),
        model_dir: state.config.model_dir.display().to_string(),
        metrics_enabled: state.telemetry.is_enabled(),
    })
}

async fn metrics(State(state): State<AppState>) -> Result<String, ServiceError> {
    state
        .telemetry
        .render()
        .ok_or_else(|| ServiceError::Metrics("exporter not installed".into()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test bodies are objects"),
        }
    }

    #[test]
    fn query_product_wins_over_body() {
        let query = PredictQuery {
            product: Some("from_query".into()),
        };
        let (product, features) =
            split_request(query, body(json!({"product": "from_body", "age": 1}))).unwrap();
        assert_eq!(product.as_deref(), Some("from_query"));
        assert!(!features.contains("product"));
        assert!(features.contains("age"));
    }

    #[test]
    fn body_product_is_used_and_stripped() {
        let (product, features) =
            split_request(PredictQuery::default(), body(json!({"product": "A", "age": 1})))
                .unwrap();
        assert_eq!(product.as_deref(), Some("A"));
        assert_eq!(features.len(), 1);
    }

    #[test]
    fn empty_product_means_all_products() {
        let query = PredictQuery {
            product: Some(String::new()),
        };
        let (product, _) = split_request(query, body(json!({"age": 1}))).unwrap();
        assert!(product.is_none());
    }

    #[test]
    fn non_string_product_is_rejected() {
        let err = split_request(PredictQuery::default(), body(json!({"product": 3}))).unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[test]
    fn nested_feature_is_invalid_parameters() {
        let err =
            split_request(PredictQuery::default(), body(json!({"age": {"years": 3}}))).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidParameters));
    }
}
