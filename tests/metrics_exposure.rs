//! Exercises the installed Prometheus recorder. The recorder is process-global,
//! so this binary holds a single test.
use std::{fs, sync::Arc};

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::json;
use tower::ServiceExt;

use product_scoring_service::{
    AppConfig, ModelRegistry, Telemetry, build_router,
    model::{FeatureSchema, JsonArtifactLoader},
};

#[tokio::test]
async fn predictions_show_up_on_metrics_route() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("A_model.json"), r#"{"kind": "logistic"}"#).unwrap();
    let config = AppConfig {
        model_dir: dir.path().to_path_buf(),
        metrics_enabled: true,
        ..AppConfig::default()
    };

    let telemetry = Telemetry::init(&config);
    assert!(telemetry.is_enabled());

    let registry = ModelRegistry::load(
        &config.model_dir,
        &JsonArtifactLoader,
        FeatureSchema::default(),
    );
    let router = build_router(Arc::new(config), Arc::new(registry), telemetry);

    let features = json!({
        "ind_empleado": "N",
        "sexo": "V",
        "age": 30,
        "ind_nuevo": 0,
        "antiguedad": 60,
        "indrel": 1,
        "tiprel_1mes": "A",
        "indresi": 1,
        "indext": 1,
        "canal_entrada": "KHE",
        "indfall": 1,
        "tipodom": 1,
        "nomprov": "MADRID",
        "ind_actividad_cliente": 1,
        "renta": 45000,
        "segmento": "02 - PARTICULARES",
        "ind_ahor_fin_ult1": 0
    });
    let request = Request::builder()
        .method("POST")
        .uri("/predict?product=A")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(features.to_string()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains("product_predictions_bucket"), "{text}");
    assert!(text.contains("custom_memory_usage_percent"), "{text}");
}
