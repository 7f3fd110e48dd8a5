use std::{collections::BTreeMap, sync::Arc};

use tracing::{debug, warn};

use crate::{
    error::{PredictionError, ServiceError},
    model::{AllPredictions, FeatureMap, ModelRegistry, ProductScore},
};

/// Validates feature maps and dispatches them to registered predictors.
#[derive(Clone)]
pub struct RequestHandler {
    registry: Arc<ModelRegistry>,
}

impl RequestHandler {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// True iff the key set of `features` is exactly the required schema.
    pub fn validate(&self, features: &FeatureMap) -> bool {
        let mismatch = self.registry.required_schema().mismatch(features);
        if mismatch.is_empty() {
            debug!("all required parameters are present");
            return true;
        }
        debug!(
            missing = ?mismatch.missing,
            unexpected = ?mismatch.unexpected,
            "missing or incorrect parameters"
        );
        false
    }

    /// Raw score from one product's predictor.
    pub fn predict_one(
        &self,
        product: &str,
        features: &FeatureMap,
    ) -> Result<f64, PredictionError> {
        let predictor = self.registry.get(product)?;
        let row = self.registry.required_schema().row(features);
        predictor
            .predict(&row)
            .map_err(|err| PredictionError::Invocation {
                product: product.to_string(),
                reason: err.to_string(),
            })
    }

    pub fn handle(
        &self,
        product: &str,
        features: &FeatureMap,
    ) -> Result<ProductScore, ServiceError> {
        if !self.validate(features) {
            return Err(ServiceError::InvalidParameters);
        }

        let score = self.predict_one(product, features).map_err(|err| {
            warn!(product, error = %err, "prediction request failed");
            ServiceError::from(err)
        })?;

        Ok(ProductScore {
            product: product.to_string(),
            score,
        })
    }

    /// Scores every registered product. The first failing product aborts the
    /// whole batch and no partial results are returned.
    pub fn handle_all(&self, features: &FeatureMap) -> Result<AllPredictions, ServiceError> {
        if !self.validate(features) {
            return Err(ServiceError::InvalidParameters);
        }

        let mut predictions = BTreeMap::new();
        for product in self.registry.products() {
            let score = self.predict_one(product, features).map_err(|err| {
                warn!(product, error = %err, "batch prediction aborted");
                ServiceError::from(err)
            })?;
            debug!(product, score, "scored product");
            predictions.insert(product.to_string(), score);
        }

        Ok(AllPredictions { predictions })
    }
}
