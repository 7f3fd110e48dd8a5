use std::{collections::BTreeMap, path::Path, sync::Arc};

use tracing::{info, warn};

use crate::{
    config::AppConfig,
    error::PredictionError,
    model::{
        ArtifactLoader, FeatureSchema, JsonArtifactLoader, Predictor, RegistryMetadata,
        loader::scan_artifacts,
    },
};

/// Predictors indexed by product id. Immutable once built.
pub struct ModelRegistry {
    predictors: BTreeMap<String, Arc<dyn Predictor>>,
    schema: FeatureSchema,
}

impl ModelRegistry {
    pub fn initialize(config: &AppConfig) -> Self {
        Self::load(&config.model_dir, &JsonArtifactLoader, FeatureSchema::default())
    }

    /// Loads every artifact in `dir`. Artifacts that fail to load are logged
    /// and skipped; the registry keeps whatever subset succeeded.
    pub fn load(dir: &Path, loader: &dyn ArtifactLoader, schema: FeatureSchema) -> Self {
        let mut predictors: BTreeMap<String, Arc<dyn Predictor>> = BTreeMap::new();

        for artifact in scan_artifacts(dir, loader.extension()) {
            match loader.load(&artifact.path, &schema) {
                Ok(predictor) => {
                    predictors.insert(artifact.product, Arc::from(predictor));
                }
                Err(err) => {
                    warn!(
                        product = %artifact.product,
                        path = %artifact.path.display(),
                        error = %err,
                        "failed to load model artifact"
                    );
                }
            }
        }

        info!(dir = %dir.display(), count = predictors.len(), "loaded models");
        Self { predictors, schema }
    }

    pub fn from_predictors<I, S>(schema: FeatureSchema, predictors: I) -> Self
    where
        I: IntoIterator<Item = (S, Arc<dyn Predictor>)>,
        S: Into<String>,
    {
        Self {
            predictors: predictors
                .into_iter()
                .map(|(product, predictor)| (product.into(), predictor))
                .collect(),
            schema,
        }
    }

    pub fn get(&self, product: &str) -> Result<&dyn Predictor, PredictionError> {
        self.predictors
            .get(product)
            .map(Arc::as_ref)
            .ok_or_else(|| PredictionError::ProductNotFound(product.to_string()))
    }

    pub fn required_schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Product ids in ascending order.
    pub fn products(&self) -> impl Iterator<Item = &str> {
        self.predictors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.predictors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictors.is_empty()
    }

    pub fn metadata(&self) -> RegistryMetadata {
        RegistryMetadata {
            products: self.products().map(str::to_string).collect(),
            required_features: self.schema.names().to_vec(),
        }
    }
}
