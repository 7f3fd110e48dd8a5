use crate::{error::InferenceError, model::FeatureRow};

/// A trained per-product classifier.
///
/// Implementations are built once by an [`ArtifactLoader`](crate::model::ArtifactLoader)
/// and shared read-only across requests, hence `Send + Sync`.
pub trait Predictor: Send + Sync {
    /// Scores one row. The output is returned to callers unmodified.
    fn predict(&self, row: &FeatureRow) -> Result<f64, InferenceError>;
}

impl<F> Predictor for F
where
    F: Fn(&FeatureRow) -> Result<f64, InferenceError> + Send + Sync,
{
    fn predict(&self, row: &FeatureRow) -> Result<f64, InferenceError> {
        self(row)
    }
}
