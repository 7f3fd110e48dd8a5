pub mod loader;
mod predictor;
mod registry;
mod schema;
mod scorecard;
mod types;

pub use loader::{ArtifactLoader, JsonArtifactLoader};
pub use predictor::Predictor;
pub use registry::ModelRegistry;
pub use schema::{FeatureSchema, REQUIRED_FEATURES, SchemaMismatch};
pub use scorecard::{OutputKind, Scorecard};
pub use types::{
    AllPredictions, FeatureMap, FeatureRow, FeatureValue, NonScalarFeature, ProductScore,
    RegistryMetadata,
};
