pub mod config;
pub mod error;
pub mod handler;
pub mod model;
pub mod server;
pub mod synthetic;
pub mod telemetry;

pub use config::AppConfig;
pub use error::ServiceError;
pub use handler::RequestHandler;
pub use model::{FeatureMap, FeatureValue, ModelRegistry, Predictor};
pub use server::build_router;
pub use telemetry::Telemetry;
