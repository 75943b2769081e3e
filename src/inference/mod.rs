pub mod service;
pub mod types;

pub use service::{argmax, classify, InferenceService};
pub use types::{ClassificationReport, PredictionResult};
