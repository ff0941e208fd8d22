//! PPZFA Estimator - оценка стоимости участка по параметрам зонирования

pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod predictor;
pub mod preprocessing;
pub mod prompt;
pub mod types;

pub use types::*;
pub use models::*;
pub use preprocessing::*;

// Re-export для удобства
pub use config::{EstimatorConfig, ForestConfig};
pub use dataset::TransactionTable;
pub use error::{EstimatorError, Result};
pub use pipeline::TrainedPipeline;
pub use predictor::{TrainingDiagnostics, ValuePredictor};
