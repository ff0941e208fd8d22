//! Ошибки загрузки данных, обучения и предсказания

use std::path::PathBuf;

use thiserror::Error;

/// Ошибки чтения датасета сделок
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("failed to read dataset {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Ошибки слоя предобработки признаков
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("preprocessor not fitted")]
    NotFitted,

    #[error("required feature '{0}' is absent from the row")]
    MissingFeature(String),

    #[error("feature '{feature}' expects a {expected} value")]
    WrongKind {
        feature: String,
        expected: &'static str,
    },

    #[error("empty dataset")]
    EmptyInput,

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },
}

/// Ошибки регрессионной модели
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("empty dataset")]
    EmptyDataset,

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("target contains non-finite values")]
    NonFiniteTarget,

    #[error("input contains non-finite values")]
    NonFiniteFeature,

    #[error("model not trained")]
    NotFitted,
}

/// Ошибки связки "предобработка + модель"
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Ошибки обучения на корректно прочитанном датасете
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("dataset contains no rows")]
    EmptyDataset,

    #[error("column '{0}' has no numeric values")]
    NoNumericValues(String),

    #[error("target column '{column}' has an invalid value at row {row}")]
    InvalidTarget { column: String, row: usize },

    #[error("column '{column}' contains infinity at row {row}")]
    NonFiniteValue { column: String, row: usize },

    #[error("model fit failed: {0}")]
    Fit(#[from] PipelineError),
}

/// Ошибки фасада предсказателя
#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("failed to load data: {0}")]
    DataLoad(#[from] DataLoadError),

    #[error("error training model: {0}")]
    Training(#[from] TrainingError),

    #[error("model must be trained before making predictions")]
    UntrainedModel,

    #[error("invalid input: {0}")]
    InputValidation(String),

    #[error("error making prediction: {0}")]
    Prediction(#[source] PipelineError),
}

pub type Result<T, E = EstimatorError> = std::result::Result<T, E>;
