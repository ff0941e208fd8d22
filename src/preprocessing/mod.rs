/// Модуль предобработки данных

pub mod encoding;
pub mod normalization;
pub mod statistics;

pub use encoding::OneHotEncoder;
pub use normalization::StandardScaler;
pub use statistics::{
    CategoryStats, ColumnStats, FeatureStats, TargetStats, TrainingFrame, TrainingStatistics,
};

use ndarray::{s, Array1, Array2};

use crate::error::PreprocessError;
use crate::types::{FeatureSchema, PredictionInput};

/// Преобразование строки признаков в числовой вектор.
///
/// Раскладка выхода фиксирована: стандартизованные числовые признаки
/// в порядке схемы, затем one-hot блоки категориальных признаков.
#[derive(Debug, Clone)]
pub struct FeaturePreprocessor {
    schema: FeatureSchema,
    scaler: StandardScaler,
    encoder: OneHotEncoder,
    is_fitted: bool,
}

impl FeaturePreprocessor {
    pub fn new(schema: FeatureSchema) -> Self {
        Self {
            schema,
            scaler: StandardScaler::new(),
            encoder: OneHotEncoder::new(),
            is_fitted: false,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Обучение целиком заменяет предыдущее состояние
    pub fn fit(&mut self, frame: &TrainingFrame) -> Result<(), PreprocessError> {
        self.check_frame(frame)?;

        let mut scaler = StandardScaler::new();
        scaler.fit(&frame.numeric)?;
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&frame.categorical)?;

        self.scaler = scaler;
        self.encoder = encoder;
        self.is_fitted = true;

        tracing::debug!(
            "Preprocessor fitted: {} numeric + {} one-hot columns",
            self.scaler.n_features(),
            self.encoder.width()
        );
        Ok(())
    }

    pub fn n_outputs(&self) -> usize {
        self.scaler.n_features() + self.encoder.width()
    }

    /// Имена выходных колонок в порядке выхода
    pub fn feature_names(&self) -> Vec<String> {
        self.schema
            .numeric_features()
            .iter()
            .cloned()
            .chain(self.encoder.feature_names(self.schema.categorical_features()))
            .collect()
    }

    /// Пакетное преобразование обучающей матрицы
    pub fn transform(&self, frame: &TrainingFrame) -> Result<Array2<f64>, PreprocessError> {
        if !self.is_fitted {
            return Err(PreprocessError::NotFitted);
        }
        self.check_frame(frame)?;

        let n_numeric = self.scaler.n_features();
        let mut out = Array2::zeros((frame.n_samples(), self.n_outputs()));
        out.slice_mut(s![.., ..n_numeric])
            .assign(&self.scaler.transform(&frame.numeric)?);

        let mut row_values: Vec<&str> = Vec::with_capacity(frame.categorical.len());
        let mut encoded = vec![0.0; self.encoder.width()];
        for i in 0..frame.n_samples() {
            row_values.clear();
            row_values.extend(frame.categorical.iter().map(|column| column[i].as_str()));
            self.encoder.encode_into(&row_values[..], &mut encoded)?;
            for (j, v) in encoded.iter().enumerate() {
                out[[i, n_numeric + j]] = *v;
            }
        }

        Ok(out)
    }

    /// Преобразование одной строки запроса; чистая функция от обученного состояния
    pub fn transform_row(&self, input: &PredictionInput) -> Result<Array1<f64>, PreprocessError> {
        if !self.is_fitted {
            return Err(PreprocessError::NotFitted);
        }

        let numeric = self
            .schema
            .numeric_features()
            .iter()
            .map(|name| match input.get(name) {
                None => Err(PreprocessError::MissingFeature(name.clone())),
                Some(value) => value.as_numeric().ok_or_else(|| PreprocessError::WrongKind {
                    feature: name.clone(),
                    expected: "numeric",
                }),
            })
            .collect::<Result<Array1<f64>, _>>()?;

        let categories = self
            .schema
            .categorical_features()
            .iter()
            .map(|name| match input.get(name) {
                None => Err(PreprocessError::MissingFeature(name.clone())),
                Some(value) => value.as_category().ok_or_else(|| PreprocessError::WrongKind {
                    feature: name.clone(),
                    expected: "categorical",
                }),
            })
            .collect::<Result<Vec<&str>, _>>()?;

        let scaled = self.scaler.transform_row(numeric.view())?;
        let encoded = self.encoder.encode(&categories[..])?;

        Ok(scaled.iter().copied().chain(encoded).collect())
    }

    fn check_frame(&self, frame: &TrainingFrame) -> Result<(), PreprocessError> {
        let n_samples = frame.n_samples();
        if n_samples == 0 {
            return Err(PreprocessError::EmptyInput);
        }
        if frame.numeric.ncols() != self.schema.numeric_features().len()
            || frame.categorical.len() != self.schema.categorical_features().len()
        {
            return Err(PreprocessError::ShapeMismatch {
                expected: format!(
                    "{} numeric + {} categorical columns",
                    self.schema.numeric_features().len(),
                    self.schema.categorical_features().len()
                ),
                actual: format!(
                    "{} numeric + {} categorical columns",
                    frame.numeric.ncols(),
                    frame.categorical.len()
                ),
            });
        }
        if frame.numeric.nrows() != n_samples || frame.categorical.iter().any(|c| c.len() != n_samples) {
            return Err(PreprocessError::ShapeMismatch {
                expected: format!("{} rows", n_samples),
                actual: "columns of differing length".to_string(),
            });
        }
        Ok(())
    }
}
