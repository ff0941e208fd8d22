//! Фасад предсказателя: обучение, проверка входа, предсказание

use std::path::Path;

use serde::Serialize;

use crate::config::EstimatorConfig;
use crate::dataset::TransactionTable;
use crate::error::{EstimatorError, Result, TrainingError};
use crate::models::{RandomForestRegressor, Regressor};
use crate::pipeline::TrainedPipeline;
use crate::preprocessing::{FeatureStats, TrainingStatistics};
use crate::types::{
    ConfidenceLevel, FeatureSchema, FeatureValue, PredictionInput, PredictionResult, BASE_FAR, LOT_AREA,
};

/// Диагностика обучения, только для отчетов
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingDiagnostics {
    pub n_samples: usize,
    pub n_estimators: Option<usize>,
    pub oob_score: Option<f64>,
    pub top_features: Vec<(String, f64)>,
    pub target_range: (f64, f64),
    pub feature_ranges: Vec<(String, f64, f64)>,
}

#[derive(Debug, Clone)]
struct TrainedState<R> {
    pipeline: TrainedPipeline<R>,
    statistics: TrainingStatistics,
    diagnostics: TrainingDiagnostics,
}

#[derive(Debug, Clone)]
enum PredictorState<R> {
    Untrained,
    Trained(Box<TrainedState<R>>),
}

/// Единственная точка входа для вызывающего кода.
///
/// Переобучение строит новое состояние целиком и только потом заменяет
/// старое; при ошибке обучения предыдущее состояние сохраняется.
#[derive(Debug, Clone)]
pub struct ValuePredictor<R = RandomForestRegressor> {
    schema: FeatureSchema,
    model: R,
    top_features: usize,
    state: PredictorState<R>,
}

impl ValuePredictor<RandomForestRegressor> {
    pub fn new() -> Self {
        Self::from_config(&EstimatorConfig::default())
    }

    pub fn from_config(config: &EstimatorConfig) -> Self {
        Self::with_model(FeatureSchema::transactions(), config.forest.build())
            .with_top_features(config.top_features)
    }
}

impl Default for ValuePredictor<RandomForestRegressor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Regressor + Clone> ValuePredictor<R> {
    /// `model` - необученный шаблон; каждое обучение работает с его копией
    pub fn with_model(schema: FeatureSchema, model: R) -> Self {
        Self {
            schema,
            model,
            top_features: 10,
            state: PredictorState::Untrained,
        }
    }

    pub fn with_top_features(mut self, top_features: usize) -> Self {
        self.top_features = top_features;
        self
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.state, PredictorState::Trained(_))
    }

    pub fn statistics(&self) -> Option<&TrainingStatistics> {
        self.trained().ok().map(|state| &state.statistics)
    }

    pub fn diagnostics(&self) -> Option<&TrainingDiagnostics> {
        self.trained().ok().map(|state| &state.diagnostics)
    }

    pub fn train_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let table = TransactionTable::from_path(path)?;
        self.train(&table)
    }

    pub fn train(&mut self, table: &TransactionTable) -> Result<()> {
        let (statistics, frame) = TrainingStatistics::compute(&self.schema, table)?;

        tracing::info!("Training model on {} samples...", frame.n_samples());
        let pipeline = TrainedPipeline::fit(self.schema.clone(), &frame, self.model.clone())
            .map_err(TrainingError::Fit)?;

        let diagnostics = self.collect_diagnostics(frame.n_samples(), &pipeline, &statistics);
        log_diagnostics(&diagnostics);

        self.state = PredictorState::Trained(Box::new(TrainedState {
            pipeline,
            statistics,
            diagnostics,
        }));
        Ok(())
    }

    /// Предупреждения о выходе за диапазон обучающих данных.
    /// Не отклоняет вход: результат только информирует.
    pub fn validate_input(&self, input: &PredictionInput) -> Result<Vec<String>> {
        let state = self.trained()?;
        self.check_fields(input)?;
        Ok(self.range_warnings(&state.statistics, input))
    }

    pub fn predict(&self, input: &PredictionInput) -> Result<PredictionResult> {
        let state = self.trained()?;
        self.check_fields(input)?;

        let warnings = self.range_warnings(&state.statistics, input);
        let ppzfa = state
            .pipeline
            .predict(input)
            .map_err(EstimatorError::Prediction)?;

        let lot_area = required_numeric(input, LOT_AREA)?;
        let base_far = required_numeric(input, BASE_FAR)?;
        let total_value = ppzfa * lot_area * base_far;

        let confidence_level = ConfidenceLevel::from_warning_count(warnings.len());
        tracing::debug!(
            "Predicted PPZFA {:.2}, total value {:.2}, confidence {}",
            ppzfa,
            total_value,
            confidence_level
        );

        Ok(PredictionResult {
            ppzfa,
            total_value,
            confidence_level,
            warnings,
        })
    }

    fn trained(&self) -> Result<&TrainedState<R>> {
        match &self.state {
            PredictorState::Trained(state) => Ok(state.as_ref()),
            PredictorState::Untrained => Err(EstimatorError::UntrainedModel),
        }
    }

    /// Набор полей должен в точности совпадать со схемой
    fn check_fields(&self, input: &PredictionInput) -> Result<()> {
        if let Some(extra) = input
            .fields()
            .find(|name| !self.schema.is_numeric(name) && !self.schema.is_categorical(name))
        {
            return Err(EstimatorError::InputValidation(format!(
                "unexpected field '{}'",
                extra
            )));
        }

        for name in self.schema.numeric_features() {
            match input.get(name) {
                Some(FeatureValue::Numeric(v)) if v.is_finite() => {}
                Some(FeatureValue::Numeric(v)) => {
                    return Err(EstimatorError::InputValidation(format!(
                        "{} must be a finite number, got {}",
                        name, v
                    )))
                }
                Some(FeatureValue::Categorical(_)) => {
                    return Err(EstimatorError::InputValidation(format!(
                        "{} must be numeric",
                        name
                    )))
                }
                None => {
                    return Err(EstimatorError::InputValidation(format!(
                        "missing field '{}'",
                        name
                    )))
                }
            }
        }

        for name in self.schema.categorical_features() {
            match input.get(name) {
                Some(FeatureValue::Categorical(_)) => {}
                Some(FeatureValue::Numeric(_)) => {
                    return Err(EstimatorError::InputValidation(format!(
                        "{} must be categorical",
                        name
                    )))
                }
                None => {
                    return Err(EstimatorError::InputValidation(format!(
                        "missing field '{}'",
                        name
                    )))
                }
            }
        }

        Ok(())
    }

    fn range_warnings(&self, statistics: &TrainingStatistics, input: &PredictionInput) -> Vec<String> {
        self.schema
            .numeric_features()
            .iter()
            .filter_map(|name| {
                let value = input.numeric(name)?;
                let stats = statistics.numeric(name)?;
                range_warning(name, value, stats)
            })
            .collect()
    }

    fn collect_diagnostics(
        &self,
        n_samples: usize,
        pipeline: &TrainedPipeline<R>,
        statistics: &TrainingStatistics,
    ) -> TrainingDiagnostics {
        let top_features = pipeline
            .ranked_importances()
            .map(|ranked| ranked.into_iter().take(self.top_features).collect())
            .unwrap_or_default();

        let feature_ranges = self
            .schema
            .numeric_features()
            .iter()
            .filter_map(|name| {
                statistics
                    .numeric(name)
                    .map(|stats| (name.clone(), stats.min, stats.max))
            })
            .collect();

        let target = statistics.target();
        TrainingDiagnostics {
            n_samples,
            n_estimators: pipeline.n_estimators(),
            oob_score: pipeline.oob_score(),
            top_features,
            target_range: (target.min, target.max),
            feature_ranges,
        }
    }
}

/// Не более одного предупреждения на признак: min, затем max, затем 3 сигмы
fn range_warning(feature: &str, value: f64, stats: &FeatureStats) -> Option<String> {
    if value < stats.min {
        Some(format!(
            "{} ({}) is below training data minimum ({:.2})",
            feature, value, stats.min
        ))
    } else if value > stats.max {
        Some(format!(
            "{} ({}) is above training data maximum ({:.2})",
            feature, value, stats.max
        ))
    } else if (value - stats.mean).abs() > 3.0 * stats.std {
        Some(format!(
            "{} ({}) is more than 3 standard deviations from mean",
            feature, value
        ))
    } else {
        None
    }
}

fn required_numeric(input: &PredictionInput, name: &str) -> Result<f64> {
    input
        .numeric(name)
        .ok_or_else(|| EstimatorError::InputValidation(format!("missing field '{}'", name)))
}

fn log_diagnostics(diagnostics: &TrainingDiagnostics) {
    tracing::info!("Model trained on {} samples", diagnostics.n_samples);
    if let Some(score) = diagnostics.oob_score {
        tracing::info!("Out-of-bag score: {:.3}", score);
    }
    if let Some(n) = diagnostics.n_estimators {
        tracing::info!("Number of trees: {}", n);
    }

    for (feature, importance) in &diagnostics.top_features {
        tracing::info!("Feature importance {}: {:.3}", feature, importance);
    }

    let (min, max) = diagnostics.target_range;
    tracing::info!("PPZFA range: ${:.2} to ${:.2}", min, max);
    for (feature, min, max) in &diagnostics.feature_ranges {
        tracing::info!("{} range: {:.2} to {:.2}", feature, min, max);
    }
}
