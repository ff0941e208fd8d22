//! Статистика обучающих данных и подготовка матрицы для обучения

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use serde::Serialize;

use crate::dataset::TransactionTable;
use crate::error::{EstimatorError, TrainingError};
use crate::types::{FeatureSchema, MISSING_CATEGORY};

/// Сводка по числовому признаку (до импутации)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureStats {
    pub median: f64,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Наблюдаемые значения категориального признака, в порядке появления
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub unique_values: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TargetStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnStats {
    Numeric(FeatureStats),
    Categorical(CategoryStats),
}

/// Статистика, вычисленная один раз при обучении; далее только чтение
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingStatistics {
    columns: HashMap<String, ColumnStats>,
    target: TargetStats,
}

/// Рабочая копия датасета после импутации
#[derive(Debug, Clone)]
pub struct TrainingFrame {
    /// Числовые признаки, колонки в порядке схемы
    pub numeric: Array2<f64>,
    /// Категориальные признаки по колонкам, пропуски заменены на "NONE"
    pub categorical: Vec<Vec<String>>,
    pub target: Array1<f64>,
}

impl TrainingFrame {
    pub fn n_samples(&self) -> usize {
        self.target.len()
    }
}

impl TrainingStatistics {
    /// Считает статистику и возвращает импутированную рабочую копию данных
    pub fn compute(
        schema: &FeatureSchema,
        table: &TransactionTable,
    ) -> Result<(Self, TrainingFrame), EstimatorError> {
        table.require_columns(&schema.required_columns())?;

        let n_samples = table.n_rows();
        if n_samples == 0 {
            return Err(TrainingError::EmptyDataset.into());
        }

        let mut columns = HashMap::new();
        let mut numeric = Array2::zeros((n_samples, schema.numeric_features().len()));

        for (j, name) in schema.numeric_features().iter().enumerate() {
            let mut raw: Vec<Option<f64>> = Vec::with_capacity(n_samples);
            for (i, cell) in column(table, name)?.iter().enumerate() {
                let value = cell.as_deref().and_then(coerce_numeric);
                if value.map_or(false, f64::is_infinite) {
                    return Err(TrainingError::NonFiniteValue {
                        column: name.clone(),
                        row: i,
                    }
                    .into());
                }
                raw.push(value);
            }

            let observed: Vec<f64> = raw.iter().flatten().copied().collect();
            if observed.is_empty() {
                return Err(TrainingError::NoNumericValues(name.clone()).into());
            }

            let stats = FeatureStats {
                median: median(&observed),
                mean: mean(&observed),
                std: sample_std(&observed),
                min: observed.iter().copied().fold(f64::INFINITY, f64::min),
                max: observed.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            };

            let n_missing = n_samples - observed.len();
            if n_missing > 0 {
                tracing::debug!("Imputing {} missing '{}' values with median {:.2}", n_missing, name, stats.median);
            }

            for (i, value) in raw.iter().enumerate() {
                numeric[[i, j]] = value.unwrap_or(stats.median);
            }

            columns.insert(name.clone(), ColumnStats::Numeric(stats));
        }

        let mut categorical = Vec::with_capacity(schema.categorical_features().len());
        for name in schema.categorical_features() {
            let filled: Vec<String> = column(table, name)?
                .iter()
                .map(|cell| cell.clone().unwrap_or_else(|| MISSING_CATEGORY.to_string()))
                .collect();

            let mut unique_values: Vec<String> = Vec::new();
            for value in &filled {
                if !unique_values.contains(value) {
                    unique_values.push(value.clone());
                }
            }

            columns.insert(
                name.clone(),
                ColumnStats::Categorical(CategoryStats { unique_values }),
            );
            categorical.push(filled);
        }

        // Целевую колонку не импутируем: пропуск здесь означает ошибку обучения
        let target_name = schema.target();
        let mut target = Array1::zeros(n_samples);
        for (i, cell) in column(table, target_name)?.iter().enumerate() {
            target[i] = cell
                .as_deref()
                .and_then(coerce_numeric)
                .filter(|v| v.is_finite())
                .ok_or_else(|| TrainingError::InvalidTarget {
                    column: target_name.to_string(),
                    row: i,
                })?;
        }

        let target_values = target.to_vec();
        let target_stats = TargetStats {
            mean: mean(&target_values),
            std: sample_std(&target_values),
            min: target_values.iter().copied().fold(f64::INFINITY, f64::min),
            max: target_values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        };

        Ok((
            Self {
                columns,
                target: target_stats,
            },
            TrainingFrame {
                numeric,
                categorical,
                target,
            },
        ))
    }

    pub fn numeric(&self, name: &str) -> Option<&FeatureStats> {
        match self.columns.get(name) {
            Some(ColumnStats::Numeric(stats)) => Some(stats),
            _ => None,
        }
    }

    pub fn categorical(&self, name: &str) -> Option<&CategoryStats> {
        match self.columns.get(name) {
            Some(ColumnStats::Categorical(stats)) => Some(stats),
            _ => None,
        }
    }

    pub fn target(&self) -> &TargetStats {
        &self.target
    }
}

fn column<'a>(table: &'a TransactionTable, name: &str) -> Result<&'a [Option<String>], EstimatorError> {
    table
        .column(name)
        .ok_or_else(|| crate::error::DataLoadError::MissingColumns(vec![name.to_string()]).into())
}

/// Нечисловые значения считаются пропусками; бесконечность возвращается как есть
fn coerce_numeric(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Выборочное стандартное отклонение (n - 1); для одного значения NaN
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
