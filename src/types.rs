/// Типы данных предсказателя

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const LOT_AREA: &str = "LOT AREA";
pub const LOT_FRONTAGE: &str = "LOT FRONTAGE";
pub const BASE_FAR: &str = "BASE FAR";
pub const PPZFA: &str = "PPZFA";

/// Значение категории для пропусков
pub const MISSING_CATEGORY: &str = "NONE";

/// Схема признаков: числовые, категориальные и целевая колонка
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    numeric_features: Vec<String>,
    categorical_features: Vec<String>,
    target: String,
}

impl FeatureSchema {
    /// Схема датасета сделок
    pub fn transactions() -> Self {
        Self {
            numeric_features: [LOT_AREA, LOT_FRONTAGE, BASE_FAR]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            categorical_features: [
                "BOROUGH",
                "NEIGHBORHOOD",
                "LOT TYPE",
                "ZONING 1",
                "ZONING 2",
                "OVERLAY 1",
                "OVERLAY 2",
                "SPECIAL DISTRICT",
                "MIH/VIH",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            target: PPZFA.to_string(),
        }
    }

    pub fn numeric_features(&self) -> &[String] {
        &self.numeric_features
    }

    pub fn categorical_features(&self) -> &[String] {
        &self.categorical_features
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Все признаки: сначала числовые, затем категориальные
    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.numeric_features
            .iter()
            .chain(self.categorical_features.iter())
            .map(String::as_str)
    }

    /// Признаки и целевая колонка
    pub fn required_columns(&self) -> Vec<&str> {
        self.features().chain(std::iter::once(self.target())).collect()
    }

    pub fn is_numeric(&self, name: &str) -> bool {
        self.numeric_features.iter().any(|f| f == name)
    }

    pub fn is_categorical(&self, name: &str) -> bool {
        self.categorical_features.iter().any(|f| f == name)
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::transactions()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Numeric(f64),
    Categorical(String),
}

impl FeatureValue {
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            FeatureValue::Numeric(v) => Some(*v),
            FeatureValue::Categorical(_) => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            FeatureValue::Categorical(v) => Some(v),
            FeatureValue::Numeric(_) => None,
        }
    }
}

/// Одна строка запроса: значения по имени признака
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    values: HashMap<String, FeatureValue>,
}

impl PredictionInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_numeric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set_numeric(name, value);
        self
    }

    pub fn with_category(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_category(name, value);
        self
    }

    pub fn set_numeric(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), FeatureValue::Numeric(value));
    }

    pub fn set_category(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(name.into(), FeatureValue::Categorical(value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FeatureValue::as_numeric)
    }

    pub fn category(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FeatureValue::as_category)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// Уровень доверия зависит только от числа предупреждений
    pub fn from_warning_count(count: usize) -> Self {
        match count {
            0 => ConfidenceLevel::High,
            1 => ConfidenceLevel::Medium,
            _ => ConfidenceLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub ppzfa: f64,
    pub total_value: f64,
    pub confidence_level: ConfidenceLevel,
    pub warnings: Vec<String>,
}
