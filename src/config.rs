//! Конфигурация предсказателя

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{MaxFeatures, RandomForestRegressor};

/// Параметры случайного леса
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub oob_score: bool,
    pub random_state: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            oob_score: true,
            random_state: 42,
        }
    }
}

impl ForestConfig {
    pub fn build(&self) -> RandomForestRegressor {
        RandomForestRegressor::new(self.n_estimators)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_features(self.max_features)
            .with_bootstrap(self.bootstrap)
            .with_oob_score(self.oob_score)
            .with_random_state(self.random_state)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Путь к CSV со сделками
    pub data_path: PathBuf,
    /// Сколько важнейших признаков выводить после обучения
    pub top_features: usize,
    pub forest: ForestConfig,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("TRANSACTIONS-PT.csv"),
            top_features: 10,
            forest: ForestConfig::default(),
        }
    }
}

impl EstimatorConfig {
    /// Загрузка из JSON; отсутствующие поля берутся по умолчанию
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
