/// Регрессионные модели

pub mod forest;

pub use forest::{MaxFeatures, RandomForestRegressor};

use linfa::Dataset;
use ndarray::{Array1, Array2, Ix1};

use crate::error::ModelError;

/// Обучающая выборка: матрица признаков и одномерная цель
pub type RegressionDataset = Dataset<f64, f64, Ix1>;

/// Непрозрачный регрессор: `fit(X, y)` и `predict(X)`.
///
/// Диагностика (OOB-оценка, важности признаков) необязательна и
/// используется только для отчетов.
pub trait Regressor {
    fn fit(&mut self, dataset: &RegressionDataset) -> Result<(), ModelError>;

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError>;

    fn oob_score(&self) -> Option<f64> {
        None
    }

    /// Важности по входным колонкам, в порядке колонок
    fn feature_importances(&self) -> Option<&Array1<f64>> {
        None
    }

    fn n_estimators(&self) -> Option<usize> {
        None
    }
}
