//! Стандартизация числовых признаков

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::error::PreprocessError;

/// (x - mean) / std по каждой колонке; std популяционное (n)
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    std: Option<Array1<f64>>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            mean: None,
            std: None,
            is_fitted: false,
        }
    }

    pub fn fit(&mut self, X: &Array2<f64>) -> Result<(), PreprocessError> {
        if X.nrows() == 0 {
            return Err(PreprocessError::EmptyInput);
        }

        // Среднее и стандартное отклонение по каждому признаку
        self.mean = Some(X.mean_axis(Axis(0)).ok_or(PreprocessError::EmptyInput)?);
        self.std = Some(X.std_axis(Axis(0), 0.0));

        // Избегаем деления на ноль
        if let Some(ref mut std) = self.std {
            for val in std.iter_mut() {
                if *val < 1e-10 {
                    *val = 1.0;
                }
            }
        }

        self.is_fitted = true;
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.mean.as_ref().map_or(0, Array1::len)
    }

    pub fn transform(&self, X: &Array2<f64>) -> Result<Array2<f64>, PreprocessError> {
        let (mean, std) = self.params()?;
        self.check_width(X.ncols())?;

        let mut normalized = X.clone();
        for mut row in normalized.rows_mut() {
            for (i, val) in row.iter_mut().enumerate() {
                *val = (*val - mean[i]) / std[i];
            }
        }

        Ok(normalized)
    }

    pub fn transform_row(&self, x: ArrayView1<f64>) -> Result<Array1<f64>, PreprocessError> {
        let (mean, std) = self.params()?;
        self.check_width(x.len())?;

        Ok(x.iter()
            .enumerate()
            .map(|(i, val)| (val - mean[i]) / std[i])
            .collect())
    }

    pub fn fit_transform(&mut self, X: &Array2<f64>) -> Result<Array2<f64>, PreprocessError> {
        self.fit(X)?;
        self.transform(X)
    }

    fn params(&self) -> Result<(&Array1<f64>, &Array1<f64>), PreprocessError> {
        if !self.is_fitted {
            return Err(PreprocessError::NotFitted);
        }
        let mean = self.mean.as_ref().ok_or(PreprocessError::NotFitted)?;
        let std = self.std.as_ref().ok_or(PreprocessError::NotFitted)?;
        Ok((mean, std))
    }

    fn check_width(&self, width: usize) -> Result<(), PreprocessError> {
        if width != self.n_features() {
            return Err(PreprocessError::ShapeMismatch {
                expected: format!("{} numeric columns", self.n_features()),
                actual: format!("{} numeric columns", width),
            });
        }
        Ok(())
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}
