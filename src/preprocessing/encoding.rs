//! One-hot кодирование категориальных признаков

use std::collections::BTreeSet;

use crate::error::PreprocessError;

/// Словарь категорий по каждому признаку; категории отсортированы
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OneHotEncoder {
    categories: Vec<Vec<String>>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `columns[j]` - все значения j-го признака
    pub fn fit(&mut self, columns: &[Vec<String>]) -> Result<(), PreprocessError> {
        if columns.iter().any(Vec::is_empty) {
            return Err(PreprocessError::EmptyInput);
        }

        self.categories = columns
            .iter()
            .map(|values| {
                values
                    .iter()
                    .cloned()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .collect();
        self.is_fitted = true;
        Ok(())
    }

    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    /// Суммарная ширина всех one-hot блоков
    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// Кодирует одну строку в `out` (длина `width()`).
    /// Незнакомая категория дает нулевой блок без ошибки.
    pub fn encode_into<S: AsRef<str>>(&self, row: &[S], out: &mut [f64]) -> Result<(), PreprocessError> {
        if !self.is_fitted {
            return Err(PreprocessError::NotFitted);
        }
        if row.len() != self.categories.len() || out.len() != self.width() {
            return Err(PreprocessError::ShapeMismatch {
                expected: format!("{} categorical values", self.categories.len()),
                actual: format!("{} categorical values", row.len()),
            });
        }

        out.iter_mut().for_each(|v| *v = 0.0);

        let mut offset = 0;
        for (value, vocabulary) in row.iter().zip(&self.categories) {
            if let Ok(pos) = vocabulary.binary_search_by(|c| c.as_str().cmp(value.as_ref())) {
                out[offset + pos] = 1.0;
            }
            offset += vocabulary.len();
        }

        Ok(())
    }

    pub fn encode<S: AsRef<str>>(&self, row: &[S]) -> Result<Vec<f64>, PreprocessError> {
        let mut out = vec![0.0; self.width()];
        self.encode_into(row, &mut out)?;
        Ok(out)
    }

    /// Имена выходных колонок: "<ПРИЗНАК>_<КАТЕГОРИЯ>"
    pub fn feature_names<S: AsRef<str>>(&self, input_names: &[S]) -> Vec<String> {
        input_names
            .iter()
            .zip(&self.categories)
            .flat_map(|(name, vocabulary)| {
                vocabulary
                    .iter()
                    .map(move |category| format!("{}_{}", name.as_ref(), category))
            })
            .collect()
    }
}
