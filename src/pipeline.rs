//! Обученная связка "предобработка + модель"

use linfa::Dataset;
use ndarray::Axis;

use crate::error::{ModelError, PipelineError};
use crate::models::{RandomForestRegressor, Regressor};
use crate::preprocessing::{FeaturePreprocessor, TrainingFrame};
use crate::types::{FeatureSchema, PredictionInput};

/// Существует только в обученном виде: создается через `fit`,
/// раскладка колонок модели всегда совпадает с препроцессором.
#[derive(Debug, Clone)]
pub struct TrainedPipeline<R = RandomForestRegressor> {
    preprocessor: FeaturePreprocessor,
    model: R,
    feature_names: Vec<String>,
}

impl<R: Regressor> TrainedPipeline<R> {
    pub fn fit(schema: FeatureSchema, frame: &TrainingFrame, mut model: R) -> Result<Self, PipelineError> {
        let mut preprocessor = FeaturePreprocessor::new(schema);
        preprocessor.fit(frame)?;

        let records = preprocessor.transform(frame)?;
        let feature_names = preprocessor.feature_names();
        let dataset = Dataset::new(records, frame.target.clone());

        model.fit(&dataset)?;

        Ok(Self {
            preprocessor,
            model,
            feature_names,
        })
    }

    pub fn predict(&self, input: &PredictionInput) -> Result<f64, PipelineError> {
        let x = self.preprocessor.transform_row(input)?.insert_axis(Axis(0));
        let predictions = self.model.predict(&x)?;
        predictions
            .get(0)
            .copied()
            .ok_or_else(|| ModelError::ShapeMismatch {
                expected: "1 prediction".to_string(),
                actual: "0 predictions".to_string(),
            }
            .into())
    }

    /// Имена колонок на входе модели
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn oob_score(&self) -> Option<f64> {
        self.model.oob_score()
    }

    pub fn n_estimators(&self) -> Option<usize> {
        self.model.n_estimators()
    }

    /// Важности признаков по убыванию
    pub fn ranked_importances(&self) -> Option<Vec<(String, f64)>> {
        let importances = self.model.feature_importances()?;
        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(importances.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        Some(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::TransactionTable;
    use crate::preprocessing::TrainingStatistics;
    use crate::types::{BASE_FAR, LOT_AREA, LOT_FRONTAGE};

    const CSV: &str = "\
LOT AREA,LOT FRONTAGE,BASE FAR,BOROUGH,NEIGHBORHOOD,LOT TYPE,ZONING 1,ZONING 2,OVERLAY 1,OVERLAY 2,SPECIAL DISTRICT,MIH/VIH,PPZFA
1000,20,2.0,MANHATTAN,SOHO,INTERIOR,R6,,,,,MIH,400
1200,25,2.0,MANHATTAN,SOHO,INTERIOR,R6,,,,,MIH,420
3000,30,4.0,BROOKLYN,DUMBO,CORNER,R7,,,,,,150
3500,35,4.0,BROOKLYN,DUMBO,CORNER,R7,,,,,,140
";

    fn frame() -> TrainingFrame {
        let table = TransactionTable::from_reader(CSV.as_bytes()).unwrap();
        TrainingStatistics::compute(&FeatureSchema::transactions(), &table).unwrap().1
    }

    fn query(borough: &str) -> PredictionInput {
        let mut input = PredictionInput::new()
            .with_numeric(LOT_AREA, 1100.0)
            .with_numeric(LOT_FRONTAGE, 22.0)
            .with_numeric(BASE_FAR, 2.0);
        for name in FeatureSchema::transactions().categorical_features() {
            input.set_category(name.as_str(), "NONE");
        }
        input.set_category("BOROUGH", borough);
        input
    }

    #[test]
    fn test_fit_and_predict() {
        let model = RandomForestRegressor::new(25).with_random_state(1);
        let pipeline = TrainedPipeline::fit(FeatureSchema::transactions(), &frame(), model).unwrap();

        let ppzfa = pipeline.predict(&query("MANHATTAN")).unwrap();
        assert!(ppzfa.is_finite());
        assert!((140.0..=420.0).contains(&ppzfa));
    }

    #[test]
    fn test_importances_are_named_and_sorted() {
        let model = RandomForestRegressor::new(25);
        let pipeline = TrainedPipeline::fit(FeatureSchema::transactions(), &frame(), model).unwrap();

        let ranked = pipeline.ranked_importances().unwrap();
        assert_eq!(ranked.len(), pipeline.feature_names().len());
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
        assert!(ranked.iter().any(|(name, _)| name == "BOROUGH_MANHATTAN"));
        assert_eq!(pipeline.n_estimators(), Some(25));
    }

    #[test]
    fn test_unseen_category_does_not_fail() {
        let pipeline =
            TrainedPipeline::fit(FeatureSchema::transactions(), &frame(), RandomForestRegressor::new(10)).unwrap();
        assert!(pipeline.predict(&query("BRONX")).is_ok());
    }

    #[test]
    fn test_missing_feature_surfaces_as_preprocess_error() {
        let pipeline =
            TrainedPipeline::fit(FeatureSchema::transactions(), &frame(), RandomForestRegressor::new(10)).unwrap();
        let partial = PredictionInput::new().with_numeric(LOT_AREA, 1.0);
        assert!(matches!(
            pipeline.predict(&partial),
            Err(PipelineError::Preprocess(_))
        ));
    }
}
