use std::io::Write;

use ppzfa_estimator::{
    ConfidenceLevel, EstimatorConfig, EstimatorError, ForestConfig, PredictionInput, TransactionTable,
    ValuePredictor, BASE_FAR, LOT_AREA, LOT_FRONTAGE,
};
use tempfile::NamedTempFile;

const HEADER: &str = "BOROUGH,NEIGHBORHOOD,LOT AREA,LOT FRONTAGE,LOT TYPE,ZONING 1,ZONING 2,OVERLAY 1,OVERLAY 2,SPECIAL DISTRICT,MIH/VIH,BASE FAR,PPZFA";

/// 60 сделок: LOT AREA от 500 до 20000, цена зависит от района и FAR
fn transactions_csv() -> String {
    let boroughs = [("MANHATTAN", "SOHO", 400.0), ("BROOKLYN", "DUMBO", 200.0), ("QUEENS", "ASTORIA", 100.0)];
    let mut lines = vec![HEADER.to_string()];

    for i in 0..60 {
        let (borough, neighborhood, base_price) = boroughs[i % 3];
        let lot_area = 500.0 + (i as f64) * (19500.0 / 59.0);
        let frontage = 20.0 + (i % 7) as f64 * 5.0;
        let base_far = 2.0 + (i % 5) as f64 * 2.0;
        let ppzfa = base_price + base_far * 3.0 + (i % 4) as f64;
        let overlay = if i % 2 == 0 { "C1-4" } else { "" };
        // пропуски и мусор в числовых колонках
        let frontage_cell = if i % 11 == 0 { "n/a".to_string() } else { frontage.to_string() };

        lines.push(format!(
            "{},{},{:.1},{},INTERIOR,R7A,,{},,,MIH,{},{}",
            borough, neighborhood, lot_area, frontage_cell, overlay, base_far, ppzfa
        ));
    }

    lines.join("\n")
}

fn table() -> TransactionTable {
    TransactionTable::from_reader(transactions_csv().as_bytes()).unwrap()
}

fn predictor() -> ValuePredictor {
    let config = EstimatorConfig {
        forest: ForestConfig {
            n_estimators: 40,
            ..Default::default()
        },
        ..Default::default()
    };
    ValuePredictor::from_config(&config)
}

fn query(borough: &str, lot_area: f64, base_far: f64) -> PredictionInput {
    PredictionInput::new()
        .with_category("BOROUGH", borough)
        .with_category("NEIGHBORHOOD", "SOHO")
        .with_numeric(LOT_AREA, lot_area)
        .with_numeric(LOT_FRONTAGE, 35.0)
        .with_category("LOT TYPE", "INTERIOR")
        .with_category("ZONING 1", "R7A")
        .with_category("ZONING 2", "NONE")
        .with_category("OVERLAY 1", "NONE")
        .with_category("OVERLAY 2", "NONE")
        .with_category("SPECIAL DISTRICT", "NONE")
        .with_category("MIH/VIH", "MIH")
        .with_numeric(BASE_FAR, base_far)
}

#[test]
fn test_train_from_file_and_predict() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(transactions_csv().as_bytes()).unwrap();

    let mut predictor = predictor();
    predictor.train_from_path(file.path()).unwrap();
    assert!(predictor.is_trained());

    let result = predictor.predict(&query("MANHATTAN", 4026.0, 6.0)).unwrap();
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    assert_eq!(result.confidence_level, ConfidenceLevel::High);
    assert!((result.total_value - result.ppzfa * 4026.0 * 6.0).abs() < 1e-6);

    // Manhattan lots were priced well above Queens lots
    let mut queens_input = query("QUEENS", 4026.0, 6.0);
    queens_input.set_category("NEIGHBORHOOD", "ASTORIA");
    let queens = predictor.predict(&queens_input).unwrap();
    assert!(result.ppzfa > queens.ppzfa);
}

#[test]
fn test_statistics_use_raw_training_extremes() {
    let mut predictor = predictor();
    predictor.train(&table()).unwrap();

    let stats = predictor.statistics().unwrap();
    let area = stats.numeric(LOT_AREA).unwrap();
    assert_eq!(area.min, 500.0);
    assert_eq!(area.max, 20000.0);

    // "n/a" cells are excluded from the frontage statistics
    let frontage = stats.numeric(LOT_FRONTAGE).unwrap();
    assert_eq!(frontage.min, 20.0);
    assert_eq!(frontage.max, 50.0);

    let overlay = stats.categorical("OVERLAY 1").unwrap();
    assert_eq!(overlay.unique_values, vec!["C1-4".to_string(), "NONE".to_string()]);
}

#[test]
fn test_out_of_range_lot_area_lowers_confidence() {
    let mut predictor = predictor();
    predictor.train(&table()).unwrap();

    let result = predictor.predict(&query("BROOKLYN", 25000.0, 6.0)).unwrap();
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("above training data maximum"));
    assert_eq!(result.confidence_level, ConfidenceLevel::Medium);

    let result = predictor.predict(&query("BROOKLYN", 25000.0, 1.0)).unwrap();
    assert_eq!(result.warnings.len(), 2);
    assert!(result.warnings[1].contains("below training data minimum"));
    assert_eq!(result.confidence_level, ConfidenceLevel::Low);
}

#[test]
fn test_retraining_is_deterministic() {
    let mut first = predictor();
    first.train(&table()).unwrap();
    let mut second = predictor();
    second.train(&table()).unwrap();
    second.train(&table()).unwrap();

    let input = query("QUEENS", 7300.0, 4.0);
    assert_eq!(first.predict(&input).unwrap(), second.predict(&input).unwrap());
    assert_eq!(first.diagnostics(), second.diagnostics());
}

#[test]
fn test_diagnostics_are_reported() {
    let mut predictor = predictor();
    predictor.train(&table()).unwrap();

    let diagnostics = predictor.diagnostics().unwrap();
    assert_eq!(diagnostics.n_samples, 60);
    assert_eq!(diagnostics.n_estimators, Some(40));
    assert!(diagnostics.oob_score.is_some());
    assert_eq!(diagnostics.top_features.len(), 10);
    assert_eq!(diagnostics.feature_ranges.len(), 3);
}

#[test]
fn test_unseen_categories_do_not_fail() {
    let mut predictor = predictor();
    predictor.train(&table()).unwrap();

    let mut input = query("STATEN ISLAND", 3000.0, 4.0);
    input.set_category("ZONING 1", "M1-5/R10");
    input.set_category("SPECIAL DISTRICT", "SNX");

    let result = predictor.predict(&input).unwrap();
    assert!(result.ppzfa.is_finite());
}

#[test]
fn test_predict_before_train() {
    let predictor = predictor();
    let err = predictor.predict(&query("MANHATTAN", 4026.0, 12.0)).unwrap_err();
    assert!(matches!(err, EstimatorError::UntrainedModel));
}

#[test]
fn test_dataset_errors() {
    let mut predictor = predictor();

    let err = predictor.train_from_path("/no/such/TRANSACTIONS-PT.csv").unwrap_err();
    assert!(matches!(err, EstimatorError::DataLoad(_)));

    let without_target = "BOROUGH,LOT AREA\nMANHATTAN,100\n";
    let table = TransactionTable::from_reader(without_target.as_bytes()).unwrap();
    let err = predictor.train(&table).unwrap_err();
    assert!(matches!(err, EstimatorError::DataLoad(_)));
    assert!(err.to_string().contains("PPZFA"));

    let header_only = TransactionTable::from_reader(HEADER.as_bytes()).unwrap();
    let err = predictor.train(&header_only).unwrap_err();
    assert!(matches!(err, EstimatorError::Training(_)));

    assert!(!predictor.is_trained());
}

#[test]
fn test_infinite_lot_area_fails_training_cleanly() {
    let csv = transactions_csv().replacen("MANHATTAN,SOHO,500.0", "MANHATTAN,SOHO,inf", 1);
    assert!(csv.contains(",inf,"));
    let table = TransactionTable::from_reader(csv.as_bytes()).unwrap();

    let mut predictor = predictor();
    let err = predictor.train(&table).unwrap_err();
    assert!(matches!(err, EstimatorError::Training(_)), "{:?}", err);
    assert!(err.to_string().contains("LOT AREA"));
    assert!(!predictor.is_trained());
}
