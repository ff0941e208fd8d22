//! Интерактивный ввод запроса и вывод результата

use std::io::{self, BufRead, Write};

use crate::error::EstimatorError;
use crate::types::{PredictionInput, PredictionResult, MISSING_CATEGORY};

enum Field {
    /// Категория; `optional` - пустой ответ означает "NONE"
    Category { optional: bool },
    /// Число; пустой ответ означает 0
    Number,
}

/// Порядок и тексты вопросов
const FIELDS: &[(&str, &str, Field)] = &[
    ("BOROUGH", "Enter BOROUGH: ", Field::Category { optional: false }),
    ("NEIGHBORHOOD", "Enter NEIGHBORHOOD: ", Field::Category { optional: false }),
    ("LOT AREA", "Enter LOT AREA (in square feet): ", Field::Number),
    ("LOT FRONTAGE", "Enter LOT FRONTAGE (in feet): ", Field::Number),
    ("LOT TYPE", "Enter LOT TYPE: ", Field::Category { optional: false }),
    ("ZONING 1", "Enter ZONING 1: ", Field::Category { optional: false }),
    ("ZONING 2", "Enter ZONING 2 (or press Enter if none): ", Field::Category { optional: true }),
    ("OVERLAY 1", "Enter OVERLAY 1 (or press Enter if none): ", Field::Category { optional: true }),
    ("OVERLAY 2", "Enter OVERLAY 2 (or press Enter if none): ", Field::Category { optional: true }),
    (
        "SPECIAL DISTRICT",
        "Enter SPECIAL DISTRICT (or press Enter if none): ",
        Field::Category { optional: true },
    ),
    ("MIH/VIH", "Enter MIH/VIH: ", Field::Category { optional: false }),
    ("BASE FAR", "Enter BASE FAR: ", Field::Number),
];

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("input stream closed")]
    Closed,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Input(#[from] EstimatorError),
}

/// Диалог поверх произвольных потоков ввода/вывода
pub struct Prompter<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// Читает один запрос. Категории приводятся к верхнему регистру.
    pub fn read_input(&mut self) -> Result<PredictionInput, PromptError> {
        writeln!(self.writer, "\n=== Real Estate Value Predictor ===")?;
        writeln!(self.writer, "\nPlease provide the following information:")?;

        let mut input = PredictionInput::new();
        for (name, question, kind) in FIELDS {
            let answer = self.ask(question)?;
            match kind {
                Field::Category { optional } => {
                    let value = answer.to_uppercase();
                    if value.is_empty() && *optional {
                        input.set_category(*name, MISSING_CATEGORY);
                    } else {
                        input.set_category(*name, value);
                    }
                }
                Field::Number => input.set_numeric(*name, parse_number(name, &answer)?),
            }
        }

        Ok(input)
    }

    /// true только на ответ "yes" (без учета регистра)
    pub fn ask_continue(&mut self) -> Result<bool, PromptError> {
        let answer = self.ask("\nWould you like to make another prediction? (yes/no): ")?;
        Ok(answer.eq_ignore_ascii_case("yes"))
    }

    pub fn show_result(&mut self, result: &PredictionResult) -> Result<(), PromptError> {
        self.writer.write_all(render_result(result).as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    fn ask(&mut self, question: &str) -> Result<String, PromptError> {
        write!(self.writer, "{}", question)?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(PromptError::Closed);
        }
        Ok(line.trim().to_string())
    }
}

fn parse_number(name: &str, answer: &str) -> Result<f64, EstimatorError> {
    if answer.is_empty() {
        return Ok(0.0);
    }
    answer.parse::<f64>().map_err(|e| {
        EstimatorError::InputValidation(format!("could not convert {} value '{}' to float: {}", name, answer, e))
    })
}

pub fn render_result(result: &PredictionResult) -> String {
    let mut out = String::from("\n=== Prediction Results ===\n");
    out.push_str(&format!("Predicted PPZFA: ${:.2}\n", result.ppzfa));
    out.push_str(&format!("Total Value: ${}\n", format_thousands(result.total_value)));
    out.push_str(&format!("Confidence Level: {}\n", result.confidence_level));

    if !result.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for warning in &result.warnings {
            out.push_str(&format!("- {}\n", warning));
        }
    }
    out
}

/// 7246800.0 -> "7,246,800.00"
pub fn format_thousands(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (integer, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}
