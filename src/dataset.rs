//! Загрузка датасета сделок из CSV

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::error::DataLoadError;

/// Токены, которые считаются пропуском
const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>", "N/A",
    "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Колоночное хранилище сырых строковых значений
#[derive(Debug, Clone, Default)]
pub struct TransactionTable {
    headers: Vec<String>,
    columns: HashMap<String, Vec<Option<String>>>,
    n_rows: usize,
}

impl TransactionTable {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DataLoadError> {
        let file = File::open(&path).map_err(|source| DataLoadError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(file)?;
        tracing::info!("Loaded {} samples from {:?}", table.n_rows, path.as_ref());
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataLoadError> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        let mut n_rows = 0;

        for record in reader.records() {
            let record = record?;
            for (column, field) in cells.iter_mut().zip(record.iter()) {
                column.push(parse_cell(field));
            }
            n_rows += 1;
        }

        // При повторяющихся заголовках побеждает последняя колонка
        let columns = headers.iter().cloned().zip(cells).collect();

        Ok(Self {
            headers,
            columns,
            n_rows,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column(&self, name: &str) -> Option<&[Option<String>]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Проверка наличия всех колонок; в ошибке перечисляются все отсутствующие
    pub fn require_columns(&self, names: &[&str]) -> Result<(), DataLoadError> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !self.columns.contains_key(**name))
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DataLoadError::MissingColumns(missing))
        }
    }
}

fn parse_cell(field: &str) -> Option<String> {
    if MISSING_TOKENS.contains(&field) {
        None
    } else {
        Some(field.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CSV: &str = "\
LOT AREA,BOROUGH,PPZFA
4026, MANHATTAN ,150.5
,BROOKLYN,NaN
2500,,88
";

    #[test]
    fn test_reads_columns_and_missing_cells() {
        let table = TransactionTable::from_reader(CSV.as_bytes()).unwrap();

        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.headers(), &["LOT AREA", "BOROUGH", "PPZFA"]);

        let area = table.column("LOT AREA").unwrap();
        assert_eq!(area[0].as_deref(), Some("4026"));
        assert_eq!(area[1], None);

        let borough = table.column("BOROUGH").unwrap();
        assert_eq!(borough[0].as_deref(), Some("MANHATTAN"));
        assert_eq!(borough[2], None);

        assert_eq!(table.column("PPZFA").unwrap()[1], None);
    }

    #[test]
    fn test_all_missing_tokens_are_recognized() {
        let text = "ZONING 2\nNone\n<NA>\n-NaN\n-nan\n#NA\n#N/A N/A\n1.#QNAN\nNONE\n";
        let table = TransactionTable::from_reader(text.as_bytes()).unwrap();

        let column = table.column("ZONING 2").unwrap();
        assert_eq!(table.n_rows(), 8);
        assert!(column[..7].iter().all(Option::is_none), "{:?}", column);
        // upper-case NONE is a real category value
        assert_eq!(column[7].as_deref(), Some("NONE"));
    }

    #[test]
    fn test_require_columns_lists_every_missing_column() {
        let table = TransactionTable::from_reader(CSV.as_bytes()).unwrap();
        let err = table
            .require_columns(&["LOT AREA", "BASE FAR", "ZONING 1"])
            .unwrap_err();

        match err {
            DataLoadError::MissingColumns(missing) => {
                assert_eq!(missing, vec!["BASE FAR".to_string(), "ZONING 1".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let ragged = "A,B\n1,2\n3\n";
        let err = TransactionTable::from_reader(ragged.as_bytes()).unwrap_err();
        assert!(matches!(err, DataLoadError::Csv(_)));
    }

    #[test]
    fn test_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();

        let table = TransactionTable::from_path(file.path()).unwrap();
        assert_eq!(table.n_rows(), 3);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = TransactionTable::from_path("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, DataLoadError::Io { .. }));
    }
}
