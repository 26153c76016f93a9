use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::models::{
    Dataset, ProblemRecord, COL_CREATED, COL_MODULE, COL_PRIORITY, COL_STATUS,
};

/// Sheet the original workbook keeps its records on. Falls back to the first
/// sheet when absent.
const PREFERRED_SHEET: &str = "Gestão de Problemas";

const CSV_EXTENSIONS: &[&str] = &["csv"];
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported file format {extension:?}: expected delimited text or a spreadsheet workbook")]
    Format { extension: String },
    #[error("missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<String> },
    #[error("failed to read delimited text")]
    Csv(#[from] csv::Error),
    #[error("failed to read workbook")]
    Workbook(#[from] calamine::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Loads a dataset from disk, dispatching on the file extension.
pub fn load_path(path: &Path) -> Result<Dataset, LoadError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    if CSV_EXTENSIONS.contains(&extension.as_str()) {
        let reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        from_csv_reader(reader)
    } else if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        let workbook = open_workbook_auto(path)?;
        from_workbook(workbook)
    } else {
        Err(LoadError::Format { extension })
    }
}

/// Upload-style entry point: raw delimited-text bytes.
pub fn from_csv_bytes(bytes: &[u8]) -> Result<Dataset, LoadError> {
    from_csv_reader(csv::ReaderBuilder::new().flexible(true).from_reader(bytes))
}

/// Upload-style entry point: raw workbook bytes.
pub fn from_workbook_bytes(bytes: Vec<u8>) -> Result<Dataset, LoadError> {
    let workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    from_workbook(workbook)
}

/// Writes a (filtered) row set back out as CSV with the full column set.
pub fn write_csv(path: &Path, columns: &[String], records: &[ProblemRecord]) -> Result<(), LoadError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(columns)?;
    for record in records {
        writer.write_record(&record.cells)?;
    }
    writer.flush()?;
    Ok(())
}

fn from_csv_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Dataset, LoadError> {
    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    build_dataset(columns, rows)
}

fn from_workbook<RS>(mut workbook: calamine::Sheets<RS>) -> Result<Dataset, LoadError>
where
    RS: std::io::Read + std::io::Seek,
{
    let sheet_names = workbook.sheet_names();
    // A workbook without sheets carries no data at all.
    let Some(sheet) = sheet_names
        .iter()
        .find(|name| name.as_str() == PREFERRED_SHEET)
        .or_else(|| sheet_names.first())
        .cloned()
    else {
        return Ok(Dataset::empty());
    };

    let range = workbook.worksheet_range(&sheet)?;
    let mut rows = range.rows();

    let columns: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(cell_to_string).collect(),
        None => Vec::new(),
    };

    let data: Vec<Vec<String>> = rows
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    build_dataset(columns, data)
}

/// Assembles the dataset from raw text cells, failing when a required column
/// is missing and recovering unparsable dates as `None`.
fn build_dataset(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Dataset, LoadError> {
    let position = |name: &str| columns.iter().position(|column| column == name);

    let mut missing = Vec::new();
    for required in [COL_STATUS, COL_PRIORITY, COL_MODULE, COL_CREATED] {
        if position(required).is_none() {
            missing.push(required.to_string());
        }
    }

    let (Some(status_idx), Some(priority_idx), Some(module_idx), Some(created_idx)) = (
        position(COL_STATUS),
        position(COL_PRIORITY),
        position(COL_MODULE),
        position(COL_CREATED),
    ) else {
        return Err(LoadError::Schema { missing });
    };

    let records = rows
        .into_iter()
        .map(|mut cells| {
            cells.resize(columns.len(), String::new());
            ProblemRecord {
                status: cells[status_idx].trim().to_string(),
                priority: cells[priority_idx].trim().to_string(),
                module: cells[module_idx].trim().to_string(),
                created_at: parse_creation_date(&cells[created_idx]),
                cells,
            }
        })
        .collect();

    Ok(Dataset { columns, records })
}

const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

/// Best-effort day-first date parsing. Anything unparsable, including invalid
/// calendar dates like `31/02/2024`, becomes `None` rather than a load error.
pub fn parse_creation_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(datetime.date());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    None
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.clone(),
        Data::Int(value) => value.to_string(),
        Data::Float(value) => {
            if value.fract() == 0.0 {
                format!("{}", *value as i64)
            } else {
                value.to_string()
            }
        }
        Data::Bool(value) => value.to_string(),
        Data::DateTime(value) => value
            .as_datetime()
            .map(|datetime| datetime.format("%d/%m/%Y %H:%M:%S").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(value) | Data::DurationIso(value) => value.clone(),
        Data::Error(error) => format!("{error:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
Status Card,Prioridade,Módulo Impactado,Data Criação,Responsável
Resolvido,Alta,Faturamento,01/01/2024,Ana
Aberto,Média,Estoque,02/01/2024,Bruno
";

    #[test]
    fn parses_day_first_dates() {
        assert_eq!(
            parse_creation_date("05/03/2024"),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert_eq!(
            parse_creation_date("05/03/2024 14:30:00"),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert_eq!(
            parse_creation_date("2024-03-05"),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
    }

    #[test]
    fn invalid_dates_become_none() {
        assert_eq!(parse_creation_date("31/02/2024"), None);
        assert_eq!(parse_creation_date("not a date"), None);
        assert_eq!(parse_creation_date(""), None);
        assert_eq!(parse_creation_date("   "), None);
    }

    #[test]
    fn loads_csv_with_extra_columns() {
        let dataset = from_csv_bytes(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(dataset.columns.len(), 5);
        assert_eq!(dataset.records.len(), 2);

        let first = &dataset.records[0];
        assert_eq!(first.status, "Resolvido");
        assert_eq!(first.priority, "Alta");
        assert_eq!(first.module, "Faturamento");
        assert_eq!(first.created_at, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(first.cells[4], "Ana");
    }

    #[test]
    fn missing_column_is_a_schema_error() {
        let csv = "Status Card,Prioridade,Data Criação\nAberto,Alta,01/01/2024\n";
        let error = from_csv_bytes(csv.as_bytes()).unwrap_err();
        match error {
            LoadError::Schema { missing } => {
                assert_eq!(missing, vec![COL_MODULE.to_string()]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_extension_is_a_format_error() {
        let error = load_path(Path::new("records.txt")).unwrap_err();
        assert!(matches!(error, LoadError::Format { .. }));
    }

    #[test]
    fn short_rows_are_padded() {
        let csv = "Status Card,Prioridade,Módulo Impactado,Data Criação,Nota\nAberto,Alta,Estoque,01/01/2024\n";
        let dataset = from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(dataset.records[0].cells.len(), 5);
        assert_eq!(dataset.records[0].cells[4], "");
    }

    #[test]
    fn workbook_prefers_the_records_sheet() {
        let bytes = include_bytes!("../testdata/problemas.xlsx").to_vec();
        let dataset = from_workbook_bytes(bytes).unwrap();

        // Columns come from "Gestão de Problemas", not the decoy first sheet.
        assert_eq!(
            dataset.columns,
            vec![COL_STATUS, COL_PRIORITY, COL_MODULE, COL_CREATED, "Chamado"]
        );
        assert_eq!(dataset.records.len(), 2);
    }

    #[test]
    fn workbook_cells_convert_to_text_and_dates() {
        let bytes = include_bytes!("../testdata/problemas.xlsx").to_vec();
        let dataset = from_workbook_bytes(bytes).unwrap();

        // Native date cell and whole-number cell, then a textual date.
        let first = &dataset.records[0];
        assert_eq!(first.status, "Resolvido");
        assert_eq!(first.created_at, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(first.cells[4], "42");

        let second = &dataset.records[1];
        assert_eq!(second.created_at, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(second.cells[4], "43");
    }

    #[test]
    fn workbook_without_sheets_is_no_data() {
        let bytes = include_bytes!("../testdata/vazio.xlsx").to_vec();
        let dataset = from_workbook_bytes(bytes).unwrap();
        assert!(dataset.columns.is_empty());
        assert!(dataset.records.is_empty());
    }

    #[test]
    fn export_round_trips_through_csv() {
        let dataset = from_csv_bytes(SAMPLE_CSV.as_bytes()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");

        write_csv(&path, &dataset.columns, &dataset.records).unwrap();

        let reloaded = load_path(&path).unwrap();
        assert_eq!(reloaded.columns, dataset.columns);
        assert_eq!(reloaded.records.len(), dataset.records.len());
        assert_eq!(reloaded.records[1].cells, dataset.records[1].cells);
    }
}
