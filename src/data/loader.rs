use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::DataLoadError;
use super::features::derive_features;
use super::model::{Column, ColumnKind, CustomerRecord, Table};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a customer table and attach the derived columns.
pub fn load_dataset(path: &Path) -> Result<Table, DataLoadError> {
    let mut table = load_file(path)?;
    derive_features(&mut table);
    log::info!(
        "Loaded {} customers from {} with columns {:?}",
        table.len(),
        path.display(),
        table.schema
    );
    Ok(table)
}

/// Load a customer table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with the churn table's column names (default)
/// * `.json`    – `[{ "Age": 42, "Geography": "France", ... }, ...]`
/// * `.parquet` – flat columns named like the CSV header
///
/// Rows with a missing value in any recognised column are dropped.
pub fn load_file(path: &Path) -> Result<Table, DataLoadError> {
    if !path.exists() {
        return Err(DataLoadError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let raw = match ext.as_str() {
        "csv" => read_csv(path)?,
        "json" => read_json(path)?,
        "parquet" | "pq" => read_parquet(path)?,
        other => return Err(DataLoadError::UnsupportedExtension(other.to_string())),
    };

    raw.into_table()
}

// ---------------------------------------------------------------------------
// Load-once cache
// ---------------------------------------------------------------------------

/// Holds the derived table for the lifetime of the process so re-renders
/// never touch storage again.
#[derive(Debug)]
pub struct DatasetCache {
    path: PathBuf,
    table: Option<Arc<Table>>,
}

impl DatasetCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DatasetCache {
            path: path.into(),
            table: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.table.is_some()
    }

    /// Return the cached table, reading the file on first use only.
    pub fn get_or_load(&mut self) -> Result<Arc<Table>, DataLoadError> {
        if let Some(table) = &self.table {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(load_dataset(&self.path)?);
        self.table = Some(Arc::clone(&table));
        Ok(table)
    }

    /// Drop the cached table and read the file again.
    pub fn reload(&mut self) -> Result<Arc<Table>, DataLoadError> {
        self.table = None;
        self.get_or_load()
    }
}

// ---------------------------------------------------------------------------
// Format-independent row assembly
// ---------------------------------------------------------------------------

/// Cell text per recognised column, before typing.  `None` marks a null.
struct RawTable {
    schema: Vec<Column>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    fn into_table(self) -> Result<Table, DataLoadError> {
        let RawTable { schema, rows } = self;
        let total = rows.len();
        let mut records = Vec::with_capacity(total);

        for (row_no, cells) in rows.into_iter().enumerate() {
            if cells.iter().any(Option::is_none) {
                continue;
            }
            let cells: Vec<String> = cells.into_iter().flatten().collect();
            records.push(parse_record(&schema, &cells, row_no + 1)?);
        }

        let dropped = total - records.len();
        if dropped > 0 {
            log::debug!("Dropped {dropped} of {total} rows with missing values");
        }
        if records.is_empty() {
            return Err(DataLoadError::Empty);
        }
        Ok(Table::new(schema, records))
    }
}

/// Map source headers onto known columns.  Returns, for each kept column, its
/// position in the source.
fn resolve_schema<'a>(
    headers: impl IntoIterator<Item = &'a str>,
) -> Result<(Vec<Column>, Vec<usize>), DataLoadError> {
    let mut schema = Vec::new();
    let mut positions = Vec::new();

    for (idx, header) in headers.into_iter().enumerate() {
        match Column::from_header(header) {
            Some(col) if !schema.contains(&col) => {
                schema.push(col);
                positions.push(idx);
            }
            Some(col) => log::debug!("Ignoring duplicate column '{col}'"),
            None => log::debug!("Ignoring unknown column '{header}'"),
        }
    }

    if let Some(missing) = Column::ALL
        .into_iter()
        .find(|c| c.is_required() && !schema.contains(c))
    {
        return Err(DataLoadError::MissingColumn(missing.header()));
    }
    Ok((schema, positions))
}

/// Text values treated as missing, as spreadsheet exports write them.
fn null_cell(text: &str) -> Option<String> {
    let text = text.trim();
    match text {
        "" | "NA" | "N/A" | "NaN" | "nan" | "null" | "NULL" | "None" => None,
        _ => Some(text.to_string()),
    }
}

fn parse_record(
    schema: &[Column],
    cells: &[String],
    row: usize,
) -> Result<CustomerRecord, DataLoadError> {
    let mut record = CustomerRecord {
        row_number: None,
        customer_id: None,
        surname: None,
        credit_score: None,
        geography: String::new(),
        gender: String::new(),
        age: 0,
        tenure: None,
        balance: 0.0,
        num_of_products: 0,
        has_cr_card: None,
        is_active_member: false,
        estimated_salary: None,
        exited: false,
        features: None,
    };

    for (&col, text) in schema.iter().zip(cells) {
        let malformed = || DataLoadError::Malformed {
            row,
            column: col.header(),
            value: text.clone(),
        };
        match col.kind() {
            ColumnKind::Integer => {
                let v = parse_integer(text).ok_or_else(malformed)?;
                match col {
                    Column::RowNumber => record.row_number = Some(v),
                    Column::CustomerId => record.customer_id = Some(v),
                    Column::CreditScore => record.credit_score = Some(v),
                    Column::Tenure => record.tenure = Some(v),
                    Column::Age => record.age = u32::try_from(v).map_err(|_| malformed())?,
                    Column::NumOfProducts => {
                        record.num_of_products = u32::try_from(v).map_err(|_| malformed())?
                    }
                    _ => unreachable!("{col} is not an integer column"),
                }
            }
            ColumnKind::Float => {
                let v: f64 = text.parse().map_err(|_| malformed())?;
                match col {
                    Column::Balance => record.balance = v,
                    Column::EstimatedSalary => record.estimated_salary = Some(v),
                    _ => unreachable!("{col} is not a float column"),
                }
            }
            ColumnKind::Flag => {
                let v = parse_flag(text).ok_or_else(malformed)?;
                match col {
                    Column::HasCrCard => record.has_cr_card = Some(v),
                    Column::IsActiveMember => record.is_active_member = v,
                    Column::Exited => record.exited = v,
                    _ => unreachable!("{col} is not a flag column"),
                }
            }
            ColumnKind::Text => match col {
                Column::Surname => record.surname = Some(text.clone()),
                Column::Geography => record.geography = text.clone(),
                Column::Gender => record.gender = text.clone(),
                _ => unreachable!("{col} is not a text column"),
            },
        }
    }

    Ok(record)
}

/// Integers may arrive as integral floats (`"42.0"`).
fn parse_integer(s: &str) -> Option<i64> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(i);
    }
    let f = s.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

fn parse_flag(s: &str) -> Option<bool> {
    match s {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => match parse_integer(s)? {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        },
    }
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<RawTable, DataLoadError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let (schema, positions) = resolve_schema(headers.iter())?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let cells = positions
            .iter()
            .map(|&idx| record.get(idx).and_then(null_cell))
            .collect();
        rows.push(cells);
    }

    Ok(RawTable { schema, rows })
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "CustomerId": 15634602, "Geography": "France", "Age": 42, "Balance": 0.0, ... },
///   ...
/// ]
/// ```
///
/// JSON objects carry no column order, so the schema uses the canonical order.
fn read_json(path: &Path) -> Result<RawTable, DataLoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root: JsonValue = serde_json::from_str(&text)?;

    let records = root
        .as_array()
        .ok_or_else(|| DataLoadError::Shape("Expected top-level JSON array".into()))?;

    let mut objects = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| DataLoadError::Shape(format!("Row {} is not a JSON object", i + 1)))?;
        objects.push(obj);
    }

    let present: Vec<&str> = Column::ALL
        .into_iter()
        .map(Column::header)
        .filter(|h| objects.iter().any(|o| o.contains_key(*h)))
        .collect();
    let (schema, _) = resolve_schema(present)?;

    let rows = objects
        .iter()
        .map(|obj| {
            schema
                .iter()
                .map(|col| obj.get(col.header()).and_then(json_cell))
                .collect()
        })
        .collect();

    Ok(RawTable { schema, rows })
}

fn json_cell(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::Null => None,
        JsonValue::String(s) => null_cell(s),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat columns named like the CSV header.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn read_parquet(path: &Path) -> Result<RawTable, DataLoadError> {
    let file = std::fs::File::open(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let arrow_schema = builder.schema().clone();
    let (schema, positions) =
        resolve_schema(arrow_schema.fields().iter().map(|f| f.name().as_str()))?;
    let reader = builder.build()?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        let columns: Vec<&ArrayRef> = positions.iter().map(|&idx| batch.column(idx)).collect();

        for row in 0..batch.num_rows() {
            let mut cells = Vec::with_capacity(columns.len());
            for col in &columns {
                cells.push(arrow_cell(col, row)?);
            }
            rows.push(cells);
        }
    }

    Ok(RawTable { schema, rows })
}

/// Extract a single cell from an Arrow column as text.
fn arrow_cell(col: &ArrayRef, row: usize) -> Result<Option<String>, DataLoadError> {
    if col.is_null(row) {
        return Ok(None);
    }
    let text = match col.data_type() {
        DataType::Utf8 => return Ok(null_cell(col.as_string::<i32>().value(row))),
        DataType::LargeUtf8 => return Ok(null_cell(col.as_string::<i64>().value(row))),
        DataType::Int32 => col.as_primitive::<Int32Type>().value(row).to_string(),
        DataType::Int64 => col.as_primitive::<Int64Type>().value(row).to_string(),
        DataType::Float32 => {
            let v = col.as_primitive::<Float32Type>().value(row);
            if v.is_nan() {
                return Ok(None);
            }
            v.to_string()
        }
        DataType::Float64 => {
            let v = col.as_primitive::<Float64Type>().value(row);
            if v.is_nan() {
                return Ok(None);
            }
            v.to_string()
        }
        DataType::Boolean => col.as_boolean().value(row).to_string(),
        _ => array_value_to_string(col.as_ref(), row)?,
    };
    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::data::features::{AgeGroup, ChurnStatus};

    const HEADER: &str = "RowNumber,CustomerId,Surname,CreditScore,Geography,Gender,Age,Tenure,\
Balance,NumOfProducts,HasCrCard,IsActiveMember,EstimatedSalary,Exited";

    fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_full_schema_csv() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            "{HEADER}\n\
             1,15634602,Hargrave,619,France,Female,42,2,0.0,1,1,1,101348.88,1\n\
             2,15647311,Hill,608,Spain,Female,41,1,83807.86,1,0,1,112542.58,0\n"
        );
        let path = write_file(&dir, "churn.csv", &body);

        let table = load_dataset(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.schema, Column::ALL.to_vec());

        let first = &table.records[0];
        assert_eq!(first.customer_id, Some(15634602));
        assert_eq!(first.surname.as_deref(), Some("Hargrave"));
        assert_eq!(first.age, 42);
        assert!(first.exited);
        assert_eq!(first.has_cr_card, Some(true));

        let features = first.features.unwrap();
        assert_eq!(features.age_group, Some(AgeGroup::From36To45));
        assert_eq!(features.churn_status, ChurnStatus::Churned);
    }

    #[test]
    fn drops_incomplete_rows_and_ignores_unknown_columns() {
        let dir = tempfile::tempdir().unwrap();
        let body = "Geography,Gender,Age,Note,Balance,NumOfProducts,IsActiveMember,Exited\n\
                    France,Female,42,x,0.0,1,1,1\n\
                    Spain,,41,y,100.0,1,0,0\n\
                    Germany,Male,NaN,z,100.0,2,0,0\n\
                    Germany,Male,39.0,,100.0,2,0,0\n";
        let path = write_file(&dir, "partial.csv", body);

        let table = load_file(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[1].age, 39);
        assert!(!table.schema.contains(&Column::Surname));
        assert_eq!(table.schema[0], Column::Geography);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bad.csv", "Geography,Gender,Age\nFrance,Male,30\n");

        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, DataLoadError::MissingColumn("Balance")), "{err}");
    }

    #[test]
    fn malformed_value_reports_row_and_column() {
        let dir = tempfile::tempdir().unwrap();
        let body = "Geography,Gender,Age,Balance,NumOfProducts,IsActiveMember,Exited\n\
                    France,Male,thirty,0.0,1,1,0\n";
        let path = write_file(&dir, "bad.csv", body);

        match load_file(&path).unwrap_err() {
            DataLoadError::Malformed { row, column, value } => {
                assert_eq!(row, 1);
                assert_eq!(column, "Age");
                assert_eq!(value, "thirty");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_after_dropping_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let body = "Geography,Gender,Age,Balance,NumOfProducts,IsActiveMember,Exited\n\
                    France,,30,0.0,1,1,0\n";
        let path = write_file(&dir, "empty.csv", body);

        assert!(matches!(load_file(&path), Err(DataLoadError::Empty)));
    }

    #[test]
    fn missing_file_and_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("Churn_Modelling.csv");
        assert!(matches!(load_file(&missing), Err(DataLoadError::NotFound { .. })));

        let path = write_file(&dir, "churn.xlsx", "");
        assert!(matches!(
            load_file(&path),
            Err(DataLoadError::UnsupportedExtension(ext)) if ext == "xlsx"
        ));
    }

    #[test]
    fn loads_records_oriented_json() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"[
            {"Geography": "France", "Gender": "Male", "Age": 30, "Balance": 0.0,
             "NumOfProducts": 2, "IsActiveMember": true, "Exited": 0},
            {"Geography": "Spain", "Gender": "Female", "Age": 51, "Balance": 1500.5,
             "NumOfProducts": 1, "IsActiveMember": 0, "Exited": 1},
            {"Geography": null, "Gender": "Female", "Age": 51, "Balance": 1500.5,
             "NumOfProducts": 1, "IsActiveMember": 0, "Exited": 1}
        ]"#;
        let path = write_file(&dir, "churn.json", body);

        let table = load_file(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.records[0].is_active_member);
        assert!(table.records[1].exited);
        assert_eq!(table.records[1].balance, 1500.5);
    }

    #[test]
    fn loads_parquet_with_mixed_column_types() {
        use arrow::array::{
            BooleanArray, Float64Array, Int32Array, Int64Array, LargeStringArray, StringArray,
        };
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let columns: Vec<(&str, ArrayRef)> = vec![
            ("Note", Arc::new(StringArray::from(vec!["a", "b", "c", "d"])) as ArrayRef),
            (
                "Geography",
                Arc::new(StringArray::from(vec![
                    Some("France"),
                    None,
                    Some("Spain"),
                    Some("Germany"),
                ])) as ArrayRef,
            ),
            (
                "Gender",
                Arc::new(LargeStringArray::from(vec!["Female", "Male", "Male", "Male"])) as ArrayRef,
            ),
            ("Age", Arc::new(Int32Array::from(vec![42, 30, 51, 39])) as ArrayRef),
            (
                "Balance",
                Arc::new(Float64Array::from(vec![0.0, 100.0, f64::NAN, 1500.5])) as ArrayRef,
            ),
            ("NumOfProducts", Arc::new(Int64Array::from(vec![1, 2, 1, 3])) as ArrayRef),
            (
                "IsActiveMember",
                Arc::new(BooleanArray::from(vec![true, false, true, false])) as ArrayRef,
            ),
            ("Exited", Arc::new(Int64Array::from(vec![1, 0, 0, 1])) as ArrayRef),
        ];
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, col)| Field::new(*name, col.data_type().clone(), true))
            .collect();
        let batch = RecordBatch::try_new(
            Arc::new(Schema::new(fields)),
            columns.into_iter().map(|(_, col)| col).collect(),
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("churn.parquet");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_file(&path).unwrap();
        assert_eq!(
            table.schema,
            vec![
                Column::Geography,
                Column::Gender,
                Column::Age,
                Column::Balance,
                Column::NumOfProducts,
                Column::IsActiveMember,
                Column::Exited,
            ]
        );
        assert_eq!(table.len(), 2, "null geography and NaN balance rows are dropped");

        let first = &table.records[0];
        assert_eq!(first.geography, "France");
        assert_eq!(first.gender, "Female");
        assert_eq!(first.age, 42);
        assert_eq!(first.balance, 0.0);
        assert!(first.is_active_member);
        assert!(first.exited);

        let second = &table.records[1];
        assert_eq!(second.geography, "Germany");
        assert_eq!(second.age, 39);
        assert_eq!(second.balance, 1500.5);
        assert_eq!(second.num_of_products, 3);
        assert!(!second.is_active_member);
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("0.0"), Some(false));
        assert_eq!(parse_flag("True"), Some(true));
        assert_eq!(parse_flag("2"), None);
        assert_eq!(parse_integer("42.0"), Some(42));
        assert_eq!(parse_integer("42.5"), None);
    }

    #[test]
    fn cache_reads_the_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let body = "Geography,Gender,Age,Balance,NumOfProducts,IsActiveMember,Exited\n\
                    France,Male,30,0.0,1,1,0\n";
        let path = write_file(&dir, "churn.csv", body);

        let mut cache = DatasetCache::new(&path);
        assert!(!cache.is_loaded());
        let first = cache.get_or_load().unwrap();

        std::fs::remove_file(&path).unwrap();
        let second = cache.get_or_load().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.records[0].features.is_some());

        assert!(matches!(cache.reload(), Err(DataLoadError::NotFound { .. })));
        assert!(!cache.is_loaded());
    }
}
