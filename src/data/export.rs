use super::error::ExportError;
use super::filter::Subset;
use super::model::{Column, DERIVED_HEADERS};

/// Suggested name for the downloaded file.
pub const EXPORT_FILE_NAME: &str = "filtered_churn_data.csv";
pub const EXPORT_MIME: &str = "text/csv";

/// Encode the subset as UTF-8 CSV: schema columns in order, then the derived
/// columns.  Risk tiers are not part of the export.
pub fn to_csv_bytes(subset: &Subset<'_>) -> Result<Vec<u8>, ExportError> {
    let schema: &[Column] = &subset.table().schema;
    let mut writer = csv::Writer::from_writer(Vec::new());

    let header = schema
        .iter()
        .map(|c| c.header())
        .chain(DERIVED_HEADERS);
    writer.write_record(header)?;

    for record in subset.records() {
        let base = schema.iter().map(|&c| record.cell_text(c));
        writer.write_record(base.chain(record.derived_text()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.error().to_string()))?;
    log::debug!("Exported {} rows ({} bytes)", subset.len(), bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::data::features::{derive_features, AgeGroup, BalanceBucket, ChurnStatus};
    use crate::data::filter::{FilterOptions, FilterSpec};
    use crate::data::loader::load_file;
    use crate::data::model::{fixtures, CustomerRecord, Table};

    #[test]
    fn header_follows_schema_then_derived_columns() {
        let mut table = fixtures::sample_table();
        derive_features(&mut table);
        let subset = Subset::new(&table, vec![0usize]);

        let text = String::from_utf8(to_csv_bytes(&subset).unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Geography,Gender,Age,Balance,NumOfProducts,IsActiveMember,Exited,AgeGroup,BalanceBucket,ChurnStatus")
        );
        assert_eq!(lines.next(), Some("France,Female,42,0.0,1,0,1,36-45,Zero,Churned"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn empty_subset_exports_header_only() {
        let table = fixtures::sample_table();
        let bytes = to_csv_bytes(&Subset::new(&table, Vec::<usize>::new())).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap().lines().count(), 1);
    }

    #[test]
    fn round_trip_preserves_every_column() {
        let mut table = fixtures::sample_table();
        for (i, r) in table.records.iter_mut().enumerate() {
            r.customer_id = Some(15_600_000 + i as i64);
            r.surname = Some(format!("O'Neil, {i}"));
            r.estimated_salary = Some(100_000.0 + i as f64 * 0.25);
        }
        table.schema = Column::ALL
            .into_iter()
            .filter(|c| {
                c.is_required()
                    || matches!(c, Column::CustomerId | Column::Surname | Column::EstimatedSalary)
            })
            .collect();
        derive_features(&mut table);

        let options = FilterOptions::from_table(&table);
        let mut spec = FilterSpec::select_all(&options);
        spec.gender.remove("Male");
        let subset = Subset::apply(&table, &spec);
        let bytes = to_csv_bytes(&subset).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(EXPORT_FILE_NAME);
        std::fs::File::create(&path).unwrap().write_all(&bytes).unwrap();
        let parsed: Table = load_file(&path).unwrap();

        assert_eq!(parsed.schema, table.schema);
        let expected: Vec<_> = subset
            .records()
            .map(|r| CustomerRecord {
                features: None,
                ..r.clone()
            })
            .collect();
        assert_eq!(parsed.records, expected);

        // Derived columns survive the trip as text.
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        for (row, original) in reader.records().zip(subset.records()) {
            let row = row.unwrap();
            let n = table.schema.len();
            let features = original.features.unwrap();
            assert_eq!(AgeGroup::from_label(&row[n]), features.age_group);
            assert_eq!(BalanceBucket::from_label(&row[n + 1]), features.balance_bucket);
            assert_eq!(ChurnStatus::from_label(&row[n + 2]), Some(features.churn_status));
        }
    }
}
