use super::clean::CleanError;
use super::schema::DATE_FORMAT;
use polars::prelude::*;
use std::path::Path;

/// Read a headered CSV file, keeping only the columns of `projection` and
/// parsing each one into its projected type.
///
/// Every column is first read as text so that a value which fails to parse
/// can be reported verbatim, with its column and 1-based data row. Extra
/// columns in the file are ignored; missing ones are an error.
pub fn read_projected(path: &Path, projection: &Schema) -> Result<DataFrame, CleanError> {
    if !path.exists() {
        return Err(CleanError::MissingInput {
            path: path.to_path_buf(),
        });
    }

    let read_err = |e: PolarsError| CleanError::Read(e.to_string());

    let mut lf = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()
        .map_err(read_err)?;

    let header = lf.collect_schema().map_err(read_err)?;
    for name in projection.iter_names() {
        if !header.contains(name) {
            return Err(CleanError::MissingColumn {
                column: name.to_string(),
            });
        }
    }

    let text = lf
        .select(
            projection
                .iter_names()
                .map(|name| col(name.clone()))
                .collect::<Vec<_>>(),
        )
        .collect()
        .map_err(read_err)?;

    parse_columns(text, projection)
}

/// Convert an all-text frame to the projected types, rejecting unparseable values.
pub(crate) fn parse_columns(text: DataFrame, projection: &Schema) -> Result<DataFrame, CleanError> {
    let read_err = |e: PolarsError| CleanError::Read(e.to_string());

    let exprs: Vec<Expr> = projection
        .iter()
        .map(|(name, dtype)| {
            let column = col(name.clone());
            match dtype {
                DataType::String => column,
                DataType::Date => column
                    .str()
                    .to_date(StrptimeOptions {
                        format: Some(DATE_FORMAT.into()),
                        strict: false,
                        exact: true,
                        cache: true,
                    })
                    .alias(name.clone()),
                other => column.cast(other.clone()),
            }
        })
        .collect();

    let typed = text.clone().lazy().select(exprs).collect().map_err(read_err)?;

    // A non-strict parse turns bad text into null; any null that was not
    // null before the parse is a malformed value.
    for (name, dtype) in projection.iter() {
        if *dtype == DataType::String {
            continue;
        }
        let before = text.column(name).map_err(read_err)?.as_materialized_series();
        let after = typed.column(name).map_err(read_err)?.as_materialized_series();
        let lost = &before.is_not_null() & &after.is_null();

        let first_lost = lost.into_iter().position(|flag| flag == Some(true));
        if let Some(row) = first_lost {
            let value = before
                .str()
                .map_err(read_err)?
                .get(row)
                .unwrap_or_default()
                .to_string();
            return Err(CleanError::UnparseableValue {
                column: name.to_string(),
                row: row + 1,
                value,
            });
        }
    }

    Ok(typed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::OwidSchema;
    use std::fs;

    fn small_projection() -> Schema {
        Schema::from_iter(vec![
            Field::new("location".into(), DataType::String),
            Field::new("date".into(), DataType::Date),
            Field::new("total_cases".into(), DataType::Float64),
        ])
    }

    fn write_csv(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("raw.csv");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_projection_drops_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "iso_code,location,date,total_cases,stringency_index\n\
             AFG,Afghanistan,2021-01-01,10,3.5\n\
             AFG,Afghanistan,2021-01-02,,3.5\n",
        );

        let df = read_projected(&path, &small_projection()).unwrap();

        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["location", "date", "total_cases"]);
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);

        let cases = df.column("total_cases").unwrap().f64().unwrap();
        assert_eq!(cases.get(0), Some(10.0));
        assert_eq!(cases.get(1), None);
    }

    #[test]
    fn test_missing_column_is_named() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "location,date\nA,2021-01-01\n");

        let err = read_projected(&path, &small_projection()).unwrap_err();

        match err {
            CleanError::MissingColumn { column } => assert_eq!(column, "total_cases"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_date_is_reported_with_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "location,date,total_cases\nA,2021-01-01,1\nA,01/02/2021,2\n",
        );

        let err = read_projected(&path, &small_projection()).unwrap_err();

        match err {
            CleanError::UnparseableValue { column, row, value } => {
                assert_eq!(column, "date");
                assert_eq!(row, 2);
                assert_eq!(value, "01/02/2021");
            }
            other => panic!("expected UnparseableValue, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_number_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "location,date,total_cases\nA,2021-01-01,lots\n",
        );

        let err = read_projected(&path, &small_projection()).unwrap_err();

        assert!(matches!(
            err,
            CleanError::UnparseableValue { ref column, row: 1, ref value }
                if column == "total_cases" && value == "lots"
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = read_projected(Path::new("/nonexistent/raw.csv"), &OwidSchema::schema())
            .unwrap_err();
        assert!(matches!(err, CleanError::MissingInput { .. }));
    }
}
