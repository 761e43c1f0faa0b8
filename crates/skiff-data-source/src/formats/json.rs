use std::fs::File;
use std::io::{BufReader, Seek};
use std::path::Path;
use std::sync::Arc;

use arrow::json::reader::infer_json_schema_from_seekable;
use arrow::json::ReaderBuilder;
use skiff_execution::dataframe::DataFrame;

use crate::error::DataSourceResult;
use crate::options::JsonReadOptions;

/// Reads a newline-delimited JSON file into a dataframe.
pub fn read_json(path: &Path, options: &JsonReadOptions) -> DataSourceResult<DataFrame> {
    let mut reader = BufReader::new(File::open(path)?);
    let schema = match &options.schema {
        Some(schema) => schema.clone(),
        None => {
            let (schema, _) = infer_json_schema_from_seekable(
                &mut reader,
                Some(options.schema_infer_max_records),
            )?;
            reader.rewind()?;
            Arc::new(schema)
        }
    };
    let reader = ReaderBuilder::new(schema.clone()).build(reader)?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    log::debug!(
        "read {} JSON batches from {}",
        batches.len(),
        path.display()
    );
    Ok(DataFrame::try_new(schema, batches)?)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use arrow::datatypes::{DataType, Field, Schema};
    use skiff_common::scalar::ScalarValue;

    use super::read_json;
    use crate::options::JsonReadOptions;

    #[test]
    fn test_read_with_inference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.json");
        fs::write(
            &path,
            "{\"name\":\"anna\",\"age\":30}\n{\"name\":\"jen\",\"age\":null}\n",
        )
        .unwrap();
        let df = read_json(&path, &JsonReadOptions::default()).unwrap();
        let (_, age) = df.schema().column_with_name("age").unwrap();
        assert_eq!(age.data_type(), &DataType::Int64);
        assert_eq!(df.num_rows(), 2);
    }

    #[test]
    fn test_read_with_explicit_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.json");
        fs::write(&path, "{\"name\":\"anna\",\"age\":30}\n").unwrap();
        let schema = Arc::new(Schema::new(vec![
            Field::new("name", DataType::Utf8, true),
            Field::new("age", DataType::Float64, true),
        ]));
        let df = read_json(&path, &JsonReadOptions::default().with_schema(schema.clone())).unwrap();
        assert_eq!(df.schema(), &schema);
        assert_eq!(df.rows().unwrap()[0][1], ScalarValue::Float64(Some(30.0)));
    }
}
