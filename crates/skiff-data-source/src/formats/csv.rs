use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use skiff_execution::dataframe::DataFrame;

use crate::error::DataSourceResult;
use crate::options::{CsvReadOptions, CsvWriteOptions};

/// Reads a CSV file into a dataframe. Without an explicit schema the
/// file is scanned once for inference; with `infer_schema` off, every
/// column comes back as a string.
pub fn read_csv(path: &Path, options: &CsvReadOptions) -> DataSourceResult<DataFrame> {
    let format = Format::default()
        .with_header(options.header)
        .with_delimiter(options.delimiter);
    let schema = match &options.schema {
        Some(schema) => schema.clone(),
        None => {
            let mut file = File::open(path)?;
            let (schema, _) =
                format.infer_schema(&mut file, Some(options.schema_infer_max_records))?;
            let schema = if options.infer_schema {
                schema
            } else {
                string_columns(schema)
            };
            if options.header {
                Arc::new(schema)
            } else {
                Arc::new(default_column_names(schema))
            }
        }
    };
    let file = File::open(path)?;
    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .build(file)?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    log::debug!("read {} CSV batches from {}", batches.len(), path.display());
    Ok(DataFrame::try_new(schema, batches)?)
}

/// Writes a dataframe as a single CSV file.
pub fn write_csv_file(
    df: &DataFrame,
    file: impl Write,
    options: &CsvWriteOptions,
) -> DataSourceResult<()> {
    let mut writer = WriterBuilder::new()
        .with_header(options.header)
        .with_delimiter(options.delimiter)
        .build(file);
    if df.batches().is_empty() {
        // Forces the header line even when there are no rows.
        writer.write(&arrow::array::RecordBatch::new_empty(df.schema().clone()))?;
    }
    for batch in df.batches() {
        writer.write(batch)?;
    }
    Ok(())
}

fn string_columns(schema: Schema) -> Schema {
    let fields = schema
        .fields()
        .iter()
        .map(|field| Field::new(field.name(), DataType::Utf8, field.is_nullable()))
        .collect::<Vec<_>>();
    Schema::new(fields)
}

/// Replaces the inferred placeholder names of a headerless file with
/// `_c0`, `_c1`, and so on.
fn default_column_names(schema: Schema) -> Schema {
    let fields = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| {
            Field::new(
                format!("_c{i}"),
                field.data_type().clone(),
                field.is_nullable(),
            )
        })
        .collect::<Vec<_>>();
    Schema::new(fields)
}
