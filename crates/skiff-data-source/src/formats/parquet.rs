use std::fs::File;
use std::path::Path;

use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use skiff_execution::dataframe::DataFrame;

use crate::error::DataSourceResult;

pub fn read_parquet(path: &Path) -> DataSourceResult<DataFrame> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    log::debug!(
        "read {} Parquet batches from {}",
        batches.len(),
        path.display()
    );
    Ok(DataFrame::try_new(schema, batches)?)
}

/// Writes a dataframe as a single Parquet file.
pub fn write_parquet_file(df: &DataFrame, file: File) -> DataSourceResult<()> {
    let mut writer = ArrowWriter::try_new(file, df.schema().clone(), None)?;
    for batch in df.batches() {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(())
}
