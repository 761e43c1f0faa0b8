use std::fs::{self, File};
use std::path::{Path, PathBuf};

use skiff_common::config::AppConfig;
use skiff_execution::dataframe::DataFrame;
use skiff_plan::write::SaveMode;

use crate::error::{DataSourceError, DataSourceResult};
use crate::formats::csv::write_csv_file;
use crate::formats::parquet::write_parquet_file;
use crate::options::CsvWriteOptions;

/// How a write interacts with an existing target directory.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub mode: SaveMode,
    /// Zero-padding width of the part-file index.
    pub part_digits: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        let config = AppConfig::default();
        WriterOptions {
            mode: SaveMode::default(),
            part_digits: config.io.write_part_digits,
        }
    }
}

impl WriterOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        WriterOptions {
            mode: SaveMode::default(),
            part_digits: config.io.write_part_digits,
        }
    }

    pub fn with_mode(mut self, mode: SaveMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Writes a dataframe to `path` as a directory of CSV part files.
pub fn write_csv(
    df: &DataFrame,
    path: &Path,
    csv: &CsvWriteOptions,
    options: &WriterOptions,
) -> DataSourceResult<()> {
    let Some(part) = prepare_target(path, options.mode, "csv")? else {
        return Ok(());
    };
    let file = File::create(part_path(path, part, options.part_digits, "csv"))?;
    write_csv_file(df, file, csv)
}

/// Writes a dataframe to `path` as a directory of Parquet part files.
pub fn write_parquet(df: &DataFrame, path: &Path, options: &WriterOptions) -> DataSourceResult<()> {
    let Some(part) = prepare_target(path, options.mode, "parquet")? else {
        return Ok(());
    };
    let file = File::create(part_path(path, part, options.part_digits, "parquet"))?;
    write_parquet_file(df, file)
}

fn part_path(dir: &Path, index: usize, digits: usize, extension: &str) -> PathBuf {
    dir.join(format!("part-{index:0digits$}.{extension}"))
}

/// Applies the save mode against the target directory, returning the
/// index of the next part file, or `None` when the write is skipped.
fn prepare_target(
    path: &Path,
    mode: SaveMode,
    extension: &str,
) -> DataSourceResult<Option<usize>> {
    if !path.exists() {
        fs::create_dir_all(path)?;
        return Ok(Some(0));
    }
    match mode {
        SaveMode::ErrorIfExists => Err(DataSourceError::invalid(format!(
            "path already exists: {}",
            path.display()
        ))),
        SaveMode::IgnoreIfExists => {
            log::debug!("skipping write, path exists: {}", path.display());
            Ok(None)
        }
        SaveMode::Overwrite => {
            if path.is_dir() {
                fs::remove_dir_all(path)?;
            } else {
                fs::remove_file(path)?;
            }
            fs::create_dir_all(path)?;
            Ok(Some(0))
        }
        SaveMode::Append => {
            if !path.is_dir() {
                return Err(DataSourceError::invalid(format!(
                    "cannot append to a non-directory path: {}",
                    path.display()
                )));
            }
            Ok(Some(next_part_index(path, extension)?))
        }
    }
}

fn next_part_index(dir: &Path, extension: &str) -> DataSourceResult<usize> {
    let suffix = format!(".{extension}");
    let mut next = 0;
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        let Some(index) = name
            .strip_prefix("part-")
            .and_then(|rest| rest.strip_suffix(&suffix))
        else {
            continue;
        };
        if let Ok(index) = index.parse::<usize>() {
            next = next.max(index + 1);
        }
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::datatypes::{DataType, Field, Schema};
    use skiff_execution::dataframe::DataFrame;
    use skiff_plan::write::SaveMode;

    use super::{write_csv, WriterOptions};
    use crate::options::CsvWriteOptions;

    fn numbers() -> DataFrame {
        let schema = Arc::new(Schema::new(vec![Field::new("n", DataType::Int64, true)]));
        DataFrame::from_rows(schema, vec![vec![1i64.into()], vec![2i64.into()]]).unwrap()
    }

    #[test]
    fn test_error_if_exists_is_the_default() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        let df = numbers();
        write_csv(&df, &target, &CsvWriteOptions::default(), &WriterOptions::default()).unwrap();
        assert!(target.join("part-00000.csv").exists());
        let err = write_csv(
            &df,
            &target,
            &CsvWriteOptions::default(),
            &WriterOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_ignore_mode_skips() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        let df = numbers();
        let options = WriterOptions::default().with_mode(SaveMode::IgnoreIfExists);
        write_csv(&df, &target, &CsvWriteOptions::default(), &options).unwrap();
        write_csv(&df, &target, &CsvWriteOptions::default(), &options).unwrap();
        assert_eq!(std::fs::read_dir(&target).unwrap().count(), 1);
    }

    #[test]
    fn test_append_adds_part_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        let df = numbers();
        let options = WriterOptions::default().with_mode(SaveMode::Append);
        write_csv(&df, &target, &CsvWriteOptions::default(), &options).unwrap();
        write_csv(&df, &target, &CsvWriteOptions::default(), &options).unwrap();
        assert!(target.join("part-00000.csv").exists());
        assert!(target.join("part-00001.csv").exists());
    }

    #[test]
    fn test_overwrite_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        let df = numbers();
        let append = WriterOptions::default().with_mode(SaveMode::Append);
        write_csv(&df, &target, &CsvWriteOptions::default(), &append).unwrap();
        write_csv(&df, &target, &CsvWriteOptions::default(), &append).unwrap();
        let overwrite = WriterOptions::default().with_mode(SaveMode::Overwrite);
        write_csv(&df, &target, &CsvWriteOptions::default(), &overwrite).unwrap();
        assert_eq!(std::fs::read_dir(&target).unwrap().count(), 1);
    }
}
