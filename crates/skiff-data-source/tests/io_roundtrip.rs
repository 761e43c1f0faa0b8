use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use skiff_common::scalar::ScalarValue;
use skiff_data_source::formats::csv::read_csv;
use skiff_data_source::formats::parquet::read_parquet;
use skiff_data_source::listing::list_files;
use skiff_data_source::options::{CsvReadOptions, CsvWriteOptions};
use skiff_data_source::writer::{write_csv, write_parquet, WriterOptions};
use skiff_execution::dataframe::DataFrame;
use skiff_plan::write::SaveMode;

fn items_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, true),
        Field::new("qty", DataType::Int64, true),
        Field::new("price", DataType::Float64, true),
    ]))
}

fn items() -> DataFrame {
    DataFrame::from_rows(
        items_schema(),
        vec![
            vec!["apple".into(), 3i64.into(), 1.5.into()],
            vec!["pear".into(), 7i64.into(), 2.25.into()],
        ],
    )
    .unwrap()
}

#[test]
fn test_csv_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("items");
    let df = items();
    write_csv(
        &df,
        &target,
        &CsvWriteOptions::default(),
        &WriterOptions::default(),
    )
    .unwrap();

    let options = CsvReadOptions::default()
        .with_header(true)
        .with_schema(items_schema());
    let back = read_csv(&target.join("part-00000.csv"), &options).unwrap();
    assert_eq!(back.schema(), df.schema());
    assert_eq!(back.rows().unwrap(), df.rows().unwrap());
}

#[test]
fn test_parquet_round_trip_with_nulls() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("items");
    let df = DataFrame::from_rows(
        items_schema(),
        vec![
            vec!["apple".into(), 3i64.into(), ScalarValue::Float64(None)],
            vec![ScalarValue::Utf8(None), 7i64.into(), 2.25.into()],
        ],
    )
    .unwrap();
    write_parquet(&df, &target, &WriterOptions::default()).unwrap();

    let back = read_parquet(&target.join("part-00000.parquet")).unwrap();
    assert_eq!(back.schema().fields(), df.schema().fields());
    assert_eq!(back.rows().unwrap(), df.rows().unwrap());
}

#[test]
fn test_append_then_list() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("items");
    let options = WriterOptions::default().with_mode(SaveMode::Append);
    write_parquet(&items(), &target, &options).unwrap();
    write_parquet(&items(), &target, &options).unwrap();

    let entries = list_files(&target).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["part-00000.parquet", "part-00001.parquet"]);
    assert!(entries.iter().all(|e| e.size > 0));

    let back = read_parquet(&target.join("part-00001.parquet")).unwrap();
    assert_eq!(back.num_rows(), 2);
}
