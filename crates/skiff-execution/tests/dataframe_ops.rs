use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use skiff_common::scalar::ScalarValue;
use skiff_execution::dataframe::{DataFrame, DropNaHow};
use skiff_plan::expr::{
    col, date_add, date_format, datediff, explode, initcap, lit, split, upper, when,
};

fn employees_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, true),
        Field::new("dept", DataType::Utf8, true),
        Field::new("salary", DataType::Int32, true),
    ]))
}

fn employees() -> DataFrame {
    DataFrame::from_rows(
        employees_schema(),
        vec![
            vec!["james".into(), "Sales".into(), 3000.into()],
            vec!["anna".into(), "Finance".into(), 4100.into()],
            vec!["robert".into(), "Sales".into(), 4100.into()],
            vec!["maria".into(), "Finance".into(), 3000.into()],
        ],
    )
    .unwrap()
}

fn utf8(v: &str) -> ScalarValue {
    v.into()
}

#[test]
fn test_select_alias_and_arithmetic() {
    let df = employees()
        .select(vec![
            upper(col("name")).alias("name"),
            (col("salary") * lit(2)).alias("double_salary"),
        ])
        .unwrap();
    assert_eq!(df.column_names(), vec!["name", "double_salary"]);
    let rows = df.rows().unwrap();
    assert_eq!(rows[0], vec![utf8("JAMES"), ScalarValue::Int32(Some(6000))]);
}

#[test]
fn test_division_always_yields_double() {
    let df = employees()
        .select(vec![(col("salary") / lit(2)).alias("half")])
        .unwrap();
    assert_eq!(df.schema().field(0).data_type(), &DataType::Float64);
    let rows = df.rows().unwrap();
    assert_eq!(rows[0][0], ScalarValue::Float64(Some(1500.0)));
}

#[test]
fn test_filter_and_isin() {
    let df = employees()
        .filter(col("dept").eq(lit("Sales")).and(col("salary").gt(lit(3500))))
        .unwrap();
    let rows = df.rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], utf8("robert"));

    let df = employees()
        .filter(col("dept").isin(["Sales", "Marketing"]))
        .unwrap();
    assert_eq!(df.num_rows(), 2);
}

#[test]
fn test_with_column_replaces_in_place() {
    let df = employees()
        .with_column("salary", col("salary") + lit(100))
        .unwrap();
    assert_eq!(df.column_names(), vec!["name", "dept", "salary"]);
    assert_eq!(df.rows().unwrap()[0][2], ScalarValue::Int32(Some(3100)));

    let df = employees().with_column("bonus", lit(500)).unwrap();
    assert_eq!(df.column_names(), vec!["name", "dept", "salary", "bonus"]);
}

#[test]
fn test_with_column_renamed_missing_is_noop() {
    let df = employees().with_column_renamed("dept", "department").unwrap();
    assert_eq!(df.column_names(), vec!["name", "department", "salary"]);

    let df = employees().with_column_renamed("no_such", "other").unwrap();
    assert_eq!(df.column_names(), vec!["name", "dept", "salary"]);
}

#[test]
fn test_drop_columns_ignores_unknown() {
    let df = employees().drop_columns(&["salary", "no_such"]).unwrap();
    assert_eq!(df.column_names(), vec!["name", "dept"]);
}

#[test]
fn test_cast_column() {
    let df = employees()
        .with_column("salary", col("salary").cast(DataType::Utf8))
        .unwrap();
    assert_eq!(df.schema().field(2).data_type(), &DataType::Utf8);
    assert_eq!(df.rows().unwrap()[0][2], utf8("3000"));
}

#[test]
fn test_sort_directions_and_nulls() {
    let schema = Arc::new(Schema::new(vec![Field::new(
        "v",
        DataType::Int32,
        true,
    )]));
    let df = DataFrame::from_rows(
        schema,
        vec![
            vec![ScalarValue::Int32(Some(3))],
            vec![ScalarValue::Int32(None)],
            vec![ScalarValue::Int32(Some(1))],
        ],
    )
    .unwrap();

    let asc = df.sort(vec![col("v").asc()]).unwrap();
    let values: Vec<ScalarValue> = asc.rows().unwrap().into_iter().map(|mut r| r.remove(0)).collect();
    assert_eq!(
        values,
        vec![
            ScalarValue::Int32(None),
            ScalarValue::Int32(Some(1)),
            ScalarValue::Int32(Some(3)),
        ]
    );

    let desc = df.sort(vec![col("v").desc()]).unwrap();
    let values: Vec<ScalarValue> =
        desc.rows().unwrap().into_iter().map(|mut r| r.remove(0)).collect();
    assert_eq!(
        values,
        vec![
            ScalarValue::Int32(Some(3)),
            ScalarValue::Int32(Some(1)),
            ScalarValue::Int32(None),
        ]
    );
}

#[test]
fn test_sort_keeps_tied_rows_in_input_order() {
    let schema = Arc::new(Schema::new(vec![
        Field::new("k", DataType::Utf8, true),
        Field::new("seq", DataType::Int32, true),
    ]));
    let rows: Vec<Vec<ScalarValue>> = (0..200)
        .map(|i| {
            let key = if i % 2 == 0 { "a" } else { "b" };
            vec![key.into(), ScalarValue::Int32(Some(i))]
        })
        .collect();
    let df = DataFrame::from_rows(schema, rows).unwrap();

    // Stable: within each key, rows keep their input order.
    let sorted = df.sort(vec![col("k").asc()]).unwrap();
    let expected: Vec<i32> = (0..200).step_by(2).chain((1..200).step_by(2)).collect();
    for (row, want) in sorted.rows().unwrap().iter().zip(expected) {
        assert_eq!(row[1], ScalarValue::Int32(Some(want)));
    }
}

#[test]
fn test_limit() {
    let df = employees().limit(2).unwrap();
    assert_eq!(df.num_rows(), 2);
    let df = employees().limit(100).unwrap();
    assert_eq!(df.num_rows(), 4);
}

#[test]
fn test_drop_duplicates_keeps_first() {
    let df = employees().union(&employees()).unwrap();
    assert_eq!(df.num_rows(), 8);
    assert_eq!(df.distinct().unwrap().num_rows(), 4);

    let by_dept = df.drop_duplicates(Some(&["dept"])).unwrap();
    let rows = by_dept.rows().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], utf8("james"));
    assert_eq!(rows[1][0], utf8("anna"));

    let err = df.drop_duplicates(Some(&["no_such"])).unwrap_err();
    assert!(err.to_string().contains("no_such"));
}

#[test]
fn test_union_type_mismatch() {
    let schema = Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, true),
        Field::new("dept", DataType::Utf8, true),
        Field::new("salary", DataType::Float64, true),
    ]));
    let other = DataFrame::empty(schema);
    assert!(employees().union(&other).is_err());
}

#[test]
fn test_union_by_name_reorders() {
    let shuffled = employees()
        .select(vec![col("salary"), col("name"), col("dept")])
        .unwrap();
    let df = employees().union_by_name(&shuffled).unwrap();
    assert_eq!(df.num_rows(), 8);
    assert_eq!(df.column_names(), vec!["name", "dept", "salary"]);
    let rows = df.rows().unwrap();
    assert_eq!(rows[4], rows[0]);
}

#[test]
fn test_drop_na_and_fill_na() {
    let schema = Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, true),
        Field::new("score", DataType::Float64, true),
    ]));
    let df = DataFrame::from_rows(
        schema,
        vec![
            vec!["a".into(), 1.5.into()],
            vec![ScalarValue::Utf8(None), ScalarValue::Float64(None)],
            vec!["c".into(), ScalarValue::Float64(None)],
        ],
    )
    .unwrap();

    assert_eq!(df.drop_na(DropNaHow::Any, None).unwrap().num_rows(), 1);
    assert_eq!(df.drop_na(DropNaHow::All, None).unwrap().num_rows(), 2);
    assert_eq!(
        df.drop_na(DropNaHow::Any, Some(&["name"])).unwrap().num_rows(),
        2
    );

    let filled = df.fill_na(ScalarValue::from(0.0), None).unwrap();
    let rows = filled.rows().unwrap();
    // Only the numeric column is filled; the string column keeps its null.
    assert_eq!(rows[1][0], ScalarValue::Utf8(None));
    assert_eq!(rows[1][1], ScalarValue::Float64(Some(0.0)));

    let named = df.fill_na(utf8("unknown"), Some(&["name"])).unwrap();
    assert_eq!(named.rows().unwrap()[1][0], utf8("unknown"));
}

#[test]
fn test_split_get_item_and_explode() {
    let schema = Arc::new(Schema::new(vec![Field::new(
        "line",
        DataType::Utf8,
        true,
    )]));
    let df = DataFrame::from_rows(
        schema,
        vec![
            vec!["big data spark".into()],
            vec!["rust".into()],
            vec![ScalarValue::Utf8(None)],
        ],
    )
    .unwrap();
    let df = df.with_column("words", split(col("line"), " ")).unwrap();

    let first = df
        .select(vec![col("words").get_item(0).alias("first")])
        .unwrap();
    let rows = first.rows().unwrap();
    assert_eq!(rows[0][0], utf8("big"));
    assert_eq!(rows[2][0], ScalarValue::Utf8(None));

    // Out-of-bounds index yields null.
    let third = df
        .select(vec![col("words").get_item(2).alias("third")])
        .unwrap();
    assert_eq!(third.rows().unwrap()[1][0], ScalarValue::Utf8(None));

    let exploded = df.with_column("word", explode(col("words"))).unwrap();
    let words: Vec<ScalarValue> = exploded
        .rows()
        .unwrap()
        .into_iter()
        .map(|mut r| r.remove(2))
        .collect();
    assert_eq!(
        words,
        vec![utf8("big"), utf8("data"), utf8("spark"), utf8("rust")]
    );
}

#[test]
fn test_case_when_otherwise() {
    let df = employees()
        .select(vec![
            col("name"),
            when(col("salary").gt(lit(4000)), lit("high"))
                .when(col("salary").gt(lit(3000)), lit("medium"))
                .otherwise(lit("low"))
                .alias("band"),
        ])
        .unwrap();
    let bands: Vec<ScalarValue> = df
        .rows()
        .unwrap()
        .into_iter()
        .map(|mut r| r.remove(1))
        .collect();
    assert_eq!(
        bands,
        vec![utf8("low"), utf8("high"), utf8("high"), utf8("low")]
    );
}

#[test]
fn test_initcap() {
    let df = employees()
        .select(vec![initcap(col("name")).alias("name")])
        .unwrap();
    assert_eq!(df.rows().unwrap()[0][0], utf8("James"));
}

#[test]
fn test_date_functions() {
    let schema = Arc::new(Schema::new(vec![Field::new(
        "d",
        DataType::Date32,
        true,
    )]));
    // Day 0 is 1970-01-01.
    let df = DataFrame::from_rows(
        schema,
        vec![
            vec![ScalarValue::Date32(Some(0))],
            vec![ScalarValue::Date32(None)],
        ],
    )
    .unwrap();
    let df = df
        .select(vec![
            date_add(col("d"), 10).alias("later"),
            datediff(date_add(col("d"), 10), col("d")).alias("diff"),
            date_format(col("d"), "dd-MM-yyyy").alias("formatted"),
        ])
        .unwrap();
    let rows = df.rows().unwrap();
    assert_eq!(rows[0][0], ScalarValue::Date32(Some(10)));
    assert_eq!(rows[0][1], ScalarValue::Int32(Some(10)));
    assert_eq!(rows[0][2], utf8("01-01-1970"));
    assert!(rows[1][2].is_null());
}

#[test]
fn test_show_format() {
    let text = employees().format(2, 20).unwrap();
    assert!(text.contains("james"));
    assert!(text.contains("only showing top 2 rows"));
}

#[test]
fn test_schema_tree() {
    let tree = employees().schema_tree().unwrap();
    assert!(tree.starts_with("root\n"));
    assert!(tree.contains(" |-- salary: int (nullable = true)"));
}
