use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use skiff_common::scalar::ScalarValue;
use skiff_execution::dataframe::DataFrame;
use skiff_execution::session::SessionContext;
use skiff_plan::udf::SimpleScalarUdf;
use skiff_sql::error::SqlError;
use skiff_sql::sql;

fn employees_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, true),
        Field::new("dept", DataType::Utf8, true),
        Field::new("salary", DataType::Int32, true),
    ]))
}

fn context() -> SessionContext {
    let ctx = SessionContext::new();
    let employees = DataFrame::from_rows(
        employees_schema(),
        vec![
            vec!["james".into(), "Sales".into(), 3000.into()],
            vec!["anna".into(), "Finance".into(), 4100.into()],
            vec!["robert".into(), "Sales".into(), 4100.into()],
            vec!["maria".into(), "Finance".into(), 3000.into()],
        ],
    )
    .unwrap();
    ctx.register_temp_view("employees", employees, false).unwrap();

    let departments_schema = Arc::new(Schema::new(vec![
        Field::new("dept", DataType::Utf8, true),
        Field::new("location", DataType::Utf8, true),
    ]));
    let departments = DataFrame::from_rows(
        departments_schema,
        vec![
            vec!["Sales".into(), "NY".into()],
            vec!["Marketing".into(), "LA".into()],
        ],
    )
    .unwrap();
    ctx.register_temp_view("departments", departments, false)
        .unwrap();
    ctx
}

fn utf8(v: &str) -> ScalarValue {
    v.into()
}

#[test]
fn test_select_where_order_limit() {
    let ctx = context();
    let df = sql(
        &ctx,
        "SELECT name, salary FROM employees WHERE salary > 3000 ORDER BY name DESC LIMIT 1",
    )
    .unwrap();
    assert_eq!(df.column_names(), vec!["name", "salary"]);
    let rows = df.rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], utf8("robert"));
}

#[test]
fn test_select_star_and_distinct() {
    let ctx = context();
    let df = sql(&ctx, "SELECT * FROM employees").unwrap();
    assert_eq!(df.column_names(), vec!["name", "dept", "salary"]);
    assert_eq!(df.num_rows(), 4);

    let df = sql(&ctx, "SELECT DISTINCT dept FROM employees").unwrap();
    assert_eq!(df.num_rows(), 2);
}

#[test]
fn test_expressions_and_aliases() {
    let ctx = context();
    let df = sql(
        &ctx,
        "SELECT upper(name) AS name, salary * 2 AS double_salary FROM employees LIMIT 1",
    )
    .unwrap();
    let rows = df.rows().unwrap();
    assert_eq!(rows[0][0], utf8("JAMES"));
    assert_eq!(rows[0][1], ScalarValue::Int64(Some(6000)));
}

#[test]
fn test_group_by_aggregates() {
    let ctx = context();
    let df = sql(
        &ctx,
        "SELECT dept, sum(salary) AS total, count(*) AS n FROM employees GROUP BY dept ORDER BY dept",
    )
    .unwrap();
    assert_eq!(df.column_names(), vec!["dept", "total", "n"]);
    let rows = df.rows().unwrap();
    assert_eq!(
        rows[0],
        vec![utf8("Finance"), ScalarValue::Int64(Some(7100)), ScalarValue::Int64(Some(2))]
    );
    assert_eq!(
        rows[1],
        vec![utf8("Sales"), ScalarValue::Int64(Some(7100)), ScalarValue::Int64(Some(2))]
    );
}

#[test]
fn test_global_aggregate() {
    let ctx = context();
    let df = sql(&ctx, "SELECT count(*) AS n, avg(salary) AS mean FROM employees").unwrap();
    let rows = df.rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], ScalarValue::Int64(Some(4)));
    assert_eq!(rows[0][1], ScalarValue::Float64(Some(3550.0)));
}

#[test]
fn test_inner_join() {
    let ctx = context();
    let df = sql(
        &ctx,
        "SELECT name, location FROM employees JOIN departments ON employees.dept = departments.dept",
    )
    .unwrap();
    assert_eq!(df.num_rows(), 2);
    let rows = df.rows().unwrap();
    assert!(rows.iter().all(|r| r[1] == utf8("NY")));
}

#[test]
fn test_left_join_fills_nulls() {
    let ctx = context();
    let df = sql(
        &ctx,
        "SELECT name, location FROM employees LEFT JOIN departments ON employees.dept = departments.dept ORDER BY name",
    )
    .unwrap();
    assert_eq!(df.num_rows(), 4);
    let rows = df.rows().unwrap();
    let anna = rows.iter().find(|r| r[0] == utf8("anna")).unwrap();
    assert!(anna[1].is_null());
}

#[test]
fn test_where_with_in_list_and_null_checks() {
    let ctx = context();
    let df = sql(
        &ctx,
        "SELECT name FROM employees WHERE dept IN ('Sales', 'Marketing') AND name IS NOT NULL",
    )
    .unwrap();
    assert_eq!(df.num_rows(), 2);
}

#[test]
fn test_cast() {
    let ctx = context();
    let df = sql(&ctx, "SELECT CAST(salary AS STRING) AS s FROM employees LIMIT 1").unwrap();
    assert_eq!(df.schema().field(0).data_type(), &DataType::Utf8);
    assert_eq!(df.rows().unwrap()[0][0], utf8("3000"));
}

#[test]
fn test_registered_udf_in_sql() {
    let ctx = context();
    ctx.register_udf(Arc::new(SimpleScalarUdf::new(
        "add_one",
        DataType::Int64,
        |args: &[ArrayRef]| {
            let values = arrow::compute::cast(args[0].as_ref(), &DataType::Int64)?;
            let values = values.as_any().downcast_ref::<Int64Array>().unwrap();
            let out: Int64Array = values.iter().map(|v| v.map(|v| v + 1)).collect();
            Ok(Arc::new(out) as ArrayRef)
        },
    )))
    .unwrap();
    let df = sql(&ctx, "SELECT add_one(salary) AS s FROM employees LIMIT 1").unwrap();
    assert_eq!(df.rows().unwrap()[0][0], ScalarValue::Int64(Some(3001)));
}

#[test]
fn test_unsupported_constructs_are_reported() {
    let ctx = context();
    let err = sql(&ctx, "SELECT name FROM employees HAVING count(*) > 1").unwrap_err();
    assert!(matches!(err, SqlError::NotSupported(_)));

    let err = sql(&ctx, "INSERT INTO employees VALUES ('x', 'y', 1)").unwrap_err();
    assert!(matches!(err, SqlError::NotSupported(_)));

    let err = sql(&ctx, "SELECT name FROM no_such_view").unwrap_err();
    assert!(err.to_string().contains("no_such_view"));
}
