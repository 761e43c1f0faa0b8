use arrow::array::{new_null_array, Array, ArrayRef, BooleanArray, RecordBatch};
use arrow::compute;
use arrow::compute::kernels::{cmp, numeric, zip};
use arrow::datatypes::DataType;
use skiff_common::scalar::ScalarValue;
use skiff_plan::expr::{Expr, Operator};

use crate::error::{ExecutionError, ExecutionResult};
use crate::functions;
use crate::utils::{downcast_array, null_mask_to_false};

/// Evaluates an expression against a batch, producing an array with one
/// value per row.
pub fn evaluate(expr: &Expr, batch: &RecordBatch) -> ExecutionResult<ArrayRef> {
    match expr {
        Expr::Column(name) => {
            let (index, _) = batch.schema_ref().column_with_name(name).ok_or_else(|| {
                ExecutionError::invalid(format!(
                    "column not found: {name}; available columns: {}",
                    batch
                        .schema_ref()
                        .fields()
                        .iter()
                        .map(|f| f.name().as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })?;
            Ok(batch.column(index).clone())
        }
        Expr::Literal(value) => Ok(value.to_array_of_size(batch.num_rows())?),
        Expr::Alias { expr, .. } => evaluate(expr, batch),
        Expr::BinaryOp { left, op, right } => {
            let left = evaluate(left, batch)?;
            let right = evaluate(right, batch)?;
            evaluate_binary_op(left, *op, right)
        }
        Expr::Not(expr) => {
            let array = evaluate_predicate_with_nulls(expr, batch)?;
            Ok(make_array(compute::not(&array)?))
        }
        Expr::IsNull(expr) => {
            let array = evaluate(expr, batch)?;
            Ok(make_array(compute::is_null(array.as_ref())?))
        }
        Expr::IsNotNull(expr) => {
            let array = evaluate(expr, batch)?;
            Ok(make_array(compute::is_not_null(array.as_ref())?))
        }
        Expr::InList { expr, list } => {
            let array = evaluate(expr, batch)?;
            evaluate_in_list(array, list)
        }
        Expr::Cast { expr, data_type } => {
            let array = evaluate(expr, batch)?;
            Ok(compute::cast(array.as_ref(), data_type)?)
        }
        Expr::Case {
            branches,
            otherwise,
        } => evaluate_case(branches, otherwise.as_deref(), batch),
        Expr::ScalarFunction { function, args } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, batch))
                .collect::<ExecutionResult<Vec<_>>>()?;
            functions::evaluate_scalar_function(*function, &args, batch.num_rows())
        }
        Expr::Udf { function, args } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, batch))
                .collect::<ExecutionResult<Vec<_>>>()?;
            Ok(function.invoke(&args)?)
        }
        Expr::Explode(_) => Err(ExecutionError::unsupported(
            "explode outside the top level of withColumn",
        )),
    }
}

/// Evaluates a filter condition to a boolean mask with nulls replaced by
/// `false`.
pub fn evaluate_predicate(expr: &Expr, batch: &RecordBatch) -> ExecutionResult<BooleanArray> {
    Ok(null_mask_to_false(&evaluate_predicate_with_nulls(
        expr, batch,
    )?))
}

fn evaluate_predicate_with_nulls(
    expr: &Expr,
    batch: &RecordBatch,
) -> ExecutionResult<BooleanArray> {
    let array = evaluate(expr, batch)?;
    Ok(downcast_array::<BooleanArray>(array.as_ref(), "boolean")?.clone())
}

fn make_array(array: BooleanArray) -> ArrayRef {
    std::sync::Arc::new(array)
}

fn is_numeric(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Int32 | DataType::Int64 | DataType::Float64
    )
}

/// Casts both sides of a binary operation to a common type: the wider
/// numeric type for numeric pairs, otherwise the types must already match.
fn coerce(
    left: ArrayRef,
    right: ArrayRef,
    op: Operator,
) -> ExecutionResult<(ArrayRef, ArrayRef)> {
    let (lt, rt) = (left.data_type().clone(), right.data_type().clone());
    if lt == rt && op != Operator::Divide {
        return Ok((left, right));
    }
    if is_numeric(&lt) && is_numeric(&rt) {
        let target = if op == Operator::Divide {
            // Division always yields a double, as in Spark.
            DataType::Float64
        } else if lt == DataType::Float64 || rt == DataType::Float64 {
            DataType::Float64
        } else if lt == DataType::Int64 || rt == DataType::Int64 {
            DataType::Int64
        } else {
            DataType::Int32
        };
        let left = compute::cast(left.as_ref(), &target)?;
        let right = compute::cast(right.as_ref(), &target)?;
        return Ok((left, right));
    }
    // Null literals adopt the other side's type.
    if lt == DataType::Null {
        let left = compute::cast(left.as_ref(), &rt)?;
        return Ok((left, right));
    }
    if rt == DataType::Null {
        let right = compute::cast(right.as_ref(), &lt)?;
        return Ok((left, right));
    }
    Err(ExecutionError::invalid(format!(
        "cannot apply operator {op} to types {lt} and {rt}"
    )))
}

fn evaluate_binary_op(left: ArrayRef, op: Operator, right: ArrayRef) -> ExecutionResult<ArrayRef> {
    match op {
        Operator::And | Operator::Or => {
            let left = downcast_array::<BooleanArray>(left.as_ref(), "boolean")?;
            let right = downcast_array::<BooleanArray>(right.as_ref(), "boolean")?;
            let result = match op {
                Operator::And => compute::and_kleene(left, right)?,
                _ => compute::or_kleene(left, right)?,
            };
            Ok(make_array(result))
        }
        Operator::Eq
        | Operator::NotEq
        | Operator::Lt
        | Operator::LtEq
        | Operator::Gt
        | Operator::GtEq => {
            let (left, right) = coerce(left, right, op)?;
            let result = match op {
                Operator::Eq => cmp::eq(&left, &right)?,
                Operator::NotEq => cmp::neq(&left, &right)?,
                Operator::Lt => cmp::lt(&left, &right)?,
                Operator::LtEq => cmp::lt_eq(&left, &right)?,
                Operator::Gt => cmp::gt(&left, &right)?,
                _ => cmp::gt_eq(&left, &right)?,
            };
            Ok(make_array(result))
        }
        Operator::Plus | Operator::Minus | Operator::Multiply | Operator::Divide => {
            let (left, right) = coerce(left, right, op)?;
            let result = match op {
                Operator::Plus => numeric::add(&left, &right)?,
                Operator::Minus => numeric::sub(&left, &right)?,
                Operator::Multiply => numeric::mul(&left, &right)?,
                _ => numeric::div(&left, &right)?,
            };
            Ok(result)
        }
    }
}

fn evaluate_in_list(array: ArrayRef, list: &[ScalarValue]) -> ExecutionResult<ArrayRef> {
    let mut result: Option<BooleanArray> = None;
    for value in list {
        let candidate = value.to_array_of_size(array.len())?;
        let (left, right) = coerce(array.clone(), candidate, Operator::Eq)?;
        let matched = cmp::eq(&left, &right)?;
        result = Some(match result {
            None => matched,
            Some(acc) => compute::or_kleene(&acc, &matched)?,
        });
    }
    match result {
        Some(result) => Ok(make_array(result)),
        // An empty list matches nothing.
        None => Ok(make_array(BooleanArray::from(vec![
            Some(false);
            array.len()
        ]))),
    }
}

fn evaluate_case(
    branches: &[(Expr, Expr)],
    otherwise: Option<&Expr>,
    batch: &RecordBatch,
) -> ExecutionResult<ArrayRef> {
    let values = branches
        .iter()
        .map(|(_, value)| evaluate(value, batch))
        .collect::<ExecutionResult<Vec<_>>>()?;
    let result_type = values
        .iter()
        .map(|v| v.data_type().clone())
        .find(|t| t != &DataType::Null)
        .unwrap_or(DataType::Null);
    let mut result = match otherwise {
        Some(expr) => {
            let array = evaluate(expr, batch)?;
            if array.data_type() == &result_type {
                array
            } else {
                compute::cast(array.as_ref(), &result_type)?
            }
        }
        None => new_null_array(&result_type, batch.num_rows()),
    };
    for ((condition, _), value) in branches.iter().zip(values).rev() {
        let mask = evaluate_predicate(condition, batch)?;
        let value = if value.data_type() == &result_type {
            value
        } else {
            compute::cast(value.as_ref(), &result_type)?
        };
        result = zip::zip(&mask, &value, &result)?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Float64Array, Int32Array, RecordBatch, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use skiff_common::scalar::ScalarValue;
    use skiff_plan::expr::{col, lit, when};

    use super::evaluate;

    fn test_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("name", DataType::Utf8, true),
            Field::new("weight", DataType::Float64, true),
            Field::new("year", DataType::Int32, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec![Some("a"), None, Some("c")])),
                Arc::new(Float64Array::from(vec![Some(9.5), Some(12.0), None])),
                Arc::new(Int32Array::from(vec![1999, 2004, 2010])),
            ],
        )
        .unwrap()
    }

    fn scalar_at(array: &dyn arrow::array::Array, i: usize) -> ScalarValue {
        ScalarValue::try_from_array(array, i).unwrap()
    }

    #[test]
    fn test_arithmetic_coercion() {
        let batch = test_batch();
        let result = evaluate(&(col("weight") * lit(2)), &batch).unwrap();
        assert_eq!(result.data_type(), &DataType::Float64);
        assert_eq!(scalar_at(result.as_ref(), 0), ScalarValue::from(19.0));
        assert!(scalar_at(result.as_ref(), 2).is_null());
    }

    #[test]
    fn test_comparison_and_null_predicate() {
        let batch = test_batch();
        let expr = col("weight").lt(lit(10.0)).or(col("name").is_null());
        let result = evaluate(&expr, &batch).unwrap();
        assert_eq!(scalar_at(result.as_ref(), 0), ScalarValue::from(true));
        assert_eq!(scalar_at(result.as_ref(), 1), ScalarValue::from(true));
        // null < 10.0 is null, and null OR false is null
        assert!(scalar_at(result.as_ref(), 2).is_null());
    }

    #[test]
    fn test_isin() {
        let batch = test_batch();
        let result = evaluate(&col("name").isin(["a", "b"]), &batch).unwrap();
        assert_eq!(scalar_at(result.as_ref(), 0), ScalarValue::from(true));
        assert_eq!(scalar_at(result.as_ref(), 2), ScalarValue::from(false));
    }

    #[test]
    fn test_case_without_otherwise_yields_null() {
        let batch = test_batch();
        let expr = when(col("year").gt(lit(2000)), lit("modern")).end();
        let result = evaluate(&expr, &batch).unwrap();
        assert!(scalar_at(result.as_ref(), 0).is_null());
        assert_eq!(scalar_at(result.as_ref(), 1), ScalarValue::from("modern"));
    }

    #[test]
    fn test_division_yields_double() {
        let batch = test_batch();
        let result = evaluate(&(col("year") / lit(2)), &batch).unwrap();
        assert_eq!(result.data_type(), &DataType::Float64);
        assert_eq!(scalar_at(result.as_ref(), 0), ScalarValue::from(999.5));
    }
}
