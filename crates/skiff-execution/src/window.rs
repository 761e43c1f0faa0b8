use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Int32Array, RecordBatch};
use arrow::compute::{SortColumn, SortOptions};
use arrow::datatypes::{DataType, Field, Schema};
use skiff_common::scalar::ScalarValue;
use skiff_plan::window::{WindowFrame, WindowFunction, WindowSpec};

use crate::dataframe::DataFrame;
use crate::error::{ExecutionError, ExecutionResult};
use crate::eval::evaluate;
use crate::utils::{coalesce_batches, stable_sort_indices, take_batch};

/// Computes a window function over the given partitioning and ordering,
/// appending the result as a new column. The output keeps every input
/// row, reordered by (partition, order) keys so results are
/// deterministic.
pub fn window_column(
    df: &DataFrame,
    name: &str,
    function: &WindowFunction,
    spec: &WindowSpec,
) -> ExecutionResult<DataFrame> {
    if matches!(
        function,
        WindowFunction::Rank | WindowFunction::DenseRank | WindowFunction::RowNumber
    ) && spec.order_by.is_empty()
    {
        return Err(ExecutionError::missing(format!(
            "window ordering for {}",
            function.name()
        )));
    }
    let batch = coalesce_batches(df.schema(), df.batches())?;

    let mut sort_columns = Vec::new();
    let partition_count = spec.partition_by.len();
    for expr in &spec.partition_by {
        sort_columns.push(SortColumn {
            values: evaluate(expr, &batch)?,
            options: None,
        });
    }
    for sort in &spec.order_by {
        sort_columns.push(SortColumn {
            values: evaluate(&sort.expr, &batch)?,
            options: Some(SortOptions {
                descending: !sort.ascending,
                nulls_first: sort.nulls_first,
            }),
        });
    }
    let batch = if sort_columns.is_empty() {
        batch
    } else {
        let indices = stable_sort_indices(sort_columns, batch.num_rows())?;
        take_batch(&batch, &indices)?
    };

    // Key columns re-read in output order for boundary detection.
    let partition_keys = spec
        .partition_by
        .iter()
        .map(|expr| evaluate(expr, &batch))
        .collect::<ExecutionResult<Vec<_>>>()?;
    let order_keys = spec
        .order_by
        .iter()
        .map(|sort| evaluate(&sort.expr, &batch))
        .collect::<ExecutionResult<Vec<_>>>()?;
    debug_assert_eq!(partition_keys.len(), partition_count);

    let values = match function {
        WindowFunction::RowNumber => rank_values(&batch, &partition_keys, &[], RankKind::RowNumber)?,
        WindowFunction::Rank => rank_values(&batch, &partition_keys, &order_keys, RankKind::Rank)?,
        WindowFunction::DenseRank => {
            rank_values(&batch, &partition_keys, &order_keys, RankKind::DenseRank)?
        }
        WindowFunction::Sum(expr) => {
            let argument = evaluate(expr, &batch)?;
            let running = match spec.frame {
                Some(WindowFrame::Running) => true,
                Some(WindowFrame::Entire) => false,
                None => !spec.order_by.is_empty(),
            };
            sum_values(&batch, &partition_keys, argument, running)?
        }
    };

    let mut fields: Vec<Field> = batch
        .schema_ref()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    fields.push(Field::new(name, values.data_type().clone(), true));
    let mut columns = batch.columns().to_vec();
    columns.push(values);
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    DataFrame::try_new(schema, vec![batch])
}

fn row_key(keys: &[ArrayRef], row: usize) -> ExecutionResult<Vec<ScalarValue>> {
    keys.iter()
        .map(|array| Ok(ScalarValue::try_from_array(array.as_ref(), row)?))
        .collect()
}

enum RankKind {
    RowNumber,
    Rank,
    DenseRank,
}

fn rank_values(
    batch: &RecordBatch,
    partition_keys: &[ArrayRef],
    order_keys: &[ArrayRef],
    kind: RankKind,
) -> ExecutionResult<ArrayRef> {
    let mut values = Vec::with_capacity(batch.num_rows());
    let mut partition: Option<Vec<ScalarValue>> = None;
    let mut peer: Vec<ScalarValue> = Vec::new();
    let mut position = 0;
    let mut rank = 0;
    let mut dense_rank = 0;
    for row in 0..batch.num_rows() {
        let current = row_key(partition_keys, row)?;
        if partition.as_ref() != Some(&current) {
            partition = Some(current);
            position = 0;
            rank = 0;
            dense_rank = 0;
            peer.clear();
        }
        position += 1;
        let order = row_key(order_keys, row)?;
        if position == 1 || order != peer {
            rank = position;
            dense_rank += 1;
            peer = order;
        }
        values.push(match kind {
            RankKind::RowNumber => position,
            RankKind::Rank => rank,
            RankKind::DenseRank => dense_rank,
        });
    }
    Ok(Arc::new(Int32Array::from(values)))
}

/// A running sum from the partition start, or the partition total,
/// per the frame resolved by the caller.
fn sum_values(
    batch: &RecordBatch,
    partition_keys: &[ArrayRef],
    argument: ArrayRef,
    running: bool,
) -> ExecutionResult<ArrayRef> {
    let as_float = matches!(argument.data_type(), DataType::Float64);
    let argument = if as_float || matches!(argument.data_type(), DataType::Int64) {
        argument
    } else {
        arrow::compute::cast(argument.as_ref(), &DataType::Int64)?
    };

    // Rows of each partition, in output order.
    let mut partitions: Vec<Vec<usize>> = Vec::new();
    let mut current: Option<Vec<ScalarValue>> = None;
    for row in 0..batch.num_rows() {
        let key = row_key(partition_keys, row)?;
        if current.as_ref() != Some(&key) {
            current = Some(key);
            partitions.push(Vec::new());
        }
        if let Some(rows) = partitions.last_mut() {
            rows.push(row);
        }
    }

    let mut values = vec![ScalarValue::Null; batch.num_rows()];
    for rows in partitions {
        let mut sum_int: Option<i64> = None;
        let mut sum_float: Option<f64> = None;
        for &row in &rows {
            let value = ScalarValue::try_from_array(argument.as_ref(), row)?;
            match value {
                ScalarValue::Int64(Some(v)) => {
                    let total = sum_int.unwrap_or(0).checked_add(v).ok_or_else(|| {
                        ExecutionError::invalid("integer overflow in window sum")
                    })?;
                    sum_int = Some(total);
                }
                ScalarValue::Float64(Some(v)) => sum_float = Some(sum_float.unwrap_or(0.0) + v),
                _ => {}
            }
            if running {
                values[row] = if as_float {
                    ScalarValue::Float64(sum_float)
                } else {
                    ScalarValue::Int64(sum_int)
                };
            }
        }
        if !running {
            let total = if as_float {
                ScalarValue::Float64(sum_float)
            } else {
                ScalarValue::Int64(sum_int)
            };
            for &row in &rows {
                values[row] = total.clone();
            }
        }
    }
    let output_type = if as_float {
        DataType::Float64
    } else {
        DataType::Int64
    };
    Ok(ScalarValue::iter_to_array(values, &output_type)?)
}
