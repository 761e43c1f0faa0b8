use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, RecordBatch, UInt32Array};
use arrow::compute;
use arrow::compute::{lexsort_to_indices, SortColumn};
use arrow::datatypes::SchemaRef;

use crate::error::{ExecutionError, ExecutionResult};

pub fn downcast_array<'a, T: 'static>(
    array: &'a dyn Array,
    what: &str,
) -> ExecutionResult<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        ExecutionError::internal(format!(
            "expected {what} array, found {}",
            array.data_type()
        ))
    })
}

/// Combines all batches into one. An empty input yields an empty batch
/// with the given schema, so downstream code can still derive types.
pub fn coalesce_batches(
    schema: &SchemaRef,
    batches: &[RecordBatch],
) -> ExecutionResult<RecordBatch> {
    if batches.is_empty() {
        Ok(RecordBatch::new_empty(schema.clone()))
    } else {
        Ok(compute::concat_batches(schema, batches)?)
    }
}

/// Replaces nulls in a filter mask with `false`, matching SQL predicate
/// semantics where an unknown condition does not select the row.
pub fn null_mask_to_false(mask: &BooleanArray) -> BooleanArray {
    if mask.null_count() == 0 {
        mask.clone()
    } else {
        mask.iter().map(|v| Some(v.unwrap_or(false))).collect()
    }
}

/// Sorts by the given columns with a trailing row-index tiebreaker, so
/// rows that compare equal on every key keep their input order.
pub fn stable_sort_indices(
    mut columns: Vec<SortColumn>,
    num_rows: usize,
) -> ExecutionResult<UInt32Array> {
    columns.push(SortColumn {
        values: Arc::new(UInt32Array::from_iter_values(0..num_rows as u32)),
        options: None,
    });
    Ok(lexsort_to_indices(&columns, None)?)
}

/// Takes the given row indices from every column of a batch. Null
/// indices produce null rows, which outer joins rely on.
pub fn take_batch(batch: &RecordBatch, indices: &UInt32Array) -> ExecutionResult<RecordBatch> {
    let columns = batch
        .columns()
        .iter()
        .map(|column| Ok(compute::take(column.as_ref(), indices, None)?))
        .collect::<ExecutionResult<Vec<ArrayRef>>>()?;
    Ok(RecordBatch::try_new(batch.schema(), columns)?)
}

/// Takes the given row indices from a standalone array.
pub fn take_array(array: &dyn Array, indices: &UInt32Array) -> ExecutionResult<ArrayRef> {
    Ok(compute::take(array, indices, None)?)
}
