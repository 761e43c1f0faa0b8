use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{ArrayRef, RecordBatch, UInt32Array};
use arrow::datatypes::{Field, Schema, SchemaRef};
use skiff_common::scalar::ScalarValue;
use skiff_plan::join::JoinType;

use crate::dataframe::DataFrame;
use crate::error::{ExecutionError, ExecutionResult};
use crate::utils::{coalesce_batches, take_batch};

/// Hash join on one or more equality column pairs. Rows with a null key
/// never match, but are kept by the outer variants and by the anti join.
pub fn join(
    left: &DataFrame,
    right: &DataFrame,
    on: &[(String, String)],
    join_type: JoinType,
) -> ExecutionResult<DataFrame> {
    if on.is_empty() {
        return Err(ExecutionError::missing("join keys"));
    }
    let left_batch = coalesce_batches(left.schema(), left.batches())?;
    let right_batch = coalesce_batches(right.schema(), right.batches())?;
    let left_keys = key_columns(&left_batch, on.iter().map(|(l, _)| l.as_str()))?;
    let right_keys = key_columns(&right_batch, on.iter().map(|(_, r)| r.as_str()))?;

    let (left_indices, right_indices) = match join_type {
        JoinType::Inner | JoinType::Left | JoinType::Anti => {
            let table = build_hash_table(&right_keys, right_batch.num_rows())?;
            probe(&left_keys, left_batch.num_rows(), &table, join_type)?
        }
        JoinType::Right => {
            let table = build_hash_table(&left_keys, left_batch.num_rows())?;
            let (probe_side, build_side) =
                probe(&right_keys, right_batch.num_rows(), &table, JoinType::Left)?;
            (build_side, probe_side)
        }
    };

    let left_out = take_batch(&left_batch, &left_indices)?;
    if join_type == JoinType::Anti {
        return DataFrame::try_new(left.schema().clone(), vec![left_out]);
    }
    let right_out = take_batch(&right_batch, &right_indices)?;
    let schema = join_schema(left.schema(), right.schema());
    let columns: Vec<ArrayRef> = left_out
        .columns()
        .iter()
        .chain(right_out.columns().iter())
        .cloned()
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    DataFrame::try_new(schema, vec![batch])
}

/// Output fields from both sides; right-side names already present on
/// the left get a `right_` prefix so every column stays addressable.
fn join_schema(left: &SchemaRef, right: &SchemaRef) -> SchemaRef {
    let mut fields: Vec<Field> = left
        .fields()
        .iter()
        .map(|f| f.as_ref().clone().with_nullable(true))
        .collect();
    for field in right.fields() {
        let name = if left.column_with_name(field.name()).is_some() {
            format!("right_{}", field.name())
        } else {
            field.name().clone()
        };
        fields.push(field.as_ref().clone().with_name(name).with_nullable(true));
    }
    Arc::new(Schema::new(fields))
}

fn key_columns<'a>(
    batch: &RecordBatch,
    names: impl Iterator<Item = &'a str>,
) -> ExecutionResult<Vec<ArrayRef>> {
    names
        .map(|name| {
            let (index, _) = batch
                .schema_ref()
                .column_with_name(name)
                .ok_or_else(|| ExecutionError::invalid(format!("join column not found: {name}")))?;
            Ok(batch.column(index).clone())
        })
        .collect()
}

fn key_at(keys: &[ArrayRef], row: usize) -> ExecutionResult<Option<Vec<ScalarValue>>> {
    let mut key = Vec::with_capacity(keys.len());
    for array in keys {
        let value = ScalarValue::try_from_array(array.as_ref(), row)?;
        if value.is_null() {
            return Ok(None);
        }
        key.push(value);
    }
    Ok(Some(key))
}

fn build_hash_table(
    keys: &[ArrayRef],
    num_rows: usize,
) -> ExecutionResult<HashMap<Vec<ScalarValue>, Vec<u32>>> {
    let mut table: HashMap<Vec<ScalarValue>, Vec<u32>> = HashMap::new();
    for row in 0..num_rows {
        if let Some(key) = key_at(keys, row)? {
            table.entry(key).or_default().push(row as u32);
        }
    }
    Ok(table)
}

fn probe(
    keys: &[ArrayRef],
    num_rows: usize,
    table: &HashMap<Vec<ScalarValue>, Vec<u32>>,
    join_type: JoinType,
) -> ExecutionResult<(UInt32Array, UInt32Array)> {
    let mut probe_indices: Vec<Option<u32>> = Vec::new();
    let mut build_indices: Vec<Option<u32>> = Vec::new();
    for row in 0..num_rows {
        let matches = match key_at(keys, row)? {
            Some(key) => table.get(&key),
            None => None,
        };
        match (join_type, matches) {
            (JoinType::Inner, Some(matches)) => {
                for build_row in matches {
                    probe_indices.push(Some(row as u32));
                    build_indices.push(Some(*build_row));
                }
            }
            (JoinType::Inner, None) => {}
            (JoinType::Left, Some(matches)) => {
                for build_row in matches {
                    probe_indices.push(Some(row as u32));
                    build_indices.push(Some(*build_row));
                }
            }
            (JoinType::Left, None) => {
                probe_indices.push(Some(row as u32));
                build_indices.push(None);
            }
            (JoinType::Anti, Some(_)) => {}
            (JoinType::Anti, None) => {
                probe_indices.push(Some(row as u32));
                build_indices.push(None);
            }
            (JoinType::Right, _) => {
                return Err(ExecutionError::internal(
                    "right join must probe with swapped sides",
                ));
            }
        }
    }
    Ok((
        UInt32Array::from(probe_indices),
        UInt32Array::from(build_indices),
    ))
}
