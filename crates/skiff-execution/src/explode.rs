use std::sync::Arc;

use arrow::array::{Array, ListArray, RecordBatch, UInt32Array};
use arrow::datatypes::{Field, Schema};
use skiff_plan::expr::Expr;

use crate::dataframe::DataFrame;
use crate::error::{ExecutionError, ExecutionResult};
use crate::eval::evaluate;
use crate::utils::{downcast_array, take_array, take_batch};

/// Expands a list-valued expression into one output row per element,
/// repeating all other columns. Rows whose list is null or empty are
/// dropped, matching Spark's `explode`.
pub fn explode_column(df: &DataFrame, name: &str, expr: &Expr) -> ExecutionResult<DataFrame> {
    let mut out_schema = None;
    let mut out_batches = Vec::with_capacity(df.batches().len());
    for batch in df.eval_batches() {
        let list = evaluate(expr, &batch)?;
        let list = downcast_array::<ListArray>(list.as_ref(), "list")?;
        let offsets = list.value_offsets();
        let mut parent_indices = Vec::new();
        let mut child_indices = Vec::new();
        for row in 0..list.len() {
            if list.is_null(row) {
                continue;
            }
            for child in offsets[row]..offsets[row + 1] {
                parent_indices.push(row as u32);
                child_indices.push(child as u32);
            }
        }
        let parents = take_batch(&batch, &UInt32Array::from(parent_indices))?;
        let elements = take_array(
            list.values().as_ref(),
            &UInt32Array::from(child_indices),
        )?;

        let replaced = batch.schema_ref().column_with_name(name).map(|(i, _)| i);
        let mut fields: Vec<Field> = batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.as_ref().clone())
            .collect();
        let mut columns = parents.columns().to_vec();
        let element_field = Field::new(name, elements.data_type().clone(), true);
        match replaced {
            Some(i) => {
                fields[i] = element_field;
                columns[i] = elements;
            }
            None => {
                fields.push(element_field);
                columns.push(elements);
            }
        }
        let schema = Arc::new(Schema::new(fields));
        out_batches.push(RecordBatch::try_new(schema.clone(), columns)?);
        out_schema = Some(schema);
    }
    let schema = out_schema
        .ok_or_else(|| ExecutionError::internal("explode produced no output batches"))?;
    DataFrame::try_new(schema, out_batches)
}
