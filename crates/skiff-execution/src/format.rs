use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use comfy_table::{presets, Cell, Table};
use skiff_common::scalar::ScalarValue;

use crate::error::ExecutionResult;

/// Renders up to `limit` rows as an ASCII table, truncating long cells
/// at `truncate` characters.
pub fn format_table(
    schema: &SchemaRef,
    batches: &[RecordBatch],
    limit: usize,
    truncate: usize,
) -> ExecutionResult<String> {
    let mut table = Table::new();
    table.load_preset(presets::ASCII_FULL);
    table.set_header(
        schema
            .fields()
            .iter()
            .map(|field| Cell::new(field.name()))
            .collect::<Vec<_>>(),
    );
    let mut shown = 0;
    let mut total = 0;
    for batch in batches {
        total += batch.num_rows();
        for row in 0..batch.num_rows() {
            if shown >= limit {
                continue;
            }
            let cells = batch
                .columns()
                .iter()
                .map(|column| {
                    let value = ScalarValue::try_from_array(column.as_ref(), row)?;
                    Ok(Cell::new(truncate_cell(&value.to_string(), truncate)))
                })
                .collect::<ExecutionResult<Vec<_>>>()?;
            table.add_row(cells);
            shown += 1;
        }
    }
    let mut out = table.to_string();
    out.push('\n');
    if total > limit {
        out.push_str(&format!("only showing top {limit} rows\n"));
    }
    Ok(out)
}

fn truncate_cell(value: &str, truncate: usize) -> String {
    if truncate == 0 || value.chars().count() <= truncate {
        value.to_string()
    } else {
        let prefix: String = value.chars().take(truncate).collect();
        format!("{prefix}...")
    }
}

#[cfg(test)]
mod tests {
    use super::truncate_cell;

    #[test]
    fn test_truncate_cell() {
        assert_eq!(truncate_cell("short", 20), "short");
        assert_eq!(truncate_cell("a very long cell value", 6), "a very...");
        assert_eq!(truncate_cell("untouched", 0), "untouched");
    }
}
