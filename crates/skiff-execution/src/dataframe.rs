use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, RecordBatch, UInt32Array};
use arrow::compute;
use arrow::compute::{SortColumn, SortOptions};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use skiff_common::config::AppConfig;
use skiff_common::scalar::ScalarValue;
use skiff_common::schema::format_schema_tree;
use skiff_plan::aggregate::AggExpr;
use skiff_plan::expr::{col, Expr, SortExpr};
use skiff_plan::join::JoinType;
use skiff_plan::window::{WindowFunction, WindowSpec};

use crate::aggregate::GroupedFrame;
use crate::error::{ExecutionError, ExecutionResult};
use crate::eval::{evaluate, evaluate_predicate};
use crate::explode::explode_column;
use crate::format::format_table;
use crate::session::SessionContext;
use crate::utils::{coalesce_batches, stable_sort_indices, take_batch};
use crate::window::window_column;

/// An immutable, schema-bearing collection of rows. Every transform
/// returns a new dataframe; the input is never modified.
#[derive(Debug, Clone)]
pub struct DataFrame {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

/// How `drop_na` decides whether a row is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropNaHow {
    /// Remove rows with at least one null among the considered columns.
    Any,
    /// Remove rows where all considered columns are null.
    All,
}

impl FromStr for DropNaHow {
    type Err = ExecutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(DropNaHow::Any),
            "all" => Ok(DropNaHow::All),
            other => Err(ExecutionError::invalid(format!(
                "drop_na mode: {other} (expected \"any\" or \"all\")"
            ))),
        }
    }
}

impl DataFrame {
    pub fn try_new(schema: SchemaRef, batches: Vec<RecordBatch>) -> ExecutionResult<DataFrame> {
        for batch in &batches {
            if batch.schema_ref().fields() != schema.fields() {
                return Err(ExecutionError::internal(format!(
                    "batch schema {} does not match dataframe schema {}",
                    batch.schema_ref(),
                    schema
                )));
            }
        }
        Ok(DataFrame { schema, batches })
    }

    pub fn empty(schema: SchemaRef) -> DataFrame {
        DataFrame {
            schema,
            batches: vec![],
        }
    }

    /// Builds a dataframe from literal rows, the `createDataFrame` analog.
    pub fn from_rows(
        schema: SchemaRef,
        rows: Vec<Vec<ScalarValue>>,
    ) -> ExecutionResult<DataFrame> {
        let width = schema.fields().len();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(ExecutionError::invalid(format!(
                    "row {i} has {} values but the schema has {width} columns",
                    row.len()
                )));
            }
        }
        let columns = (0..width)
            .map(|i| {
                let values: Vec<ScalarValue> = rows.iter().map(|row| row[i].clone()).collect();
                Ok(ScalarValue::iter_to_array(
                    values,
                    schema.field(i).data_type(),
                )?)
            })
            .collect::<ExecutionResult<Vec<ArrayRef>>>()?;
        let batch = RecordBatch::try_new(schema.clone(), columns)?;
        DataFrame::try_new(schema, vec![batch])
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    /// The batches to evaluate expressions against: at least one, so the
    /// output schema can be derived even from an empty dataframe.
    pub(crate) fn eval_batches(&self) -> Vec<RecordBatch> {
        if self.batches.is_empty() {
            vec![RecordBatch::new_empty(self.schema.clone())]
        } else {
            self.batches.clone()
        }
    }

    pub fn select(&self, exprs: Vec<Expr>) -> ExecutionResult<DataFrame> {
        if exprs.is_empty() {
            return Err(ExecutionError::missing("projection expressions"));
        }
        if exprs.iter().any(|e| matches!(e, Expr::Explode(_))) {
            return Err(ExecutionError::unsupported(
                "explode in select; use with_column instead",
            ));
        }
        let names: Vec<String> = exprs.iter().map(|e| e.display_name()).collect();
        let mut schema: Option<SchemaRef> = None;
        let mut batches = Vec::with_capacity(self.batches.len());
        for batch in self.eval_batches() {
            let columns = exprs
                .iter()
                .map(|expr| evaluate(expr, &batch))
                .collect::<ExecutionResult<Vec<_>>>()?;
            let schema = schema.get_or_insert_with(|| {
                let fields: Vec<Field> = names
                    .iter()
                    .zip(&columns)
                    .map(|(name, column)| Field::new(name, column.data_type().clone(), true))
                    .collect();
                Arc::new(Schema::new(fields))
            });
            batches.push(RecordBatch::try_new(schema.clone(), columns)?);
        }
        match schema {
            Some(schema) => DataFrame::try_new(schema, batches),
            None => Err(ExecutionError::internal("projection produced no batches")),
        }
    }

    /// Adds a column, or replaces the column of the same name in place.
    /// An [`Expr::Explode`] expression expands rows instead.
    pub fn with_column(&self, name: &str, expr: Expr) -> ExecutionResult<DataFrame> {
        if let Expr::Explode(inner) = expr {
            return explode_column(self, name, &inner);
        }
        let mut exprs: Vec<Expr> = Vec::with_capacity(self.schema.fields().len() + 1);
        let mut replaced = false;
        for field in self.schema.fields() {
            if field.name() == name {
                exprs.push(expr.clone().alias(name));
                replaced = true;
            } else {
                exprs.push(col(field.name()));
            }
        }
        if !replaced {
            exprs.push(expr.alias(name));
        }
        self.select(exprs)
    }

    /// Renames a column; as in Spark, a missing name is a no-op.
    pub fn with_column_renamed(&self, old: &str, new: &str) -> ExecutionResult<DataFrame> {
        if self.schema.column_with_name(old).is_none() {
            log::debug!("with_column_renamed: column not found: {old}");
            return Ok(self.clone());
        }
        let fields: Vec<Field> = self
            .schema
            .fields()
            .iter()
            .map(|field| {
                if field.name() == old {
                    field.as_ref().clone().with_name(new)
                } else {
                    field.as_ref().clone()
                }
            })
            .collect();
        let schema = Arc::new(Schema::new(fields));
        let batches = self
            .batches
            .iter()
            .map(|batch| Ok(RecordBatch::try_new(schema.clone(), batch.columns().to_vec())?))
            .collect::<ExecutionResult<Vec<_>>>()?;
        DataFrame::try_new(schema, batches)
    }

    /// Drops the named columns; unknown names are ignored, as in Spark.
    pub fn drop_columns(&self, names: &[&str]) -> ExecutionResult<DataFrame> {
        let dropped: HashSet<&str> = names.iter().copied().collect();
        let kept: Vec<Expr> = self
            .schema
            .fields()
            .iter()
            .filter(|field| !dropped.contains(field.name().as_str()))
            .map(|field| col(field.name()))
            .collect();
        if kept.is_empty() {
            return Err(ExecutionError::invalid("cannot drop every column"));
        }
        self.select(kept)
    }

    pub fn filter(&self, predicate: Expr) -> ExecutionResult<DataFrame> {
        let batches = self
            .batches
            .iter()
            .map(|batch| {
                let mask = evaluate_predicate(&predicate, batch)?;
                Ok(compute::filter_record_batch(batch, &mask)?)
            })
            .collect::<ExecutionResult<Vec<_>>>()?;
        DataFrame::try_new(self.schema.clone(), batches)
    }

    /// Stable multi-key sort with per-key direction and null placement.
    pub fn sort(&self, sorts: Vec<SortExpr>) -> ExecutionResult<DataFrame> {
        if sorts.is_empty() {
            return Err(ExecutionError::missing("sort expressions"));
        }
        let batch = coalesce_batches(&self.schema, &self.batches)?;
        let columns = sorts
            .iter()
            .map(|sort| {
                Ok(SortColumn {
                    values: evaluate(&sort.expr, &batch)?,
                    options: Some(SortOptions {
                        descending: !sort.ascending,
                        nulls_first: sort.nulls_first,
                    }),
                })
            })
            .collect::<ExecutionResult<Vec<_>>>()?;
        let indices = stable_sort_indices(columns, batch.num_rows())?;
        let sorted = take_batch(&batch, &indices)?;
        DataFrame::try_new(self.schema.clone(), vec![sorted])
    }

    pub fn limit(&self, n: usize) -> ExecutionResult<DataFrame> {
        let mut remaining = n;
        let mut batches = Vec::new();
        for batch in &self.batches {
            if remaining == 0 {
                break;
            }
            let length = batch.num_rows().min(remaining);
            batches.push(batch.slice(0, length));
            remaining -= length;
        }
        DataFrame::try_new(self.schema.clone(), batches)
    }

    pub fn distinct(&self) -> ExecutionResult<DataFrame> {
        self.drop_duplicates(None)
    }

    /// Keeps the first row for each distinct key, where the key is the
    /// given subset of columns or all columns.
    pub fn drop_duplicates(&self, subset: Option<&[&str]>) -> ExecutionResult<DataFrame> {
        let batch = coalesce_batches(&self.schema, &self.batches)?;
        let key_indices = self.resolve_columns(subset)?;
        let mut seen: HashSet<Vec<ScalarValue>> = HashSet::new();
        let mut keep: Vec<u32> = Vec::new();
        for row in 0..batch.num_rows() {
            let key = key_indices
                .iter()
                .map(|&i| ScalarValue::try_from_array(batch.column(i).as_ref(), row))
                .collect::<Result<Vec<_>, _>>()?;
            if seen.insert(key) {
                keep.push(row as u32);
            }
        }
        let kept = take_batch(&batch, &UInt32Array::from(keep))?;
        DataFrame::try_new(self.schema.clone(), vec![kept])
    }

    /// Positional union: column counts and types must line up; the left
    /// schema's names win, as in Spark's `union`.
    pub fn union(&self, other: &DataFrame) -> ExecutionResult<DataFrame> {
        let left = self.schema.fields();
        let right = other.schema.fields();
        if left.len() != right.len() {
            return Err(ExecutionError::invalid(format!(
                "union requires the same number of columns: {} vs {}",
                left.len(),
                right.len()
            )));
        }
        for (l, r) in left.iter().zip(right.iter()) {
            if l.data_type() != r.data_type() {
                return Err(ExecutionError::invalid(format!(
                    "union type mismatch for column {}: {} vs {}",
                    l.name(),
                    l.data_type(),
                    r.data_type()
                )));
            }
        }
        let mut batches = self.batches.clone();
        for batch in &other.batches {
            batches.push(RecordBatch::try_new(
                self.schema.clone(),
                batch.columns().to_vec(),
            )?);
        }
        DataFrame::try_new(self.schema.clone(), batches)
    }

    /// Union matching columns by name instead of position.
    pub fn union_by_name(&self, other: &DataFrame) -> ExecutionResult<DataFrame> {
        let reordered: Vec<Expr> = self
            .schema
            .fields()
            .iter()
            .map(|field| {
                if other.schema.column_with_name(field.name()).is_none() {
                    return Err(ExecutionError::invalid(format!(
                        "union_by_name: column not found in the right side: {}",
                        field.name()
                    )));
                }
                Ok(col(field.name()))
            })
            .collect::<ExecutionResult<Vec<_>>>()?;
        if other.schema.fields().len() != self.schema.fields().len() {
            return Err(ExecutionError::invalid(format!(
                "union_by_name requires the same set of columns: {} vs {}",
                self.schema.fields().len(),
                other.schema.fields().len()
            )));
        }
        self.union(&other.select(reordered)?)
    }

    pub fn drop_na(&self, how: DropNaHow, subset: Option<&[&str]>) -> ExecutionResult<DataFrame> {
        let indices = self.resolve_columns(subset)?;
        let batches = self
            .batches
            .iter()
            .map(|batch| {
                let null_masks = indices
                    .iter()
                    .map(|&i| Ok(compute::is_null(batch.column(i).as_ref())?))
                    .collect::<ExecutionResult<Vec<BooleanArray>>>()?;
                let keep: BooleanArray = (0..batch.num_rows())
                    .map(|row| {
                        let nulls = null_masks.iter().filter(|m| m.value(row)).count();
                        Some(match how {
                            DropNaHow::Any => nulls == 0,
                            DropNaHow::All => nulls < null_masks.len(),
                        })
                    })
                    .collect();
                Ok(compute::filter_record_batch(batch, &keep)?)
            })
            .collect::<ExecutionResult<Vec<_>>>()?;
        DataFrame::try_new(self.schema.clone(), batches)
    }

    /// Replaces nulls with `value` in every column of a compatible type
    /// (or within `subset`). Incompatible columns are left untouched,
    /// matching Spark's `fillna`.
    pub fn fill_na(
        &self,
        value: ScalarValue,
        subset: Option<&[&str]>,
    ) -> ExecutionResult<DataFrame> {
        let indices: HashSet<usize> = self.resolve_columns(subset)?.into_iter().collect();
        let mut schema: Option<SchemaRef> = None;
        let mut batches = Vec::with_capacity(self.batches.len());
        for batch in self.eval_batches() {
            let mut columns = Vec::with_capacity(batch.num_columns());
            for (i, column) in batch.columns().iter().enumerate() {
                if !indices.contains(&i) || !fill_compatible(&value, column.data_type()) {
                    columns.push(column.clone());
                    continue;
                }
                let fill = value.to_array_of_size(batch.num_rows())?;
                let fill = if fill.data_type() == column.data_type() {
                    fill
                } else {
                    compute::cast(fill.as_ref(), column.data_type())?
                };
                let mask = compute::is_not_null(column.as_ref())?;
                columns.push(compute::kernels::zip::zip(&mask, column, &fill)?);
            }
            let schema = schema.get_or_insert_with(|| self.schema.clone());
            batches.push(RecordBatch::try_new(schema.clone(), columns)?);
        }
        DataFrame::try_new(self.schema.clone(), batches)
    }

    pub fn group_by(&self, keys: Vec<Expr>) -> GroupedFrame {
        GroupedFrame::new(self.clone(), keys)
    }

    /// Aggregates over the whole dataframe as a single group.
    pub fn agg(&self, aggregates: Vec<AggExpr>) -> ExecutionResult<DataFrame> {
        self.group_by(vec![]).agg(aggregates)
    }

    pub fn join(
        &self,
        right: &DataFrame,
        on: &[(&str, &str)],
        join_type: JoinType,
    ) -> ExecutionResult<DataFrame> {
        let on: Vec<(String, String)> = on
            .iter()
            .map(|(l, r)| (l.to_string(), r.to_string()))
            .collect();
        crate::join::join(self, right, &on, join_type)
    }

    pub fn with_window_column(
        &self,
        name: &str,
        function: WindowFunction,
        spec: WindowSpec,
    ) -> ExecutionResult<DataFrame> {
        window_column(self, name, &function, &spec)
    }

    /// The first `n` rows as owned values, for inspection and tests.
    pub fn head(&self, n: usize) -> ExecutionResult<Vec<Vec<ScalarValue>>> {
        let mut rows = Vec::new();
        for batch in &self.batches {
            for row in 0..batch.num_rows() {
                if rows.len() >= n {
                    return Ok(rows);
                }
                let values = batch
                    .columns()
                    .iter()
                    .map(|column| ScalarValue::try_from_array(column.as_ref(), row))
                    .collect::<Result<Vec<_>, _>>()?;
                rows.push(values);
            }
        }
        Ok(rows)
    }

    /// All rows as owned values.
    pub fn rows(&self) -> ExecutionResult<Vec<Vec<ScalarValue>>> {
        self.head(usize::MAX)
    }

    pub fn format(&self, limit: usize, truncate: usize) -> ExecutionResult<String> {
        format_table(&self.schema, &self.batches, limit, truncate)
    }

    /// Prints up to `n` rows to stdout.
    pub fn show(&self, n: usize) -> ExecutionResult<()> {
        let display = AppConfig::default().display;
        print!("{}", self.format(n, display.truncate)?);
        Ok(())
    }

    /// Prints rows with the default row count and truncation width.
    pub fn show_default(&self) -> ExecutionResult<()> {
        let display = AppConfig::default().display;
        print!(
            "{}",
            self.format(display.default_show_rows, display.truncate)?
        );
        Ok(())
    }

    pub fn schema_tree(&self) -> ExecutionResult<String> {
        Ok(format_schema_tree(&self.schema)?)
    }

    /// Prints the schema in the `printSchema` tree format.
    pub fn print_schema(&self) -> ExecutionResult<()> {
        print!("{}", self.schema_tree()?);
        Ok(())
    }

    pub fn create_or_replace_temp_view(
        &self,
        ctx: &SessionContext,
        name: &str,
    ) -> ExecutionResult<()> {
        ctx.register_temp_view(name, self.clone(), true)
    }

    /// Resolves a column subset to indices, or every column when `None`.
    fn resolve_columns(&self, subset: Option<&[&str]>) -> ExecutionResult<Vec<usize>> {
        match subset {
            None => Ok((0..self.schema.fields().len()).collect()),
            Some(names) => names
                .iter()
                .map(|name| {
                    self.schema
                        .column_with_name(name)
                        .map(|(i, _)| i)
                        .ok_or_else(|| {
                            ExecutionError::invalid(format!("column not found: {name}"))
                        })
                })
                .collect(),
        }
    }
}

fn fill_compatible(value: &ScalarValue, data_type: &DataType) -> bool {
    let numeric = |t: &DataType| {
        matches!(t, DataType::Int32 | DataType::Int64 | DataType::Float64)
    };
    match value.data_type() {
        ref t if numeric(t) => numeric(data_type),
        DataType::Utf8 => data_type == &DataType::Utf8,
        DataType::Boolean => data_type == &DataType::Boolean,
        DataType::Date32 => data_type == &DataType::Date32,
        _ => false,
    }
}
