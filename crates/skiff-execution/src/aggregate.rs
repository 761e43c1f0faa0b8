use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{ArrayRef, RecordBatch};
use arrow::datatypes::{DataType, Field, Schema};
use skiff_common::scalar::ScalarValue;
use skiff_plan::aggregate::{AggExpr, AggregateFunction};
use skiff_plan::expr::Expr;

use crate::dataframe::DataFrame;
use crate::error::{ExecutionError, ExecutionResult};
use crate::eval::evaluate;
use crate::utils::coalesce_batches;

/// A dataframe with grouping keys attached, produced by
/// [`DataFrame::group_by`].
#[derive(Debug, Clone)]
pub struct GroupedFrame {
    df: DataFrame,
    keys: Vec<Expr>,
}

impl GroupedFrame {
    pub(crate) fn new(df: DataFrame, keys: Vec<Expr>) -> GroupedFrame {
        GroupedFrame { df, keys }
    }

    pub fn agg(&self, aggregates: Vec<AggExpr>) -> ExecutionResult<DataFrame> {
        aggregate(&self.df, &self.keys, &aggregates)
    }

    /// Turns the distinct values of `pivot` into output columns.
    pub fn pivot(&self, pivot: Expr) -> PivotedFrame {
        PivotedFrame {
            df: self.df.clone(),
            keys: self.keys.clone(),
            pivot,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PivotedFrame {
    df: DataFrame,
    keys: Vec<Expr>,
    pivot: Expr,
}

impl PivotedFrame {
    pub fn agg(&self, aggregate: AggExpr) -> ExecutionResult<DataFrame> {
        pivot_aggregate(&self.df, &self.keys, &self.pivot, &aggregate)
    }
}

struct GroupState {
    /// Group keys in first-seen order.
    keys: Vec<Vec<ScalarValue>>,
    index: HashMap<Vec<ScalarValue>, usize>,
}

impl GroupState {
    fn new() -> GroupState {
        GroupState {
            keys: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn group_for(&mut self, key: Vec<ScalarValue>) -> (usize, bool) {
        match self.index.get(&key) {
            Some(index) => (*index, false),
            None => {
                let index = self.keys.len();
                self.index.insert(key.clone(), index);
                self.keys.push(key);
                (index, true)
            }
        }
    }
}

fn aggregate(
    df: &DataFrame,
    keys: &[Expr],
    aggregates: &[AggExpr],
) -> ExecutionResult<DataFrame> {
    let batch = coalesce_batches(df.schema(), df.batches())?;
    let key_arrays = keys
        .iter()
        .map(|key| evaluate(key, &batch))
        .collect::<ExecutionResult<Vec<_>>>()?;
    let arg_arrays = aggregates
        .iter()
        .map(|agg| evaluate(&agg.expr, &batch))
        .collect::<ExecutionResult<Vec<_>>>()?;
    let arg_types: Vec<DataType> = arg_arrays
        .iter()
        .map(|array| array.data_type().clone())
        .collect();

    let mut state = GroupState::new();
    let mut accumulators: Vec<Vec<Accumulator>> = Vec::new();
    // A global aggregation always produces one row, even over no input.
    if keys.is_empty() {
        state.group_for(vec![]);
        accumulators.push(make_accumulators(aggregates, &arg_types)?);
    }
    for row in 0..batch.num_rows() {
        let key = key_arrays
            .iter()
            .map(|array| ScalarValue::try_from_array(array.as_ref(), row))
            .collect::<Result<Vec<_>, _>>()?;
        let (group, inserted) = state.group_for(key);
        if inserted {
            accumulators.push(make_accumulators(aggregates, &arg_types)?);
        }
        for (accumulator, array) in accumulators[group].iter_mut().zip(&arg_arrays) {
            accumulator.update(ScalarValue::try_from_array(array.as_ref(), row)?)?;
        }
    }

    let mut fields = Vec::with_capacity(keys.len() + aggregates.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(fields.capacity());
    for (i, key) in keys.iter().enumerate() {
        let values: Vec<ScalarValue> = state.keys.iter().map(|k| k[i].clone()).collect();
        let data_type = key_arrays[i].data_type().clone();
        columns.push(ScalarValue::iter_to_array(values, &data_type)?);
        fields.push(Field::new(key.display_name(), data_type, true));
    }
    for (i, agg) in aggregates.iter().enumerate() {
        let output_type = output_type(agg.function, &arg_types[i])?;
        let values = accumulators
            .iter_mut()
            .map(|accs| accs[i].finish())
            .collect::<ExecutionResult<Vec<_>>>()?;
        columns.push(ScalarValue::iter_to_array(values, &output_type)?);
        fields.push(Field::new(agg.output_name(), output_type, true));
    }
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    DataFrame::try_new(schema, vec![batch])
}

fn pivot_aggregate(
    df: &DataFrame,
    keys: &[Expr],
    pivot: &Expr,
    aggregate: &AggExpr,
) -> ExecutionResult<DataFrame> {
    let batch = coalesce_batches(df.schema(), df.batches())?;
    let key_arrays = keys
        .iter()
        .map(|key| evaluate(key, &batch))
        .collect::<ExecutionResult<Vec<_>>>()?;
    let pivot_array = evaluate(pivot, &batch)?;
    let arg_array = evaluate(&aggregate.expr, &batch)?;
    let arg_type = arg_array.data_type().clone();

    // Distinct pivot values, sorted for a deterministic column order.
    let mut pivot_values: Vec<ScalarValue> = Vec::new();
    for row in 0..batch.num_rows() {
        let value = ScalarValue::try_from_array(pivot_array.as_ref(), row)?;
        if !pivot_values.contains(&value) {
            pivot_values.push(value);
        }
    }
    pivot_values.sort();
    let pivot_index: HashMap<ScalarValue, usize> = pivot_values
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, v)| (v, i))
        .collect();

    let mut state = GroupState::new();
    let mut accumulators: Vec<Vec<Accumulator>> = Vec::new();
    for row in 0..batch.num_rows() {
        let key = key_arrays
            .iter()
            .map(|array| ScalarValue::try_from_array(array.as_ref(), row))
            .collect::<Result<Vec<_>, _>>()?;
        let (group, inserted) = state.group_for(key);
        if inserted {
            let mut accs = Vec::with_capacity(pivot_values.len());
            for _ in 0..pivot_values.len() {
                accs.push(make_accumulator(aggregate.function, &arg_type)?);
            }
            accumulators.push(accs);
        }
        let value = ScalarValue::try_from_array(pivot_array.as_ref(), row)?;
        let column = pivot_index[&value];
        accumulators[group][column].update(ScalarValue::try_from_array(arg_array.as_ref(), row)?)?;
    }

    let output_type = output_type(aggregate.function, &arg_type)?;
    let mut fields = Vec::with_capacity(keys.len() + pivot_values.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(fields.capacity());
    for (i, key) in keys.iter().enumerate() {
        let values: Vec<ScalarValue> = state.keys.iter().map(|k| k[i].clone()).collect();
        let data_type = key_arrays[i].data_type().clone();
        columns.push(ScalarValue::iter_to_array(values, &data_type)?);
        fields.push(Field::new(key.display_name(), data_type, true));
    }
    for (i, value) in pivot_values.iter().enumerate() {
        let values = accumulators
            .iter_mut()
            .map(|accs| accs[i].finish())
            .collect::<ExecutionResult<Vec<_>>>()?;
        columns.push(ScalarValue::iter_to_array(values, &output_type)?);
        fields.push(Field::new(value.to_string(), output_type.clone(), true));
    }
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    DataFrame::try_new(schema, vec![batch])
}

fn make_accumulators(
    aggregates: &[AggExpr],
    arg_types: &[DataType],
) -> ExecutionResult<Vec<Accumulator>> {
    aggregates
        .iter()
        .zip(arg_types)
        .map(|(agg, arg_type)| make_accumulator(agg.function, arg_type))
        .collect()
}

fn make_accumulator(
    function: AggregateFunction,
    arg_type: &DataType,
) -> ExecutionResult<Accumulator> {
    match function {
        AggregateFunction::Sum | AggregateFunction::Avg => match arg_type {
            DataType::Int32 | DataType::Int64 => {
                if function == AggregateFunction::Sum {
                    Ok(Accumulator::SumInt(None))
                } else {
                    Ok(Accumulator::Avg { sum: 0.0, count: 0 })
                }
            }
            DataType::Float64 => {
                if function == AggregateFunction::Sum {
                    Ok(Accumulator::SumFloat(None))
                } else {
                    Ok(Accumulator::Avg { sum: 0.0, count: 0 })
                }
            }
            other => Err(ExecutionError::invalid(format!(
                "{} over non-numeric type {other}",
                function.name()
            ))),
        },
        AggregateFunction::Min => Ok(Accumulator::Extreme {
            value: None,
            take_max: false,
        }),
        AggregateFunction::Max => Ok(Accumulator::Extreme {
            value: None,
            take_max: true,
        }),
        AggregateFunction::Count => Ok(Accumulator::Count(0)),
        AggregateFunction::CollectList => {
            Ok(Accumulator::CollectList(Vec::new(), arg_type.clone()))
        }
    }
}

/// The output type of an aggregate over a column of the given type.
fn output_type(function: AggregateFunction, arg_type: &DataType) -> ExecutionResult<DataType> {
    match function {
        AggregateFunction::Sum => match arg_type {
            DataType::Int32 | DataType::Int64 => Ok(DataType::Int64),
            DataType::Float64 => Ok(DataType::Float64),
            other => Err(ExecutionError::invalid(format!(
                "sum over non-numeric type {other}"
            ))),
        },
        AggregateFunction::Avg => Ok(DataType::Float64),
        AggregateFunction::Min | AggregateFunction::Max => Ok(arg_type.clone()),
        AggregateFunction::Count => Ok(DataType::Int64),
        AggregateFunction::CollectList => Ok(DataType::List(Arc::new(
            Field::new_list_field(arg_type.clone(), true),
        ))),
    }
}

/// Running state for one aggregate within one group. Null inputs are
/// skipped by every function, as in SQL.
enum Accumulator {
    SumInt(Option<i64>),
    SumFloat(Option<f64>),
    Avg { sum: f64, count: i64 },
    Extreme { value: Option<ScalarValue>, take_max: bool },
    Count(i64),
    CollectList(Vec<ScalarValue>, DataType),
}

impl Accumulator {
    fn update(&mut self, value: ScalarValue) -> ExecutionResult<()> {
        if value.is_null() {
            return Ok(());
        }
        match self {
            Accumulator::SumInt(sum) => {
                let value = int_value(&value)?;
                let total = sum
                    .unwrap_or(0)
                    .checked_add(value)
                    .ok_or_else(|| ExecutionError::invalid("integer overflow in sum"))?;
                *sum = Some(total);
            }
            Accumulator::SumFloat(sum) => {
                let value = float_value(&value)?;
                *sum = Some(sum.unwrap_or(0.0) + value);
            }
            Accumulator::Avg { sum, count } => {
                *sum += float_value(&value)?;
                *count += 1;
            }
            Accumulator::Extreme {
                value: current,
                take_max,
            } => {
                let better = match current {
                    None => true,
                    Some(current) => {
                        if *take_max {
                            value > *current
                        } else {
                            value < *current
                        }
                    }
                };
                if better {
                    *current = Some(value);
                }
            }
            Accumulator::Count(count) => *count += 1,
            Accumulator::CollectList(values, _) => values.push(value),
        }
        Ok(())
    }

    fn finish(&mut self) -> ExecutionResult<ScalarValue> {
        match self {
            Accumulator::SumInt(sum) => Ok(ScalarValue::Int64(*sum)),
            Accumulator::SumFloat(sum) => Ok(ScalarValue::Float64(*sum)),
            Accumulator::Avg { sum, count } => {
                if *count == 0 {
                    Ok(ScalarValue::Float64(None))
                } else {
                    Ok(ScalarValue::Float64(Some(*sum / *count as f64)))
                }
            }
            Accumulator::Extreme { value, .. } => match value.take() {
                Some(value) => Ok(value),
                None => Ok(ScalarValue::Null),
            },
            Accumulator::Count(count) => Ok(ScalarValue::Int64(Some(*count))),
            Accumulator::CollectList(values, element) => Ok(ScalarValue::List(
                Some(std::mem::take(values)),
                Box::new(element.clone()),
            )),
        }
    }
}

fn int_value(value: &ScalarValue) -> ExecutionResult<i64> {
    match value {
        ScalarValue::Int32(Some(v)) => Ok(*v as i64),
        ScalarValue::Int64(Some(v)) => Ok(*v),
        other => Err(ExecutionError::internal(format!(
            "expected an integer, found {other}"
        ))),
    }
}

fn float_value(value: &ScalarValue) -> ExecutionResult<f64> {
    match value {
        ScalarValue::Int32(Some(v)) => Ok(*v as f64),
        ScalarValue::Int64(Some(v)) => Ok(*v as f64),
        ScalarValue::Float64(Some(v)) => Ok(*v),
        other => Err(ExecutionError::internal(format!(
            "expected a number, found {other}"
        ))),
    }
}
