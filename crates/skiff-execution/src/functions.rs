use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Int32Array, ListArray, ListBuilder, StringArray,
    StringBuilder, UInt32Array,
};
use arrow::compute;
use arrow::datatypes::DataType;
use chrono::Utc;
use regex::Regex;
use skiff_common::datetime::{date_from_days, days_from_date, spark_format_to_chrono};
use skiff_common::scalar::ScalarValue;
use skiff_plan::expr::ScalarFunction;

use crate::error::{ExecutionError, ExecutionResult};
use crate::utils::{downcast_array, take_array};

pub fn evaluate_scalar_function(
    function: ScalarFunction,
    args: &[ArrayRef],
    num_rows: usize,
) -> ExecutionResult<ArrayRef> {
    match function {
        ScalarFunction::InitCap => string_unary(function, args, initcap),
        ScalarFunction::Lower => string_unary(function, args, |s| s.to_lowercase()),
        ScalarFunction::Upper => string_unary(function, args, |s| s.to_uppercase()),
        ScalarFunction::RegexpReplace => regexp_replace(args),
        ScalarFunction::Split => split(args),
        ScalarFunction::GetItem => get_item(args),
        ScalarFunction::ArrayContains => array_contains(args),
        ScalarFunction::CurrentDate => {
            let today = days_from_date(Utc::now().date_naive());
            Ok(ScalarValue::Date32(Some(today)).to_array_of_size(num_rows)?)
        }
        ScalarFunction::DateAdd => date_shift(args, 1),
        ScalarFunction::DateSub => date_shift(args, -1),
        ScalarFunction::DateDiff => datediff(args),
        ScalarFunction::DateFormat => date_format(args),
    }
}

fn argument<'a>(
    function: ScalarFunction,
    args: &'a [ArrayRef],
    index: usize,
) -> ExecutionResult<&'a ArrayRef> {
    args.get(index).ok_or_else(|| {
        ExecutionError::missing(format!(
            "argument {index} of {}",
            function.name()
        ))
    })
}

/// Reads a constant argument (e.g. a pattern) from its evaluated array.
/// Returns `None` for an empty batch, where only the output type matters.
fn constant_string(
    function: ScalarFunction,
    args: &[ArrayRef],
    index: usize,
) -> ExecutionResult<Option<String>> {
    let array = argument(function, args, index)?;
    if array.is_empty() {
        return Ok(None);
    }
    match ScalarValue::try_from_array(array.as_ref(), 0)? {
        ScalarValue::Utf8(Some(v)) => Ok(Some(v)),
        other => Err(ExecutionError::invalid(format!(
            "argument {index} of {} must be a string, found {other}",
            function.name()
        ))),
    }
}

fn string_unary(
    function: ScalarFunction,
    args: &[ArrayRef],
    f: impl Fn(&str) -> String,
) -> ExecutionResult<ArrayRef> {
    let array = argument(function, args, 0)?;
    let array = downcast_array::<StringArray>(array.as_ref(), "string")?;
    let result: StringArray = array.iter().map(|v| v.map(&f)).collect();
    Ok(Arc::new(result))
}

fn initcap(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c == ' ' {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

fn compile_regex(pattern: &str) -> ExecutionResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| ExecutionError::invalid(format!("regular expression {pattern:?}: {e}")))
}

fn regexp_replace(args: &[ArrayRef]) -> ExecutionResult<ArrayRef> {
    let function = ScalarFunction::RegexpReplace;
    let input = argument(function, args, 0)?;
    let input = downcast_array::<StringArray>(input.as_ref(), "string")?;
    let (Some(pattern), Some(replacement)) = (
        constant_string(function, args, 1)?,
        constant_string(function, args, 2)?,
    ) else {
        return Ok(arrow::array::new_null_array(&DataType::Utf8, 0));
    };
    let regex = compile_regex(&pattern)?;
    let result: StringArray = input
        .iter()
        .map(|v| v.map(|s| regex.replace_all(s, replacement.as_str()).into_owned()))
        .collect();
    Ok(Arc::new(result))
}

/// Splits strings on a regular expression, as Spark's `split` does.
fn split(args: &[ArrayRef]) -> ExecutionResult<ArrayRef> {
    let function = ScalarFunction::Split;
    let input = argument(function, args, 0)?;
    let input = downcast_array::<StringArray>(input.as_ref(), "string")?;
    let mut builder = ListBuilder::new(StringBuilder::new());
    if let Some(delimiter) = constant_string(function, args, 1)? {
        let regex = compile_regex(&delimiter)?;
        for value in input.iter() {
            match value {
                None => builder.append(false),
                Some(value) => {
                    for part in regex.split(value) {
                        builder.values().append_value(part);
                    }
                    builder.append(true);
                }
            }
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn get_item(args: &[ArrayRef]) -> ExecutionResult<ArrayRef> {
    let function = ScalarFunction::GetItem;
    let list = argument(function, args, 0)?;
    let list = downcast_array::<ListArray>(list.as_ref(), "list")?;
    let index = argument(function, args, 1)?;
    let index = compute::cast(index.as_ref(), &DataType::Int32)?;
    let index = downcast_array::<Int32Array>(index.as_ref(), "int")?;
    let offsets = list.value_offsets();
    let child_indices: UInt32Array = (0..list.len())
        .map(|row| {
            if list.is_null(row) || index.is_null(row) {
                return None;
            }
            let (start, end) = (offsets[row], offsets[row + 1]);
            let i = index.value(row);
            if i >= 0 && start + i < end {
                Some((start + i) as u32)
            } else {
                // Out-of-bounds indices yield null.
                None
            }
        })
        .collect();
    take_array(list.values().as_ref(), &child_indices)
}

fn array_contains(args: &[ArrayRef]) -> ExecutionResult<ArrayRef> {
    let function = ScalarFunction::ArrayContains;
    let list = argument(function, args, 0)?;
    let list = downcast_array::<ListArray>(list.as_ref(), "list")?;
    let target = argument(function, args, 1)?;
    let mut result = Vec::with_capacity(list.len());
    for row in 0..list.len() {
        if list.is_null(row) || target.is_null(row) {
            result.push(None);
            continue;
        }
        let target = ScalarValue::try_from_array(target.as_ref(), row)?;
        let element = list.value(row);
        let mut found = false;
        let mut saw_null = false;
        for i in 0..element.len() {
            let value = ScalarValue::try_from_array(element.as_ref(), i)?;
            if value.is_null() {
                saw_null = true;
            } else if value == target {
                found = true;
                break;
            }
        }
        // As in Spark: an unmatched search over a list with nulls is
        // unknown rather than false.
        result.push(match (found, saw_null) {
            (true, _) => Some(true),
            (false, true) => None,
            (false, false) => Some(false),
        });
    }
    Ok(Arc::new(BooleanArray::from(result)))
}

fn to_date_array(array: &ArrayRef) -> ExecutionResult<Date32Array> {
    let array = if array.data_type() == &DataType::Date32 {
        array.clone()
    } else {
        compute::cast(array.as_ref(), &DataType::Date32)?
    };
    Ok(downcast_array::<Date32Array>(array.as_ref(), "date")?.clone())
}

fn date_shift(args: &[ArrayRef], sign: i32) -> ExecutionResult<ArrayRef> {
    let function = if sign >= 0 {
        ScalarFunction::DateAdd
    } else {
        ScalarFunction::DateSub
    };
    let dates = to_date_array(argument(function, args, 0)?)?;
    let days = argument(function, args, 1)?;
    let days = compute::cast(days.as_ref(), &DataType::Int32)?;
    let days = downcast_array::<Int32Array>(days.as_ref(), "int")?;
    let result: Date32Array = dates
        .iter()
        .zip(days.iter())
        .map(|(date, days)| match (date, days) {
            (Some(date), Some(days)) => Some(date + sign * days),
            _ => None,
        })
        .collect();
    Ok(Arc::new(result))
}

fn datediff(args: &[ArrayRef]) -> ExecutionResult<ArrayRef> {
    let function = ScalarFunction::DateDiff;
    let end = to_date_array(argument(function, args, 0)?)?;
    let start = to_date_array(argument(function, args, 1)?)?;
    let result: Int32Array = end
        .iter()
        .zip(start.iter())
        .map(|(end, start)| match (end, start) {
            (Some(end), Some(start)) => Some(end - start),
            _ => None,
        })
        .collect();
    Ok(Arc::new(result))
}

fn date_format(args: &[ArrayRef]) -> ExecutionResult<ArrayRef> {
    let function = ScalarFunction::DateFormat;
    let dates = to_date_array(argument(function, args, 0)?)?;
    let Some(pattern) = constant_string(function, args, 1)? else {
        return Ok(arrow::array::new_null_array(&DataType::Utf8, 0));
    };
    let format = spark_format_to_chrono(&pattern)?;
    let result = dates
        .iter()
        .map(|days| {
            days.map(|days| -> ExecutionResult<String> {
                Ok(date_from_days(days)?.format(&format).to_string())
            })
            .transpose()
        })
        .collect::<ExecutionResult<Vec<Option<String>>>>()?;
    Ok(Arc::new(StringArray::from(result)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{
        Array, ArrayRef, BooleanArray, ListArray, ListBuilder, StringArray, StringBuilder,
    };
    use skiff_common::scalar::ScalarValue;
    use skiff_plan::expr::ScalarFunction;

    use super::evaluate_scalar_function;

    fn strings(values: Vec<Option<&str>>) -> ArrayRef {
        Arc::new(StringArray::from(values))
    }

    #[test]
    fn test_initcap() {
        let input = strings(vec![Some("low fat"), Some("REGULAR"), None]);
        let result =
            evaluate_scalar_function(ScalarFunction::InitCap, &[input], 3).unwrap();
        let result = result.as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(result.value(0), "Low Fat");
        assert_eq!(result.value(1), "Regular");
        assert!(result.is_null(2));
    }

    #[test]
    fn test_lower_and_upper() {
        let input = strings(vec![Some("Low Fat"), None]);
        let result =
            evaluate_scalar_function(ScalarFunction::Lower, &[input.clone()], 2).unwrap();
        let result = result.as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(result.value(0), "low fat");
        assert!(result.is_null(1));
        let result = evaluate_scalar_function(ScalarFunction::Upper, &[input], 2).unwrap();
        let result = result.as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(result.value(0), "LOW FAT");
    }

    #[test]
    fn test_array_contains_null_semantics() {
        let mut builder = ListBuilder::new(StringBuilder::new());
        builder.values().append_value("a");
        builder.values().append_value("b");
        builder.append(true);
        builder.values().append_value("a");
        builder.values().append_value("b");
        builder.append(true);
        builder.values().append_value("a");
        builder.values().append_null();
        builder.append(true);
        builder.values().append_null();
        builder.values().append_value("x");
        builder.append(true);
        builder.append(false);
        let list: ArrayRef = Arc::new(builder.finish());
        let target = strings(vec![Some("b"), Some("z"), Some("z"), Some("x"), Some("b")]);
        let result =
            evaluate_scalar_function(ScalarFunction::ArrayContains, &[list, target], 5).unwrap();
        let result = result.as_any().downcast_ref::<BooleanArray>().unwrap();
        assert!(result.value(0));
        assert!(!result.value(1));
        // No match over a list with a null element is unknown, not false.
        assert!(result.is_null(2));
        assert!(result.value(3));
        assert!(result.is_null(4));
    }

    #[test]
    fn test_regexp_replace() {
        let input = strings(vec![Some("Regular"), Some("Low Fat")]);
        let pattern = strings(vec![Some("Regular"), Some("Regular")]);
        let replacement = strings(vec![Some("Reg"), Some("Reg")]);
        let result = evaluate_scalar_function(
            ScalarFunction::RegexpReplace,
            &[input, pattern, replacement],
            2,
        )
        .unwrap();
        let result = result.as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(result.value(0), "Reg");
        assert_eq!(result.value(1), "Low Fat");
    }

    #[test]
    fn test_split_and_get_item() {
        let input = strings(vec![Some("Tier 1"), None]);
        let delimiter = strings(vec![Some(" "), Some(" ")]);
        let list =
            evaluate_scalar_function(ScalarFunction::Split, &[input, delimiter], 2).unwrap();
        {
            let list = list.as_any().downcast_ref::<ListArray>().unwrap();
            assert_eq!(list.len(), 2);
            assert!(list.is_null(1));
            assert_eq!(list.value(0).len(), 2);
        }
        let index: ArrayRef = Arc::new(arrow::array::Int32Array::from(vec![1, 1]));
        let item =
            evaluate_scalar_function(ScalarFunction::GetItem, &[list, index], 2).unwrap();
        assert_eq!(
            ScalarValue::try_from_array(item.as_ref(), 0).unwrap(),
            ScalarValue::from("1")
        );
        assert!(ScalarValue::try_from_array(item.as_ref(), 1)
            .unwrap()
            .is_null());
    }

    #[test]
    fn test_date_arithmetic() {
        use arrow::array::{Date32Array, Int32Array};
        let dates: ArrayRef = Arc::new(Date32Array::from(vec![Some(100), None]));
        let days: ArrayRef = Arc::new(Int32Array::from(vec![7, 7]));
        let result = evaluate_scalar_function(
            ScalarFunction::DateAdd,
            &[dates.clone(), days.clone()],
            2,
        )
        .unwrap();
        assert_eq!(
            ScalarValue::try_from_array(result.as_ref(), 0).unwrap(),
            ScalarValue::Date32(Some(107))
        );
        let result =
            evaluate_scalar_function(ScalarFunction::DateSub, &[dates, days], 2).unwrap();
        assert_eq!(
            ScalarValue::try_from_array(result.as_ref(), 0).unwrap(),
            ScalarValue::Date32(Some(93))
        );
    }
}
