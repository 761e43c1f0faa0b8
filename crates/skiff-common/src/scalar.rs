use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, BooleanBuilder, Date32Array, Date32Builder, Float64Array,
    Float64Builder, Int32Array, Int32Builder, Int64Array, Int64Builder, ListArray, ListBuilder,
    NullArray, StringArray, StringBuilder,
};
use arrow::datatypes::{DataType, Field};

use crate::datetime::date_from_days;
use crate::error::{CommonError, CommonResult};

/// An owned single value, used for literals, group keys, and
/// accumulator state.
#[derive(Debug, Clone)]
pub enum ScalarValue {
    Null,
    Boolean(Option<bool>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    Float64(Option<f64>),
    Utf8(Option<String>),
    Date32(Option<i32>),
    /// A list value along with its element type, so that empty and null
    /// lists still carry enough information to build an array.
    List(Option<Vec<ScalarValue>>, Box<DataType>),
}

impl ScalarValue {
    pub fn data_type(&self) -> DataType {
        match self {
            ScalarValue::Null => DataType::Null,
            ScalarValue::Boolean(_) => DataType::Boolean,
            ScalarValue::Int32(_) => DataType::Int32,
            ScalarValue::Int64(_) => DataType::Int64,
            ScalarValue::Float64(_) => DataType::Float64,
            ScalarValue::Utf8(_) => DataType::Utf8,
            ScalarValue::Date32(_) => DataType::Date32,
            ScalarValue::List(_, element) => {
                DataType::List(Arc::new(Field::new_list_field((**element).clone(), true)))
            }
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            ScalarValue::Null => true,
            ScalarValue::Boolean(v) => v.is_none(),
            ScalarValue::Int32(v) => v.is_none(),
            ScalarValue::Int64(v) => v.is_none(),
            ScalarValue::Float64(v) => v.is_none(),
            ScalarValue::Utf8(v) => v.is_none(),
            ScalarValue::Date32(v) => v.is_none(),
            ScalarValue::List(v, _) => v.is_none(),
        }
    }

    /// Returns the null value of the given type.
    pub fn null_of(data_type: &DataType) -> CommonResult<ScalarValue> {
        match data_type {
            DataType::Null => Ok(ScalarValue::Null),
            DataType::Boolean => Ok(ScalarValue::Boolean(None)),
            DataType::Int32 => Ok(ScalarValue::Int32(None)),
            DataType::Int64 => Ok(ScalarValue::Int64(None)),
            DataType::Float64 => Ok(ScalarValue::Float64(None)),
            DataType::Utf8 => Ok(ScalarValue::Utf8(None)),
            DataType::Date32 => Ok(ScalarValue::Date32(None)),
            DataType::List(field) => Ok(ScalarValue::List(
                None,
                Box::new(field.data_type().clone()),
            )),
            other => Err(CommonError::unsupported(format!("data type: {other}"))),
        }
    }

    /// Reads the value at `row` out of an array.
    pub fn try_from_array(array: &dyn Array, row: usize) -> CommonResult<ScalarValue> {
        if row >= array.len() {
            return Err(CommonError::internal(format!(
                "row index {row} out of bounds for array of length {}",
                array.len()
            )));
        }
        match array.data_type() {
            DataType::Null => Ok(ScalarValue::Null),
            DataType::Boolean => {
                let array = downcast::<BooleanArray>(array)?;
                Ok(ScalarValue::Boolean(value_at(array.is_null(row), || {
                    array.value(row)
                })))
            }
            DataType::Int32 => {
                let array = downcast::<Int32Array>(array)?;
                Ok(ScalarValue::Int32(value_at(array.is_null(row), || {
                    array.value(row)
                })))
            }
            DataType::Int64 => {
                let array = downcast::<Int64Array>(array)?;
                Ok(ScalarValue::Int64(value_at(array.is_null(row), || {
                    array.value(row)
                })))
            }
            DataType::Float64 => {
                let array = downcast::<Float64Array>(array)?;
                Ok(ScalarValue::Float64(value_at(array.is_null(row), || {
                    array.value(row)
                })))
            }
            DataType::Utf8 => {
                let array = downcast::<StringArray>(array)?;
                Ok(ScalarValue::Utf8(value_at(array.is_null(row), || {
                    array.value(row).to_string()
                })))
            }
            DataType::Date32 => {
                let array = downcast::<Date32Array>(array)?;
                Ok(ScalarValue::Date32(value_at(array.is_null(row), || {
                    array.value(row)
                })))
            }
            DataType::List(field) => {
                let array = downcast::<ListArray>(array)?;
                if array.is_null(row) {
                    return Ok(ScalarValue::List(
                        None,
                        Box::new(field.data_type().clone()),
                    ));
                }
                let element = array.value(row);
                let values = (0..element.len())
                    .map(|i| ScalarValue::try_from_array(element.as_ref(), i))
                    .collect::<CommonResult<Vec<_>>>()?;
                Ok(ScalarValue::List(
                    Some(values),
                    Box::new(field.data_type().clone()),
                ))
            }
            other => Err(CommonError::unsupported(format!("data type: {other}"))),
        }
    }

    /// Builds an array of length `size` filled with this value.
    pub fn to_array_of_size(&self, size: usize) -> CommonResult<ArrayRef> {
        ScalarValue::iter_to_array(vec![self.clone(); size], &self.data_type())
    }

    /// Builds an array of the given type from a sequence of values.
    /// `ScalarValue::Null` entries become nulls of the target type.
    pub fn iter_to_array(
        values: Vec<ScalarValue>,
        data_type: &DataType,
    ) -> CommonResult<ArrayRef> {
        macro_rules! primitive_array {
            ($array:ty, $variant:ident) => {{
                let values = values
                    .into_iter()
                    .map(|v| match v {
                        ScalarValue::$variant(v) => Ok(v),
                        ScalarValue::Null => Ok(None),
                        other => Err(mismatch(&other, data_type)),
                    })
                    .collect::<CommonResult<Vec<_>>>()?;
                Ok(Arc::new(<$array>::from(values)) as ArrayRef)
            }};
        }
        match data_type {
            DataType::Null => Ok(Arc::new(NullArray::new(values.len()))),
            DataType::Boolean => primitive_array!(BooleanArray, Boolean),
            DataType::Int32 => primitive_array!(Int32Array, Int32),
            DataType::Int64 => primitive_array!(Int64Array, Int64),
            DataType::Float64 => primitive_array!(Float64Array, Float64),
            DataType::Utf8 => primitive_array!(StringArray, Utf8),
            DataType::Date32 => primitive_array!(Date32Array, Date32),
            DataType::List(field) => {
                let rows = values
                    .into_iter()
                    .map(|v| match v {
                        ScalarValue::List(v, _) => Ok(v),
                        ScalarValue::Null => Ok(None),
                        other => Err(mismatch(&other, data_type)),
                    })
                    .collect::<CommonResult<Vec<_>>>()?;
                build_list_array(rows, field.data_type())
            }
            other => Err(CommonError::unsupported(format!("data type: {other}"))),
        }
    }
}

fn value_at<T>(is_null: bool, value: impl FnOnce() -> T) -> Option<T> {
    if is_null {
        None
    } else {
        Some(value())
    }
}

fn mismatch(value: &ScalarValue, data_type: &DataType) -> CommonError {
    CommonError::internal(format!(
        "value {value} does not match array type {data_type}"
    ))
}

fn build_list_array(
    rows: Vec<Option<Vec<ScalarValue>>>,
    element: &DataType,
) -> CommonResult<ArrayRef> {
    macro_rules! list_array {
        ($builder:ty, $variant:ident) => {{
            let mut builder = ListBuilder::new(<$builder>::new());
            for row in rows {
                match row {
                    None => builder.append(false),
                    Some(items) => {
                        for item in items {
                            match item {
                                ScalarValue::$variant(Some(v)) => builder.values().append_value(v),
                                ScalarValue::$variant(None) | ScalarValue::Null => {
                                    builder.values().append_null()
                                }
                                other => return Err(mismatch(&other, element)),
                            }
                        }
                        builder.append(true);
                    }
                }
            }
            Ok(Arc::new(builder.finish()) as ArrayRef)
        }};
    }
    match element {
        DataType::Boolean => list_array!(BooleanBuilder, Boolean),
        DataType::Int32 => list_array!(Int32Builder, Int32),
        DataType::Int64 => list_array!(Int64Builder, Int64),
        DataType::Float64 => list_array!(Float64Builder, Float64),
        DataType::Utf8 => list_array!(StringBuilder, Utf8),
        DataType::Date32 => list_array!(Date32Builder, Date32),
        other => Err(CommonError::unsupported(format!(
            "list element type: {other}"
        ))),
    }
}

fn downcast<T: 'static>(array: &dyn Array) -> CommonResult<&T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        CommonError::internal(format!(
            "array type mismatch: expected {}, found {}",
            std::any::type_name::<T>(),
            array.data_type()
        ))
    })
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        use ScalarValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Int32(a), Int32(b)) => a == b,
            (Int64(a), Int64(b)) => a == b,
            // Floats compare by bit pattern so that equality stays
            // consistent with hashing for group keys.
            (Float64(a), Float64(b)) => a.map(f64::to_bits) == b.map(f64::to_bits),
            (Utf8(a), Utf8(b)) => a == b,
            (Date32(a), Date32(b)) => a == b,
            (List(a, _), List(b, _)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        use ScalarValue::*;
        std::mem::discriminant(self).hash(state);
        match self {
            Null => {}
            Boolean(v) => v.hash(state),
            Int32(v) => v.hash(state),
            Int64(v) => v.hash(state),
            Float64(v) => v.map(f64::to_bits).hash(state),
            Utf8(v) => v.hash(state),
            Date32(v) => v.hash(state),
            List(v, _) => v.hash(state),
        }
    }
}

impl PartialOrd for ScalarValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScalarValue {
    /// Orders nulls first, then values; values of different types order
    /// by type rank. Used for min/max accumulators and pivot columns,
    /// where both sides share a type.
    fn cmp(&self, other: &Self) -> Ordering {
        use ScalarValue::*;
        fn rank(value: &ScalarValue) -> u8 {
            match value {
                Null => 0,
                Boolean(_) => 1,
                Int32(_) => 2,
                Int64(_) => 3,
                Float64(_) => 4,
                Utf8(_) => 5,
                Date32(_) => 6,
                List(_, _) => 7,
            }
        }
        match (self, other) {
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Int32(a), Int32(b)) => a.cmp(b),
            (Int64(a), Int64(b)) => a.cmp(b),
            (Float64(a), Float64(b)) => match (a, b) {
                (Some(a), Some(b)) => a.total_cmp(b),
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
            },
            (Utf8(a), Utf8(b)) => a.cmp(b),
            (Date32(a), Date32(b)) => a.cmp(b),
            (List(a, _), List(b, _)) => match (a, b) {
                (Some(a), Some(b)) => a.iter().cmp(b.iter()),
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
            },
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl Display for ScalarValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "null"),
            ScalarValue::Boolean(None)
            | ScalarValue::Int32(None)
            | ScalarValue::Int64(None)
            | ScalarValue::Float64(None)
            | ScalarValue::Utf8(None)
            | ScalarValue::Date32(None)
            | ScalarValue::List(None, _) => write!(f, "null"),
            ScalarValue::Boolean(Some(v)) => write!(f, "{v}"),
            ScalarValue::Int32(Some(v)) => write!(f, "{v}"),
            ScalarValue::Int64(Some(v)) => write!(f, "{v}"),
            ScalarValue::Float64(Some(v)) => {
                let mut buffer = ryu::Buffer::new();
                write!(f, "{}", buffer.format(*v))
            }
            ScalarValue::Utf8(Some(v)) => write!(f, "{v}"),
            ScalarValue::Date32(Some(v)) => match date_from_days(*v) {
                Ok(date) => write!(f, "{date}"),
                Err(_) => write!(f, "<invalid date: {v}>"),
            },
            ScalarValue::List(Some(values), _) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(Some(value))
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Int32(Some(value))
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int64(Some(value))
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float64(Some(value))
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(Some(value.to_string()))
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Utf8(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{Array, Int64Array, StringArray};
    use arrow::datatypes::DataType;

    use super::ScalarValue;

    #[test]
    fn test_array_round_trip() {
        let values = vec![
            ScalarValue::Int64(Some(1)),
            ScalarValue::Int64(None),
            ScalarValue::Int64(Some(-3)),
        ];
        let array = ScalarValue::iter_to_array(values.clone(), &DataType::Int64).unwrap();
        let array = array.as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(array.len(), 3);
        for (i, expected) in values.iter().enumerate() {
            assert_eq!(&ScalarValue::try_from_array(array, i).unwrap(), expected);
        }
    }

    #[test]
    fn test_string_scalar_to_array() {
        let value = ScalarValue::from("new");
        let array = value.to_array_of_size(4).unwrap();
        let array = array.as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(array.len(), 4);
        assert_eq!(array.value(3), "new");
    }

    #[test]
    fn test_list_array_round_trip() {
        let list = ScalarValue::List(
            Some(vec![ScalarValue::from("a"), ScalarValue::from("b")]),
            Box::new(DataType::Utf8),
        );
        let array =
            ScalarValue::iter_to_array(vec![list.clone(), ScalarValue::Null], &list.data_type())
                .unwrap();
        assert_eq!(ScalarValue::try_from_array(array.as_ref(), 0).unwrap(), list);
        assert!(ScalarValue::try_from_array(array.as_ref(), 1)
            .unwrap()
            .is_null());
    }

    #[test]
    fn test_float_keys_hash_consistently() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(ScalarValue::from(1.5));
        assert!(set.contains(&ScalarValue::from(1.5)));
        assert!(!set.contains(&ScalarValue::from(2.5)));
    }
}
