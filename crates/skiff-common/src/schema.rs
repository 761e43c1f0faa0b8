use arrow::datatypes::{DataType, Field, Schema};

use crate::error::{CommonError, CommonResult};

/// Parses a Spark-style DDL schema string such as
/// `"Item_Identifier STRING, Item_Weight DOUBLE, Outlet_Establishment_Year INT"`.
/// All fields are nullable.
pub fn parse_ddl_schema(ddl: &str) -> CommonResult<Schema> {
    let fields = ddl
        .split(',')
        .map(|part| {
            let mut tokens = part.split_whitespace();
            let name = tokens
                .next()
                .ok_or_else(|| CommonError::invalid(format!("empty field in DDL schema: {ddl}")))?;
            let type_name = tokens
                .next()
                .ok_or_else(|| CommonError::invalid(format!("missing type for field: {name}")))?;
            if let Some(extra) = tokens.next() {
                return Err(CommonError::invalid(format!(
                    "unexpected token {extra:?} after field: {name}"
                )));
            }
            Ok(Field::new(name, parse_simple_type(type_name)?, true))
        })
        .collect::<CommonResult<Vec<_>>>()?;
    Ok(Schema::new(fields))
}

/// Parses a Spark simple type name. `FLOAT` is widened to `Float64`
/// since the engine computes in 64-bit floats.
pub fn parse_simple_type(name: &str) -> CommonResult<DataType> {
    match name.to_ascii_lowercase().as_str() {
        "string" => Ok(DataType::Utf8),
        "int" | "integer" => Ok(DataType::Int32),
        "bigint" | "long" => Ok(DataType::Int64),
        "double" | "float" => Ok(DataType::Float64),
        "boolean" => Ok(DataType::Boolean),
        "date" => Ok(DataType::Date32),
        "void" => Ok(DataType::Null),
        other => Err(CommonError::unsupported(format!("data type name: {other}"))),
    }
}

/// Returns a human-readable simple string for the data type.
pub fn data_type_to_simple_string(data_type: &DataType) -> CommonResult<String> {
    match data_type {
        DataType::Null => Ok("void".to_string()),
        DataType::Boolean => Ok("boolean".to_string()),
        DataType::Int32 => Ok("int".to_string()),
        DataType::Int64 => Ok("bigint".to_string()),
        DataType::Float64 => Ok("double".to_string()),
        DataType::Utf8 => Ok("string".to_string()),
        DataType::Date32 => Ok("date".to_string()),
        DataType::List(field) => Ok(format!(
            "array<{}>",
            data_type_to_simple_string(field.data_type())?
        )),
        other => Err(CommonError::unsupported(format!("data type: {other}"))),
    }
}

/// Renders a schema in the tree format familiar from `printSchema`:
///
/// ```text
/// root
///  |-- Item_Identifier: string (nullable = true)
/// ```
pub fn format_schema_tree(schema: &Schema) -> CommonResult<String> {
    let mut out = String::from("root\n");
    for field in schema.fields() {
        out.push_str(&format!(
            " |-- {}: {} (nullable = {})\n",
            field.name(),
            data_type_to_simple_string(field.data_type())?,
            field.is_nullable()
        ));
    }
    Ok(out)
}
