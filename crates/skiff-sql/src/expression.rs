use sqlparser::ast;

use skiff_common::scalar::ScalarValue;
use skiff_common::schema::parse_simple_type;
use skiff_execution::session::SessionContext;
use skiff_plan::aggregate::{AggExpr, AggregateFunction};
use skiff_plan::expr::{col, lit, Expr, Operator, ScalarFunction};
use skiff_plan::udf::call_udf;

use crate::error::{SqlError, SqlResult};

/// Converts SQL expressions into engine expressions, resolving function
/// names against the session's registered UDFs.
pub struct ExprConverter<'a> {
    ctx: &'a SessionContext,
}

impl<'a> ExprConverter<'a> {
    pub fn new(ctx: &'a SessionContext) -> ExprConverter<'a> {
        ExprConverter { ctx }
    }

    pub fn convert(&self, expr: &ast::Expr) -> SqlResult<Expr> {
        match expr {
            ast::Expr::Identifier(ident) => Ok(col(&ident.value)),
            // Qualifiers are dropped; views resolve columns by bare name.
            ast::Expr::CompoundIdentifier(idents) => match idents.last() {
                Some(ident) => Ok(col(&ident.value)),
                None => Err(SqlError::invalid("empty compound identifier")),
            },
            ast::Expr::Value(value) => Ok(Expr::Literal(literal(value)?)),
            ast::Expr::Nested(inner) => self.convert(inner),
            ast::Expr::BinaryOp { left, op, right } => {
                let left = self.convert(left)?;
                let right = self.convert(right)?;
                Ok(Expr::BinaryOp {
                    left: Box::new(left),
                    op: operator(op)?,
                    right: Box::new(right),
                })
            }
            ast::Expr::UnaryOp {
                op: ast::UnaryOperator::Not,
                expr,
            } => Ok(self.convert(expr)?.not()),
            ast::Expr::UnaryOp {
                op: ast::UnaryOperator::Minus,
                expr,
            } => match self.convert(expr)? {
                Expr::Literal(ScalarValue::Int64(Some(v))) => Ok(lit(-v)),
                Expr::Literal(ScalarValue::Float64(Some(v))) => Ok(lit(-v)),
                _ => Err(SqlError::unsupported("unary minus on a non-literal")),
            },
            ast::Expr::IsNull(inner) => Ok(self.convert(inner)?.is_null()),
            ast::Expr::IsNotNull(inner) => Ok(self.convert(inner)?.is_not_null()),
            ast::Expr::InList {
                expr,
                list,
                negated,
            } => {
                let target = self.convert(expr)?;
                let values = list
                    .iter()
                    .map(|item| match self.convert(item)? {
                        Expr::Literal(value) => Ok(value),
                        _ => Err(SqlError::unsupported("non-literal IN list item")),
                    })
                    .collect::<SqlResult<Vec<_>>>()?;
                let in_list = Expr::InList {
                    expr: Box::new(target),
                    list: values,
                };
                Ok(if *negated { in_list.not() } else { in_list })
            }
            ast::Expr::Cast {
                expr, data_type, ..
            } => Ok(self.convert(expr)?.cast(cast_type(data_type)?)),
            ast::Expr::Function(function) => self.function(function),
            other => Err(SqlError::unsupported(format!("expression: {other}"))),
        }
    }

    /// Recognizes an aggregate function call; returns `None` for
    /// anything else.
    pub fn aggregate(&self, expr: &ast::Expr) -> SqlResult<Option<AggExpr>> {
        let ast::Expr::Function(function) = expr else {
            return Ok(None);
        };
        let name = object_name(&function.name).to_ascii_lowercase();
        let Some(aggregate) = aggregate_function(&name) else {
            return Ok(None);
        };
        let args = function_args(&function.args)?;
        let arg = match args.as_slice() {
            // COUNT(*) counts rows.
            [CallArg::Wildcard] if aggregate == AggregateFunction::Count => lit(1),
            [CallArg::Expr(arg)] => self.convert(arg)?,
            _ => {
                return Err(SqlError::invalid(format!(
                    "{name} takes exactly one argument"
                )))
            }
        };
        Ok(Some(AggExpr::new(aggregate, arg)))
    }

    fn function(&self, function: &ast::Function) -> SqlResult<Expr> {
        let name = object_name(&function.name).to_ascii_lowercase();
        if aggregate_function(&name).is_some() {
            return Err(SqlError::invalid(format!(
                "aggregate function in a scalar context: {name}"
            )));
        }
        let args = function_args(&function.args)?
            .into_iter()
            .map(|arg| match arg {
                CallArg::Expr(expr) => self.convert(&expr),
                CallArg::Wildcard => {
                    Err(SqlError::unsupported(format!("wildcard argument to {name}")))
                }
            })
            .collect::<SqlResult<Vec<_>>>()?;
        if let Some(function) = scalar_function(&name) {
            return Ok(Expr::ScalarFunction { function, args });
        }
        match self.ctx.udf(&name)? {
            Some(udf) => Ok(call_udf(udf, args)),
            None => Err(SqlError::unsupported(format!("function: {name}"))),
        }
    }
}

enum CallArg {
    Expr(ast::Expr),
    Wildcard,
}

fn function_args(args: &ast::FunctionArguments) -> SqlResult<Vec<CallArg>> {
    match args {
        ast::FunctionArguments::None => Ok(vec![]),
        ast::FunctionArguments::List(list) => list
            .args
            .iter()
            .map(|arg| match arg {
                ast::FunctionArg::Unnamed(ast::FunctionArgExpr::Expr(expr)) => {
                    Ok(CallArg::Expr(expr.clone()))
                }
                ast::FunctionArg::Unnamed(ast::FunctionArgExpr::Wildcard) => Ok(CallArg::Wildcard),
                other => Err(SqlError::unsupported(format!("function argument: {other}"))),
            })
            .collect(),
        ast::FunctionArguments::Subquery(_) => {
            Err(SqlError::unsupported("subquery function argument"))
        }
    }
}

pub fn object_name(name: &ast::ObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.clone())
        .collect::<Vec<_>>()
        .join(".")
}

fn literal(value: &ast::Value) -> SqlResult<ScalarValue> {
    match value {
        ast::Value::Number(text, _) => {
            if text.contains(['.', 'e', 'E']) {
                let parsed: f64 = text
                    .parse()
                    .map_err(|_| SqlError::invalid(format!("number literal: {text}")))?;
                Ok(ScalarValue::Float64(Some(parsed)))
            } else {
                let parsed: i64 = text
                    .parse()
                    .map_err(|_| SqlError::invalid(format!("number literal: {text}")))?;
                Ok(ScalarValue::Int64(Some(parsed)))
            }
        }
        ast::Value::SingleQuotedString(text) | ast::Value::DoubleQuotedString(text) => {
            Ok(ScalarValue::Utf8(Some(text.clone())))
        }
        ast::Value::Boolean(value) => Ok(ScalarValue::Boolean(Some(*value))),
        ast::Value::Null => Ok(ScalarValue::Null),
        other => Err(SqlError::unsupported(format!("literal: {other}"))),
    }
}

fn operator(op: &ast::BinaryOperator) -> SqlResult<Operator> {
    match op {
        ast::BinaryOperator::Eq => Ok(Operator::Eq),
        ast::BinaryOperator::NotEq => Ok(Operator::NotEq),
        ast::BinaryOperator::Lt => Ok(Operator::Lt),
        ast::BinaryOperator::LtEq => Ok(Operator::LtEq),
        ast::BinaryOperator::Gt => Ok(Operator::Gt),
        ast::BinaryOperator::GtEq => Ok(Operator::GtEq),
        ast::BinaryOperator::And => Ok(Operator::And),
        ast::BinaryOperator::Or => Ok(Operator::Or),
        ast::BinaryOperator::Plus => Ok(Operator::Plus),
        ast::BinaryOperator::Minus => Ok(Operator::Minus),
        ast::BinaryOperator::Multiply => Ok(Operator::Multiply),
        ast::BinaryOperator::Divide => Ok(Operator::Divide),
        other => Err(SqlError::unsupported(format!("operator: {other}"))),
    }
}

fn scalar_function(name: &str) -> Option<ScalarFunction> {
    match name {
        "initcap" => Some(ScalarFunction::InitCap),
        "lower" => Some(ScalarFunction::Lower),
        "upper" => Some(ScalarFunction::Upper),
        "regexp_replace" => Some(ScalarFunction::RegexpReplace),
        "split" => Some(ScalarFunction::Split),
        "array_contains" => Some(ScalarFunction::ArrayContains),
        "current_date" => Some(ScalarFunction::CurrentDate),
        "date_add" => Some(ScalarFunction::DateAdd),
        "date_sub" => Some(ScalarFunction::DateSub),
        "datediff" | "date_diff" => Some(ScalarFunction::DateDiff),
        "date_format" => Some(ScalarFunction::DateFormat),
        _ => None,
    }
}

fn aggregate_function(name: &str) -> Option<AggregateFunction> {
    match name {
        "sum" => Some(AggregateFunction::Sum),
        "avg" | "mean" => Some(AggregateFunction::Avg),
        "min" => Some(AggregateFunction::Min),
        "max" => Some(AggregateFunction::Max),
        "count" => Some(AggregateFunction::Count),
        "collect_list" => Some(AggregateFunction::CollectList),
        _ => None,
    }
}

/// Maps a SQL type name to an engine type through its display form, so
/// that `CAST(x AS VARCHAR(10))` and `CAST(x AS STRING)` both work.
fn cast_type(data_type: &ast::DataType) -> SqlResult<arrow::datatypes::DataType> {
    let name = data_type.to_string().to_ascii_lowercase();
    if name.starts_with("varchar") || name.starts_with("char") || name == "text" {
        return Ok(arrow::datatypes::DataType::Utf8);
    }
    Ok(parse_simple_type(&name)?)
}
