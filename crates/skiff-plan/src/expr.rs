use std::fmt::{Display, Formatter};
use std::sync::Arc;

use arrow::datatypes::DataType;
use skiff_common::scalar::ScalarValue;

use crate::udf::ScalarUdf;

/// An expression evaluated against the rows of a dataframe.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A column reference by name.
    Column(String),
    Literal(ScalarValue),
    Alias {
        expr: Box<Expr>,
        name: String,
    },
    BinaryOp {
        left: Box<Expr>,
        op: Operator,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
    InList {
        expr: Box<Expr>,
        list: Vec<ScalarValue>,
    },
    Cast {
        expr: Box<Expr>,
        data_type: DataType,
    },
    /// `CASE WHEN ... THEN ... [ELSE ...] END`; rows matching no branch
    /// evaluate to null when there is no `ELSE`.
    Case {
        branches: Vec<(Expr, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
    ScalarFunction {
        function: ScalarFunction,
        args: Vec<Expr>,
    },
    Udf {
        function: Arc<dyn ScalarUdf>,
        args: Vec<Expr>,
    },
    /// A generator expression producing one output row per list element.
    /// Only valid at the top level of a projection.
    Explode(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
        };
        write!(f, "{symbol}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarFunction {
    InitCap,
    Lower,
    Upper,
    RegexpReplace,
    Split,
    GetItem,
    ArrayContains,
    CurrentDate,
    DateAdd,
    DateSub,
    DateDiff,
    DateFormat,
}

impl ScalarFunction {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarFunction::InitCap => "initcap",
            ScalarFunction::Lower => "lower",
            ScalarFunction::Upper => "upper",
            ScalarFunction::RegexpReplace => "regexp_replace",
            ScalarFunction::Split => "split",
            ScalarFunction::GetItem => "get_item",
            ScalarFunction::ArrayContains => "array_contains",
            ScalarFunction::CurrentDate => "current_date",
            ScalarFunction::DateAdd => "date_add",
            ScalarFunction::DateSub => "date_sub",
            ScalarFunction::DateDiff => "datediff",
            ScalarFunction::DateFormat => "date_format",
        }
    }
}

/// A sort key with its direction and null placement.
#[derive(Debug, Clone)]
pub struct SortExpr {
    pub expr: Expr,
    pub ascending: bool,
    pub nulls_first: bool,
}

impl Expr {
    fn binary_op(self, op: Operator, other: Expr) -> Expr {
        Expr::BinaryOp {
            left: Box::new(self),
            op,
            right: Box::new(other),
        }
    }

    pub fn eq(self, other: Expr) -> Expr {
        self.binary_op(Operator::Eq, other)
    }

    pub fn not_eq(self, other: Expr) -> Expr {
        self.binary_op(Operator::NotEq, other)
    }

    pub fn lt(self, other: Expr) -> Expr {
        self.binary_op(Operator::Lt, other)
    }

    pub fn lt_eq(self, other: Expr) -> Expr {
        self.binary_op(Operator::LtEq, other)
    }

    pub fn gt(self, other: Expr) -> Expr {
        self.binary_op(Operator::Gt, other)
    }

    pub fn gt_eq(self, other: Expr) -> Expr {
        self.binary_op(Operator::GtEq, other)
    }

    pub fn and(self, other: Expr) -> Expr {
        self.binary_op(Operator::And, other)
    }

    pub fn or(self, other: Expr) -> Expr {
        self.binary_op(Operator::Or, other)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull(Box::new(self))
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNotNull(Box::new(self))
    }

    pub fn isin<I, T>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = T>,
        T: Into<ScalarValue>,
    {
        Expr::InList {
            expr: Box::new(self),
            list: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn alias(self, name: impl Into<String>) -> Expr {
        Expr::Alias {
            expr: Box::new(self),
            name: name.into(),
        }
    }

    pub fn cast(self, data_type: DataType) -> Expr {
        Expr::Cast {
            expr: Box::new(self),
            data_type,
        }
    }

    /// Extracts the element at `index` from a list column; out-of-bounds
    /// indices yield null.
    pub fn get_item(self, index: i32) -> Expr {
        Expr::ScalarFunction {
            function: ScalarFunction::GetItem,
            args: vec![self, lit(index)],
        }
    }

    pub fn asc(self) -> SortExpr {
        SortExpr {
            expr: self,
            ascending: true,
            nulls_first: true,
        }
    }

    pub fn desc(self) -> SortExpr {
        SortExpr {
            expr: self,
            ascending: false,
            nulls_first: false,
        }
    }

    /// The output column name this expression gets when it is not
    /// explicitly aliased.
    pub fn display_name(&self) -> String {
        match self {
            Expr::Column(name) => name.clone(),
            Expr::Literal(value) => value.to_string(),
            Expr::Alias { name, .. } => name.clone(),
            Expr::BinaryOp { left, op, right } => {
                format!("({} {op} {})", left.display_name(), right.display_name())
            }
            Expr::Not(expr) => format!("(NOT {})", expr.display_name()),
            Expr::IsNull(expr) => format!("({} IS NULL)", expr.display_name()),
            Expr::IsNotNull(expr) => format!("({} IS NOT NULL)", expr.display_name()),
            Expr::InList { expr, list } => {
                let items = list
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({} IN ({items}))", expr.display_name())
            }
            Expr::Cast { expr, data_type } => {
                format!("CAST({} AS {data_type})", expr.display_name())
            }
            Expr::Case { .. } => "CASE".to_string(),
            Expr::ScalarFunction { function, args } => {
                let args = args
                    .iter()
                    .map(|a| a.display_name())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({args})", function.name())
            }
            Expr::Udf { function, args } => {
                let args = args
                    .iter()
                    .map(|a| a.display_name())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({args})", function.name())
            }
            Expr::Explode(expr) => format!("explode({})", expr.display_name()),
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        self.binary_op(Operator::Plus, rhs)
    }
}

impl std::ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        self.binary_op(Operator::Minus, rhs)
    }
}

impl std::ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        self.binary_op(Operator::Multiply, rhs)
    }
}

impl std::ops::Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        self.binary_op(Operator::Divide, rhs)
    }
}

/// References a column by name.
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

/// Wraps a value in a literal expression.
pub fn lit(value: impl Into<ScalarValue>) -> Expr {
    Expr::Literal(value.into())
}

/// Starts a `CASE WHEN` expression: `when(cond, value).otherwise(fallback)`.
pub fn when(condition: Expr, value: Expr) -> CaseBuilder {
    CaseBuilder {
        branches: vec![(condition, value)],
    }
}

pub struct CaseBuilder {
    branches: Vec<(Expr, Expr)>,
}

impl CaseBuilder {
    pub fn when(mut self, condition: Expr, value: Expr) -> CaseBuilder {
        self.branches.push((condition, value));
        self
    }

    pub fn otherwise(self, value: Expr) -> Expr {
        Expr::Case {
            branches: self.branches,
            otherwise: Some(Box::new(value)),
        }
    }

    /// Finishes the expression without an `ELSE` branch; unmatched rows
    /// evaluate to null.
    pub fn end(self) -> Expr {
        Expr::Case {
            branches: self.branches,
            otherwise: None,
        }
    }
}

fn scalar_function(function: ScalarFunction, args: Vec<Expr>) -> Expr {
    Expr::ScalarFunction { function, args }
}

pub fn initcap(expr: Expr) -> Expr {
    scalar_function(ScalarFunction::InitCap, vec![expr])
}

pub fn lower(expr: Expr) -> Expr {
    scalar_function(ScalarFunction::Lower, vec![expr])
}

pub fn upper(expr: Expr) -> Expr {
    scalar_function(ScalarFunction::Upper, vec![expr])
}

pub fn regexp_replace(expr: Expr, pattern: &str, replacement: &str) -> Expr {
    scalar_function(
        ScalarFunction::RegexpReplace,
        vec![expr, lit(pattern), lit(replacement)],
    )
}

/// Splits a string column on a delimiter, producing a list of strings.
pub fn split(expr: Expr, delimiter: &str) -> Expr {
    scalar_function(ScalarFunction::Split, vec![expr, lit(delimiter)])
}

pub fn array_contains(expr: Expr, value: impl Into<ScalarValue>) -> Expr {
    scalar_function(
        ScalarFunction::ArrayContains,
        vec![expr, Expr::Literal(value.into())],
    )
}

pub fn current_date() -> Expr {
    scalar_function(ScalarFunction::CurrentDate, vec![])
}

pub fn date_add(expr: Expr, days: i32) -> Expr {
    scalar_function(ScalarFunction::DateAdd, vec![expr, lit(days)])
}

pub fn date_sub(expr: Expr, days: i32) -> Expr {
    scalar_function(ScalarFunction::DateSub, vec![expr, lit(days)])
}

/// The number of days from `start` to `end`.
pub fn datediff(end: Expr, start: Expr) -> Expr {
    scalar_function(ScalarFunction::DateDiff, vec![end, start])
}

/// Formats a date column with a Spark datetime pattern such as `dd-MM-yyyy`.
pub fn date_format(expr: Expr, pattern: &str) -> Expr {
    scalar_function(ScalarFunction::DateFormat, vec![expr, lit(pattern)])
}

/// Expands a list column into one row per element. Rows with null or
/// empty lists are dropped.
pub fn explode(expr: Expr) -> Expr {
    Expr::Explode(Box::new(expr))
}

#[cfg(test)]
mod tests {
    use super::{col, lit, when};

    #[test]
    fn test_display_name() {
        let expr = col("Item_Weight") * col("Item_MRP");
        assert_eq!(expr.display_name(), "(Item_Weight * Item_MRP)");
        let expr = col("Outlet_Size").is_null().alias("missing");
        assert_eq!(expr.display_name(), "missing");
    }

    #[test]
    fn test_case_builder() {
        let expr = when(col("a").gt(lit(1)), lit("big")).otherwise(lit("small"));
        match expr {
            super::Expr::Case {
                branches,
                otherwise,
            } => {
                assert_eq!(branches.len(), 1);
                assert!(otherwise.is_some());
            }
            other => panic!("unexpected expression: {other:?}"),
        }
    }
}
