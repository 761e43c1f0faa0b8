use crate::expr::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Sum,
    Avg,
    Min,
    Max,
    Count,
    CollectList,
}

impl AggregateFunction {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Count => "count",
            AggregateFunction::CollectList => "collect_list",
        }
    }
}

/// An aggregate applied to an expression, optionally renamed.
#[derive(Debug, Clone)]
pub struct AggExpr {
    pub function: AggregateFunction,
    pub expr: Expr,
    pub alias: Option<String>,
}

impl AggExpr {
    pub fn new(function: AggregateFunction, expr: Expr) -> AggExpr {
        AggExpr {
            function,
            expr,
            alias: None,
        }
    }

    pub fn alias(mut self, name: impl Into<String>) -> AggExpr {
        self.alias = Some(name.into());
        self
    }

    pub fn output_name(&self) -> String {
        match &self.alias {
            Some(name) => name.clone(),
            None => format!("{}({})", self.function.name(), self.expr.display_name()),
        }
    }
}

pub fn sum(expr: Expr) -> AggExpr {
    AggExpr::new(AggregateFunction::Sum, expr)
}

pub fn avg(expr: Expr) -> AggExpr {
    AggExpr::new(AggregateFunction::Avg, expr)
}

pub fn min(expr: Expr) -> AggExpr {
    AggExpr::new(AggregateFunction::Min, expr)
}

pub fn max(expr: Expr) -> AggExpr {
    AggExpr::new(AggregateFunction::Max, expr)
}

/// Counts non-null values of the expression.
pub fn count(expr: Expr) -> AggExpr {
    AggExpr::new(AggregateFunction::Count, expr)
}

pub fn collect_list(expr: Expr) -> AggExpr {
    AggExpr::new(AggregateFunction::CollectList, expr)
}
