use sqlparser::ast;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use skiff_common::scalar::ScalarValue;
use skiff_execution::dataframe::DataFrame;
use skiff_execution::session::SessionContext;
use skiff_plan::aggregate::AggExpr;
use skiff_plan::expr::{col, Expr, SortExpr};
use skiff_plan::join::JoinType;

use crate::error::{SqlError, SqlResult};
use crate::expression::{object_name, ExprConverter};

/// Parses and executes a single SQL query against the session's
/// temporary views.
pub fn sql(ctx: &SessionContext, query: &str) -> SqlResult<DataFrame> {
    log::debug!("planning SQL query: {query}");
    let statements = Parser::parse_sql(&GenericDialect {}, query)?;
    let statement = match statements.as_slice() {
        [statement] => statement,
        _ => return Err(SqlError::invalid("expected exactly one statement")),
    };
    match statement {
        ast::Statement::Query(query) => plan_query(ctx, query),
        other => Err(SqlError::unsupported(format!("statement: {other}"))),
    }
}

fn plan_query(ctx: &SessionContext, query: &ast::Query) -> SqlResult<DataFrame> {
    let ast::Query {
        with,
        body,
        order_by,
        limit,
        limit_by,
        offset,
        fetch,
        ..
    } = query;
    if with.is_some() {
        return Err(SqlError::unsupported("WITH clause"));
    }
    if !limit_by.is_empty() || offset.is_some() || fetch.is_some() {
        return Err(SqlError::unsupported("LIMIT BY, OFFSET and FETCH"));
    }
    let select = match body.as_ref() {
        ast::SetExpr::Select(select) => select,
        other => return Err(SqlError::unsupported(format!("query body: {other}"))),
    };
    let converter = ExprConverter::new(ctx);
    let mut df = plan_select(ctx, &converter, select)?;
    if let Some(order_by) = order_by {
        if order_by.interpolate.is_some() {
            return Err(SqlError::unsupported("ORDER BY INTERPOLATE"));
        }
        let sorts = order_by
            .exprs
            .iter()
            .map(|expr| sort_expr(&converter, expr))
            .collect::<SqlResult<Vec<_>>>()?;
        df = df.sort(sorts)?;
    }
    if let Some(limit) = limit {
        df = df.limit(limit_value(&converter, limit)?)?;
    }
    Ok(df)
}

fn plan_select(
    ctx: &SessionContext,
    converter: &ExprConverter,
    select: &ast::Select,
) -> SqlResult<DataFrame> {
    let ast::Select {
        distinct,
        top,
        projection,
        from,
        selection,
        group_by,
        having,
        ..
    } = select;
    if top.is_some() {
        return Err(SqlError::unsupported("TOP"));
    }
    if having.is_some() {
        return Err(SqlError::unsupported("HAVING"));
    }

    let mut df = plan_from(ctx, from)?;
    if let Some(filter) = selection {
        df = df.filter(converter.convert(filter)?)?;
    }

    let group_exprs = match group_by {
        ast::GroupByExpr::Expressions(exprs, modifiers) => {
            if !modifiers.is_empty() {
                return Err(SqlError::unsupported("GROUP BY modifiers"));
            }
            exprs
                .iter()
                .map(|expr| converter.convert(expr))
                .collect::<SqlResult<Vec<_>>>()?
        }
        ast::GroupByExpr::All(_) => return Err(SqlError::unsupported("GROUP BY ALL")),
    };

    let mut has_aggregate = false;
    for item in projection {
        if let ast::SelectItem::UnnamedExpr(expr) | ast::SelectItem::ExprWithAlias { expr, .. } =
            item
        {
            has_aggregate |= converter.aggregate(expr)?.is_some();
        }
    }

    let mut df = if !group_exprs.is_empty() || has_aggregate {
        plan_aggregation(converter, df, group_exprs, projection)?
    } else {
        plan_projection(converter, df, projection)?
    };

    match distinct {
        None => {}
        Some(ast::Distinct::Distinct) => df = df.distinct()?,
        Some(other) => return Err(SqlError::unsupported(format!("DISTINCT form: {other}"))),
    }
    Ok(df)
}

fn plan_projection(
    converter: &ExprConverter,
    df: DataFrame,
    projection: &[ast::SelectItem],
) -> SqlResult<DataFrame> {
    let mut exprs = Vec::with_capacity(projection.len());
    for item in projection {
        match item {
            ast::SelectItem::Wildcard(_) => {
                exprs.extend(df.schema().fields().iter().map(|field| col(field.name())));
            }
            ast::SelectItem::UnnamedExpr(expr) => exprs.push(converter.convert(expr)?),
            ast::SelectItem::ExprWithAlias { expr, alias } => {
                exprs.push(converter.convert(expr)?.alias(&alias.value));
            }
            other => return Err(SqlError::unsupported(format!("projection item: {other}"))),
        }
    }
    Ok(df.select(exprs)?)
}

/// Plans `GROUP BY` queries and global aggregations. Aggregate calls in
/// the projection become aggregate expressions; everything else must be
/// a grouping expression and is re-selected from the grouped output.
fn plan_aggregation(
    converter: &ExprConverter,
    df: DataFrame,
    group_exprs: Vec<Expr>,
    projection: &[ast::SelectItem],
) -> SqlResult<DataFrame> {
    let mut output: Vec<Expr> = Vec::with_capacity(projection.len());
    let mut aggregates: Vec<AggExpr> = Vec::new();
    for item in projection {
        let (expr, alias) = match item {
            ast::SelectItem::UnnamedExpr(expr) => (expr, None),
            ast::SelectItem::ExprWithAlias { expr, alias } => (expr, Some(alias.value.clone())),
            other => {
                return Err(SqlError::unsupported(format!(
                    "projection item in an aggregation: {other}"
                )))
            }
        };
        if let Some(aggregate) = converter.aggregate(expr)? {
            let aggregate = match alias {
                Some(alias) => aggregate.alias(alias),
                None => aggregate,
            };
            output.push(col(aggregate.output_name()));
            aggregates.push(aggregate);
        } else {
            // Group keys come out of the aggregation under their
            // display name.
            let name = converter.convert(expr)?.display_name();
            output.push(match alias {
                Some(alias) => col(name).alias(alias),
                None => col(name),
            });
        }
    }
    let df = df.group_by(group_exprs).agg(aggregates)?;
    Ok(df.select(output)?)
}

fn plan_from(ctx: &SessionContext, from: &[ast::TableWithJoins]) -> SqlResult<DataFrame> {
    let table = match from {
        [table] => table,
        [] => return Err(SqlError::missing("FROM clause")),
        _ => return Err(SqlError::unsupported("multiple FROM tables")),
    };
    let mut df = table_factor(ctx, &table.relation)?;
    for join in &table.joins {
        let right = table_factor(ctx, &join.relation)?;
        let (join_type, constraint) = match &join.join_operator {
            ast::JoinOperator::Inner(constraint) => (JoinType::Inner, constraint),
            ast::JoinOperator::LeftOuter(constraint) => (JoinType::Left, constraint),
            ast::JoinOperator::RightOuter(constraint) => (JoinType::Right, constraint),
            ast::JoinOperator::LeftAnti(constraint) => (JoinType::Anti, constraint),
            other => {
                return Err(SqlError::unsupported(format!("join operator: {other:?}")))
            }
        };
        let on = join_keys(constraint, &df, &right)?;
        let on: Vec<(&str, &str)> = on
            .iter()
            .map(|(l, r)| (l.as_str(), r.as_str()))
            .collect();
        df = df.join(&right, &on, join_type)?;
    }
    Ok(df)
}

fn table_factor(ctx: &SessionContext, relation: &ast::TableFactor) -> SqlResult<DataFrame> {
    match relation {
        ast::TableFactor::Table { name, .. } => Ok(ctx.table(&object_name(name))?),
        other => Err(SqlError::unsupported(format!("table factor: {other}"))),
    }
}

/// Extracts equality column pairs from an `ON` condition, assigning each
/// side of the equality to the input that actually has the column.
fn join_keys(
    constraint: &ast::JoinConstraint,
    left: &DataFrame,
    right: &DataFrame,
) -> SqlResult<Vec<(String, String)>> {
    let ast::JoinConstraint::On(condition) = constraint else {
        return Err(SqlError::unsupported("join constraint without ON"));
    };
    let mut pairs = Vec::new();
    collect_equi_pairs(condition, left, right, &mut pairs)?;
    Ok(pairs)
}

fn collect_equi_pairs(
    condition: &ast::Expr,
    left: &DataFrame,
    right: &DataFrame,
    pairs: &mut Vec<(String, String)>,
) -> SqlResult<()> {
    match condition {
        ast::Expr::Nested(inner) => collect_equi_pairs(inner, left, right, pairs),
        ast::Expr::BinaryOp {
            left: a,
            op: ast::BinaryOperator::And,
            right: b,
        } => {
            collect_equi_pairs(a, left, right, pairs)?;
            collect_equi_pairs(b, left, right, pairs)
        }
        ast::Expr::BinaryOp {
            left: a,
            op: ast::BinaryOperator::Eq,
            right: b,
        } => {
            let a = column_name(a)?;
            let b = column_name(b)?;
            let left_has = |name: &str| left.schema().column_with_name(name).is_some();
            let right_has = |name: &str| right.schema().column_with_name(name).is_some();
            if left_has(&a) && right_has(&b) {
                pairs.push((a, b));
            } else if left_has(&b) && right_has(&a) {
                pairs.push((b, a));
            } else {
                return Err(SqlError::invalid(format!(
                    "join keys not found on both sides: {a}, {b}"
                )));
            }
            Ok(())
        }
        other => Err(SqlError::unsupported(format!("join condition: {other}"))),
    }
}

fn column_name(expr: &ast::Expr) -> SqlResult<String> {
    match expr {
        ast::Expr::Identifier(ident) => Ok(ident.value.clone()),
        ast::Expr::CompoundIdentifier(idents) => match idents.last() {
            Some(ident) => Ok(ident.value.clone()),
            None => Err(SqlError::invalid("empty compound identifier")),
        },
        other => Err(SqlError::unsupported(format!(
            "join key expression: {other}"
        ))),
    }
}

fn sort_expr(converter: &ExprConverter, order: &ast::OrderByExpr) -> SqlResult<SortExpr> {
    let expr = converter.convert(&order.expr)?;
    let mut sort = if order.asc.unwrap_or(true) {
        expr.asc()
    } else {
        expr.desc()
    };
    if let Some(nulls_first) = order.nulls_first {
        sort.nulls_first = nulls_first;
    }
    Ok(sort)
}

fn limit_value(converter: &ExprConverter, limit: &ast::Expr) -> SqlResult<usize> {
    match converter.convert(limit)? {
        Expr::Literal(ScalarValue::Int64(Some(n))) if n >= 0 => Ok(n as usize),
        _ => Err(SqlError::invalid("LIMIT must be a non-negative integer")),
    }
}
