use crate::expr::{Expr, SortExpr};

/// The rows a windowed aggregate is computed over, relative to the
/// current row of its partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowFrame {
    /// Partition start through the current row.
    Running,
    /// Every row of the partition, whatever the ordering.
    Entire,
}

/// The partitioning and ordering a window function is computed over.
/// Without an explicit frame, an ordered spec uses a [`Running`] frame
/// and an unordered one covers the [`Entire`] partition, matching
/// Spark's defaults.
///
/// [`Running`]: WindowFrame::Running
/// [`Entire`]: WindowFrame::Entire
#[derive(Debug, Clone, Default)]
pub struct WindowSpec {
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<SortExpr>,
    pub frame: Option<WindowFrame>,
}

impl WindowSpec {
    pub fn new() -> WindowSpec {
        WindowSpec::default()
    }

    pub fn partition_by(mut self, exprs: Vec<Expr>) -> WindowSpec {
        self.partition_by = exprs;
        self
    }

    pub fn order_by(mut self, exprs: Vec<SortExpr>) -> WindowSpec {
        self.order_by = exprs;
        self
    }

    pub fn frame(mut self, frame: WindowFrame) -> WindowSpec {
        self.frame = Some(frame);
        self
    }
}

#[derive(Debug, Clone)]
pub enum WindowFunction {
    RowNumber,
    /// Rank with gaps after ties.
    Rank,
    /// Rank without gaps.
    DenseRank,
    /// Sum over the spec's frame; see [`WindowSpec`] for the frame
    /// chosen when none is set explicitly.
    Sum(Expr),
}

impl WindowFunction {
    pub fn name(&self) -> &'static str {
        match self {
            WindowFunction::RowNumber => "row_number",
            WindowFunction::Rank => "rank",
            WindowFunction::DenseRank => "dense_rank",
            WindowFunction::Sum(_) => "sum",
        }
    }
}
