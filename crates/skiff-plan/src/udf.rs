use std::fmt::Debug;
use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::datatypes::DataType;

use crate::error::PlanResult;
use crate::expr::Expr;

/// A user-defined scalar function evaluated over whole argument arrays.
pub trait ScalarUdf: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn return_type(&self, arg_types: &[DataType]) -> PlanResult<DataType>;

    /// All argument arrays have the same length; the result must match it.
    fn invoke(&self, args: &[ArrayRef]) -> PlanResult<ArrayRef>;
}

type UdfImpl = dyn Fn(&[ArrayRef]) -> PlanResult<ArrayRef> + Send + Sync;

/// A [`ScalarUdf`] backed by a closure and a fixed return type.
pub struct SimpleScalarUdf {
    name: String,
    return_type: DataType,
    fun: Arc<UdfImpl>,
}

impl SimpleScalarUdf {
    pub fn new(
        name: impl Into<String>,
        return_type: DataType,
        fun: impl Fn(&[ArrayRef]) -> PlanResult<ArrayRef> + Send + Sync + 'static,
    ) -> SimpleScalarUdf {
        SimpleScalarUdf {
            name: name.into(),
            return_type,
            fun: Arc::new(fun),
        }
    }
}

impl Debug for SimpleScalarUdf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleScalarUdf")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

impl ScalarUdf for SimpleScalarUdf {
    fn name(&self) -> &str {
        &self.name
    }

    fn return_type(&self, _arg_types: &[DataType]) -> PlanResult<DataType> {
        Ok(self.return_type.clone())
    }

    fn invoke(&self, args: &[ArrayRef]) -> PlanResult<ArrayRef> {
        (self.fun)(args)
    }
}

/// Builds a UDF call expression.
pub fn call_udf(function: Arc<dyn ScalarUdf>, args: Vec<Expr>) -> Expr {
    Expr::Udf { function, args }
}
