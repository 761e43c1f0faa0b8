use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use skiff_common::config::AppConfig;
use skiff_plan::udf::ScalarUdf;

use crate::dataframe::DataFrame;
use crate::error::{ExecutionError, ExecutionResult};

/// Holds temporary views and registered UDFs for one session.
#[derive(Debug, Default)]
pub struct SessionContext {
    config: AppConfig,
    state: RwLock<SessionState>,
}

#[derive(Debug, Default)]
struct SessionState {
    views: HashMap<String, DataFrame>,
    udfs: HashMap<String, Arc<dyn ScalarUdf>>,
}

impl SessionContext {
    pub fn new() -> SessionContext {
        SessionContext::default()
    }

    pub fn with_config(config: AppConfig) -> SessionContext {
        SessionContext {
            config,
            state: RwLock::new(SessionState::default()),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn register_temp_view(
        &self,
        name: &str,
        dataframe: DataFrame,
        replace: bool,
    ) -> ExecutionResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| ExecutionError::internal(format!("{e}")))?;
        if state.views.contains_key(name) && !replace {
            return Err(ExecutionError::invalid(format!(
                "view already exists: {name}"
            )));
        }
        log::debug!("registering temporary view: {name}");
        state.views.insert(name.to_string(), dataframe);
        Ok(())
    }

    pub fn drop_temp_view(&self, name: &str, if_exists: bool) -> ExecutionResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| ExecutionError::internal(format!("{e}")))?;
        if state.views.remove(name).is_none() && !if_exists {
            return Err(ExecutionError::invalid(format!("view not found: {name}")));
        }
        Ok(())
    }

    pub fn table(&self, name: &str) -> ExecutionResult<DataFrame> {
        let state = self
            .state
            .read()
            .map_err(|e| ExecutionError::internal(format!("{e}")))?;
        state
            .views
            .get(name)
            .cloned()
            .ok_or_else(|| ExecutionError::invalid(format!("table or view not found: {name}")))
    }

    pub fn register_udf(&self, udf: Arc<dyn ScalarUdf>) -> ExecutionResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| ExecutionError::internal(format!("{e}")))?;
        state.udfs.insert(udf.name().to_string(), udf);
        Ok(())
    }

    pub fn udf(&self, name: &str) -> ExecutionResult<Option<Arc<dyn ScalarUdf>>> {
        let state = self
            .state
            .read()
            .map_err(|e| ExecutionError::internal(format!("{e}")))?;
        Ok(state.udfs.get(name).map(Arc::clone))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::datatypes::{DataType, Field, Schema};

    use super::SessionContext;
    use crate::dataframe::DataFrame;

    fn empty_frame() -> DataFrame {
        let schema = Arc::new(Schema::new(vec![Field::new("a", DataType::Int64, true)]));
        DataFrame::empty(schema)
    }

    #[test]
    fn test_temp_view_lifecycle() {
        let ctx = SessionContext::new();
        ctx.register_temp_view("sales", empty_frame(), false).unwrap();
        assert!(ctx.register_temp_view("sales", empty_frame(), false).is_err());
        ctx.register_temp_view("sales", empty_frame(), true).unwrap();
        assert!(ctx.table("sales").is_ok());
        ctx.drop_temp_view("sales", false).unwrap();
        assert!(ctx.table("sales").is_err());
        assert!(ctx.drop_temp_view("sales", false).is_err());
        ctx.drop_temp_view("sales", true).unwrap();
    }
}
