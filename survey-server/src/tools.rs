use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use survey_core::{Result, SurveyError, Tool};
use survey_data::DatasetCache;

/// Reports how many survey responses are loaded.
pub struct CountTool {
    cache: Arc<DatasetCache>,
}

impl CountTool {
    pub fn new(cache: Arc<DatasetCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Tool for CountTool {
    fn name(&self) -> &str {
        "count"
    }

    fn description(&self) -> &str {
        "Get the total count of responses"
    }

    async fn execute(&self, _args: Value) -> Result<Value> {
        let dataset = self.cache.current().await.ok_or(SurveyError::NotLoaded)?;
        Ok(json!({ "count": dataset.len() }))
    }
}
