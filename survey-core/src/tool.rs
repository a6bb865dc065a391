use crate::Result;
use async_trait::async_trait;
use serde_json::{Value, json};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// JSON schema of the arguments. `None` declares a tool without parameters.
    fn parameters_schema(&self) -> Option<Value> {
        None
    }

    /// Function declaration sent to the text-generation service.
    fn declaration(&self) -> Value {
        let mut decl = json!({
            "name": self.name(),
            "description": self.description(),
        });
        if let Some(schema) = self.parameters_schema() {
            decl["parameters"] = schema;
        }
        decl
    }

    async fn execute(&self, args: Value) -> Result<Value>;
}
