use serde::{Deserialize, Serialize};

pub const ROLE_USER: &str = "user";
pub const ROLE_MODEL: &str = "model";
pub const ROLE_FUNCTION: &str = "function";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponseData {
    pub name: String,
    pub response: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    FunctionCall {
        name: String,
        args: serde_json::Value,
    },
    #[serde(rename_all = "camelCase")]
    FunctionResponse {
        function_response: FunctionResponseData,
    },
}

impl Content {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into(), parts: Vec::new() }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::Text { text: text.into() });
        self
    }

    pub fn with_function_call(mut self, name: impl Into<String>, args: serde_json::Value) -> Self {
        self.parts.push(Part::FunctionCall { name: name.into(), args });
        self
    }

    pub fn with_function_response(
        mut self,
        name: impl Into<String>,
        response: serde_json::Value,
    ) -> Self {
        self.parts.push(Part::FunctionResponse {
            function_response: FunctionResponseData { name: name.into(), response },
        });
        self
    }

    /// Concatenation of all text parts, in order.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::text).collect()
    }

    /// `(name, args)` of every function call part.
    pub fn function_calls(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.parts.iter().filter_map(|part| match part {
            Part::FunctionCall { name, args } => Some((name.as_str(), args)),
            _ => None,
        })
    }
}

impl Part {
    /// Returns the text content if this is a Text part, None otherwise
    pub fn text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn text_part(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_text_joins_text_parts_only() {
        let content = Content::new(ROLE_MODEL)
            .with_text("Most students ")
            .with_function_call("count", json!({}))
            .with_text("feel fine.");

        assert_eq!(content.text(), "Most students feel fine.");
        let calls: Vec<_> = content.function_calls().collect();
        assert_eq!(calls, vec![("count", &json!({}))]);
    }

    #[test]
    fn test_function_response_serializes_camel_case() {
        let content =
            Content::new(ROLE_FUNCTION).with_function_response("count", json!({ "count": 3 }));
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "function",
                "parts": [{ "functionResponse": { "name": "count", "response": { "count": 3 } } }]
            })
        );
    }

    #[test]
    fn test_part_deserialize_untagged() {
        let part: Part = serde_json::from_value(json!({ "text": "hi" })).unwrap();
        assert_eq!(part, Part::text_part("hi"));

        let part: Part =
            serde_json::from_value(json!({ "name": "count", "args": {} })).unwrap();
        assert!(matches!(part, Part::FunctionCall { .. }));
    }
}
