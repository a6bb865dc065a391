//! JSON bodies of the `generateContent` / `streamGenerateContent` REST endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use survey_core::{
    Content, FinishReason, GenerateContentConfig, LlmRequest, LlmResponse, Part, ROLE_FUNCTION,
    ROLE_MODEL, ROLE_USER, UsageMetadata,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<WireGenerationConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<WireFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<WireFunctionResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTool {
    pub function_declarations: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<WireUsageMetadata>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<WireContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUsageMetadata {
    pub prompt_token_count: Option<i32>,
    pub candidates_token_count: Option<i32>,
    pub total_token_count: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

impl From<&Part> for WirePart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text { text } => WirePart { text: Some(text.clone()), ..Default::default() },
            Part::FunctionCall { name, args } => WirePart {
                function_call: Some(WireFunctionCall { name: name.clone(), args: args.clone() }),
                ..Default::default()
            },
            Part::FunctionResponse { function_response } => WirePart {
                function_response: Some(WireFunctionResponse {
                    name: function_response.name.clone(),
                    response: function_response.response.clone(),
                }),
                ..Default::default()
            },
        }
    }
}

impl From<&Content> for WireContent {
    fn from(content: &Content) -> Self {
        // Function results travel back on the user side of the conversation.
        let role = match content.role.as_str() {
            ROLE_MODEL => ROLE_MODEL,
            ROLE_FUNCTION | ROLE_USER => ROLE_USER,
            _ => ROLE_USER,
        };
        WireContent {
            role: Some(role.to_string()),
            parts: content.parts.iter().map(WirePart::from).collect(),
        }
    }
}

impl From<&GenerateContentConfig> for WireGenerationConfig {
    fn from(config: &GenerateContentConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

impl From<&LlmRequest> for GenerateContentRequest {
    fn from(req: &LlmRequest) -> Self {
        let system_instruction = req.system_instruction.as_ref().map(|text| WireContent {
            role: None,
            parts: vec![WirePart { text: Some(text.clone()), ..Default::default() }],
        });

        let tools = if req.tools.is_empty() {
            Vec::new()
        } else {
            vec![WireTool { function_declarations: req.tools.values().cloned().collect() }]
        };

        Self {
            contents: req.contents.iter().map(WireContent::from).collect(),
            system_instruction,
            tools,
            generation_config: req.config.as_ref().map(WireGenerationConfig::from),
        }
    }
}

fn finish_reason(raw: &str) -> FinishReason {
    match raw {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::MaxTokens,
        "SAFETY" => FinishReason::Safety,
        "RECITATION" => FinishReason::Recitation,
        _ => FinishReason::Other,
    }
}

impl GenerateContentResponse {
    /// Reason the service refused the prompt, if it did.
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref())
    }

    pub fn into_llm_response(self, streaming: bool) -> LlmResponse {
        let candidate = self.candidates.into_iter().next().unwrap_or_default();

        let content = candidate.content.map(|content| Content {
            role: ROLE_MODEL.to_string(),
            parts: content
                .parts
                .into_iter()
                .filter_map(|part| {
                    if let Some(call) = part.function_call {
                        return Some(Part::FunctionCall { name: call.name, args: call.args });
                    }
                    match (part.text, part.thought) {
                        (Some(text), None | Some(false)) => Some(Part::Text { text }),
                        _ => None,
                    }
                })
                .collect(),
        });

        let usage_metadata = self.usage_metadata.map(|u| UsageMetadata {
            prompt_token_count: u.prompt_token_count.unwrap_or(0),
            candidates_token_count: u.candidates_token_count.unwrap_or(0),
            total_token_count: u.total_token_count.unwrap_or(0),
        });

        let finish_reason = candidate.finish_reason.as_deref().map(finish_reason);
        let turn_complete = !streaming || finish_reason.is_some();

        LlmResponse {
            content,
            usage_metadata,
            finish_reason,
            partial: !turn_complete,
            turn_complete,
        }
    }
}
