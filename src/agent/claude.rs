//! Anthropic messages API client with tool use.

use serde::{Deserialize, Serialize};

pub struct Client {
    api_key: String,
    http: reqwest::Client,
}

#[derive(Debug, Clone, Copy)]
pub enum Model {
    Haiku,
    #[allow(dead_code)]
    Sonnet,
}

impl Model {
    fn as_str(&self) -> &'static str {
        match self {
            Model::Haiku => "claude-haiku-4-5-20251001",
            Model::Sonnet => "claude-sonnet-4-5-20250929",
        }
    }
}

/// One content block of an API message, in either direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: "assistant".to_string(),
            content,
        }
    }

    /// Tool results go back as a user message.
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self {
            role: "user".to_string(),
            content: results,
        }
    }
}

/// Tool definition advertised to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolUse {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'static str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [Message],
    tools: &'a [ToolDefinition],
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

/// A completed model response.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
}

impl Completion {
    /// Concatenated text blocks.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for block in &self.content {
            if let ContentBlock::Text { text } = block {
                out.push_str(text);
            }
        }
        out
    }

    /// Tool invocations requested in this completion, in order.
    pub fn tool_uses(&self) -> Vec<ToolUse> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolUse {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }
}

impl Client {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            http: reqwest::Client::new(),
        }
    }

    pub async fn complete(
        &self,
        model: Model,
        system: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        max_tokens: u32,
    ) -> Result<Completion, Error> {
        let request = ApiRequest {
            model: model.as_str(),
            max_tokens,
            system,
            messages,
            tools,
        };

        let response = self
            .http
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        if api_response.content.is_empty() {
            return Err(Error::Empty);
        }

        Ok(Completion {
            content: api_response.content,
            stop_reason: api_response.stop_reason,
        })
    }
}

#[derive(Debug)]
pub enum Error {
    Http(String),
    Api(String),
    Parse(String),
    Empty,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Api(e) => write!(f, "API error: {e}"),
            Error::Parse(e) => write!(f, "Parse error: {e}"),
            Error::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_use_block_roundtrip() {
        let json = r#"{
            "type": "tool_use",
            "id": "toolu_01",
            "name": "add_expense",
            "input": {"amount": 1500.0, "description": "helado"}
        }"#;

        let block: ContentBlock = serde_json::from_str(json).unwrap();
        match &block {
            ContentBlock::ToolUse { id, name, input } => {
                assert_eq!(id, "toolu_01");
                assert_eq!(name, "add_expense");
                assert_eq!(input["amount"], 1500.0);
            }
            _ => panic!("Wrong variant"),
        }

        let serialized = serde_json::to_string(&block).unwrap();
        assert!(serialized.contains(r#""type":"tool_use""#));
    }

    #[test]
    fn test_tool_result_skips_absent_error_flag() {
        let block = ContentBlock::ToolResult {
            tool_use_id: "toolu_01".to_string(),
            content: "ok".to_string(),
            is_error: None,
        };
        let serialized = serde_json::to_string(&block).unwrap();
        assert!(!serialized.contains("is_error"));
    }

    #[test]
    fn test_completion_text_and_tool_uses() {
        let response = r#"{
            "content": [
                {"type": "text", "text": "Registrando el gasto."},
                {"type": "tool_use", "id": "toolu_01", "name": "add_expense",
                 "input": {"amount": 500.0, "description": "taxi", "category": "Varios"}}
            ],
            "stop_reason": "tool_use"
        }"#;

        let api: super::ApiResponse = serde_json::from_str(response).unwrap();
        let completion = Completion {
            content: api.content,
            stop_reason: api.stop_reason,
        };

        assert_eq!(completion.text(), "Registrando el gasto.");
        let uses = completion.tool_uses();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].name, "add_expense");
        assert_eq!(completion.stop_reason.as_deref(), Some("tool_use"));
    }

    #[test]
    fn test_message_constructors() {
        let msg = Message::user_text("hola");
        assert_eq!(msg.role, "user");

        let results = Message::tool_results(vec![ContentBlock::ToolResult {
            tool_use_id: "t1".to_string(),
            content: "done".to_string(),
            is_error: None,
        }]);
        assert_eq!(results.role, "user");
        assert_eq!(results.content.len(), 1);
    }
}
