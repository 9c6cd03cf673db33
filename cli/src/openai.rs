//! Header consolidation backed by a chat-completions API.

use std::sync::Arc;
use std::time::Duration;

use ocrtable::convert::consolidation_prompt;
use ocrtable::{ConsolidationPlan, Error, HeaderConsolidator, TableRecord};
use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str = "You are a data structure analyst. Respond only with valid JSON.";
const MAX_TOKENS: usize = 1000;
const TEMPERATURE: f32 = 0.1;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Asks a chat model how to merge a table's header rows.
pub struct OpenAiConsolidator {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
    runtime: Arc<Runtime>,
}

impl OpenAiConsolidator {
    /// Create a consolidator using `model`.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        runtime: Arc<Runtime>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
            runtime,
        })
    }

    /// Use a different API endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn complete(&self, prompt: &str) -> Result<String, String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("failed to read response: {}", e))?;
        if !status.is_success() {
            return Err(format!("status {}: {}", status, body));
        }

        let chat: ChatResponse =
            serde_json::from_str(&body).map_err(|e| format!("unexpected response: {}", e))?;
        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| "no content in response".to_string())
    }
}

/// Strip a Markdown code fence some models wrap around JSON replies.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

impl HeaderConsolidator for OpenAiConsolidator {
    fn name(&self) -> &str {
        "openai"
    }

    fn analyze(&self, table: &TableRecord) -> ocrtable::Result<ConsolidationPlan> {
        let prompt = consolidation_prompt(table)?;
        let reply = self
            .runtime
            .block_on(self.complete(&prompt))
            .map_err(|e| Error::Collaborator(format!("{} ({})", e, self.model)))?;
        log::debug!("Consolidation reply for table {}: {}", table.table_id, reply);
        ConsolidationPlan::from_json(strip_code_fence(&reply))
    }
}
