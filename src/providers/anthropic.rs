use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{truncate, Completion, CompletionRequest, ProviderKind, TextProvider};

const API_VERSION: &str = "2023-06-01";

/// Anthropic messages API client.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(client: reqwest::Client, api_key: &str, base_url: &str, model: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    fn build_request<'a>(&'a self, req: &'a CompletionRequest) -> MessagesRequest<'a> {
        MessagesRequest {
            model: req.model.as_deref().unwrap_or(self.model.as_str()),
            system: &req.system,
            messages: vec![Message {
                role: "user",
                content: &req.prompt,
            }],
            max_tokens: req.max_tokens,
            temperature: req.temperature,
        }
    }
}

fn into_completion(body: MessagesResponse, requested_model: &str) -> anyhow::Result<Completion> {
    let text = body
        .content
        .into_iter()
        .filter(|b| b.kind == "text")
        .filter_map(|b| b.text)
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    anyhow::ensure!(!text.is_empty(), "Anthropic returned an empty completion");
    Ok(Completion {
        text: text.to_string(),
        model: body.model.unwrap_or_else(|| requested_model.to_string()),
        tokens_used: body.usage.map(|u| u.input_tokens + u.output_tokens),
    })
}

#[async_trait]
impl TextProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn complete(&self, req: &CompletionRequest) -> anyhow::Result<Completion> {
        let body = self.build_request(req);
        debug!(model = body.model, max_tokens = body.max_tokens, "anthropic request");

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .context("Anthropic request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!(%status, body = %truncate(&text, 500), "anthropic error response");
            anyhow::bail!("Anthropic API error {}: {}", status, truncate(&text, 200));
        }

        let parsed: MessagesResponse = resp.json().await.context("decode Anthropic response")?;
        into_completion(parsed, body.model)
    }
}
