//! Outbound text-generation providers.
//!
//! Each vendor is a [`TextProvider`]; the [`ProviderRegistry`] is built once
//! from config and resolves a caller's `preferred_model` to one of them.

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ProviderConfig;

pub mod anthropic;
pub mod openai;
#[cfg(test)]
pub mod scripted;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "gpt" => Some(ProviderKind::OpenAi),
            "anthropic" | "claude" => Some(ProviderKind::Anthropic),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caller's provider preference. `kind: None` means the configured default;
/// `model: None` means the provider's configured model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelChoice {
    pub kind: Option<ProviderKind>,
    pub model: Option<String>,
}

impl ModelChoice {
    /// Accepts a provider name (`openai`, `claude`, ...), a concrete model id
    /// (`gpt-4o`, `claude-3-5-haiku-latest`), or `auto`/`default`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let lower = trimmed.to_lowercase();
        if lower.is_empty() || lower == "auto" || lower == "default" {
            return Some(Self::default());
        }
        if let Some(kind) = ProviderKind::parse(&lower) {
            return Some(Self {
                kind: Some(kind),
                model: None,
            });
        }
        let kind = if lower.starts_with("gpt-") || lower.starts_with("chatgpt-") {
            ProviderKind::OpenAi
        } else if lower.starts_with("claude-") {
            ProviderKind::Anthropic
        } else {
            return None;
        };
        Some(Self {
            kind: Some(kind),
            model: Some(trimmed.to_string()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub tokens_used: Option<u32>,
}

#[async_trait]
pub trait TextProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;
    async fn complete(&self, req: &CompletionRequest) -> anyhow::Result<Completion>;
}

/// Keep provider error bodies short enough to log and store.
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[derive(Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn TextProvider>>,
    default: ProviderKind,
}

impl ProviderRegistry {
    pub fn new(default: ProviderKind) -> Self {
        Self {
            providers: HashMap::new(),
            default,
        }
    }

    pub fn with(mut self, provider: Arc<dyn TextProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn from_config(cfg: &ProviderConfig) -> anyhow::Result<Self> {
        let default = ProviderKind::parse(&cfg.default_provider).with_context(|| {
            format!("unknown DEFAULT_PROVIDER {:?}", cfg.default_provider)
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build provider http client")?;

        let mut registry = Self::new(default);
        if let Some(key) = &cfg.openai.api_key {
            registry = registry.with(Arc::new(openai::OpenAiProvider::new(
                client.clone(),
                key,
                &cfg.openai.base_url,
                &cfg.openai.model,
            )));
        }
        if let Some(key) = &cfg.anthropic.api_key {
            registry = registry.with(Arc::new(anthropic::AnthropicProvider::new(
                client,
                key,
                &cfg.anthropic.base_url,
                &cfg.anthropic.model,
            )));
        }

        if registry.providers.is_empty() {
            warn!("no provider API keys configured; every generation will be recorded as failed");
        } else {
            info!(providers = ?registry.kinds(), default = %default, "providers configured");
        }
        Ok(registry)
    }

    pub fn default_kind(&self) -> ProviderKind {
        self.default
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.providers.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// The kind a choice resolves to, whether or not it is configured.
    pub fn target(&self, choice: &ModelChoice) -> ProviderKind {
        choice.kind.unwrap_or(self.default)
    }

    pub fn resolve(&self, choice: &ModelChoice) -> anyhow::Result<Arc<dyn TextProvider>> {
        let kind = self.target(choice);
        self.providers
            .get(&kind)
            .cloned()
            .with_context(|| format!("provider {kind} is not configured"))
    }
}
