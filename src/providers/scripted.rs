use std::sync::Mutex;

use async_trait::async_trait;

use super::{Completion, CompletionRequest, ProviderKind, TextProvider};

enum Reply {
    Text(String),
    Error(String),
    Hang,
}

/// Provider with a canned reply that records every request it receives.
pub struct ScriptedProvider {
    kind: ProviderKind,
    reply: Reply,
    pub seen: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn replying(kind: ProviderKind, text: &str) -> Self {
        Self {
            kind,
            reply: Reply::Text(text.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(kind: ProviderKind, message: &str) -> Self {
        Self {
            kind,
            reply: Reply::Error(message.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Never answers.
    pub fn hanging(kind: ProviderKind) -> Self {
        Self {
            kind,
            reply: Reply::Hang,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextProvider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn complete(&self, req: &CompletionRequest) -> anyhow::Result<Completion> {
        self.seen.lock().unwrap().push(req.clone());
        match &self.reply {
            Reply::Text(text) => Ok(Completion {
                text: text.clone(),
                model: req.model.clone().unwrap_or_else(|| format!("{}-scripted", self.kind)),
                tokens_used: Some(42),
            }),
            Reply::Error(message) => anyhow::bail!("{}", message),
            Reply::Hang => std::future::pending().await,
        }
    }
}
