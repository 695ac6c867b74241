use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::{
    auth::{
        jwt::JwtKeys,
        repo::{PgUserRepo, UserRepo},
    },
    config::AppConfig,
    content::repo::{ContentRepo, PgContentRepo},
    providers::ProviderRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub users: Arc<dyn UserRepo>,
    pub contents: Arc<dyn ContentRepo>,
    pub providers: Arc<ProviderRegistry>,
}

impl AppState {
    /// Connects to Postgres and builds the provider clients. The pool is
    /// returned alongside so the caller can run migrations.
    pub async fn init() -> anyhow::Result<(Self, PgPool)> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        info!(max_connections = config.database_max_connections, "database pool ready");

        let providers = Arc::new(ProviderRegistry::from_config(&config.providers)?);
        let state = Self::from_parts(
            config,
            Arc::new(PgUserRepo::new(db.clone())),
            Arc::new(PgContentRepo::new(db.clone())),
            providers,
        );
        Ok((state, db))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepo>,
        contents: Arc<dyn ContentRepo>,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            jwt: JwtKeys::from_config(&config.jwt),
            config,
            users,
            contents,
            providers,
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[cfg(test)]
impl AppState {
    /// In-memory stores, a scripted OpenAI provider that answers and a
    /// scripted Anthropic provider that always fails.
    pub fn fake() -> Self {
        use crate::providers::{scripted::ScriptedProvider, ProviderKind};

        let registry = ProviderRegistry::new(ProviderKind::OpenAi)
            .with(Arc::new(ScriptedProvider::replying(
                ProviderKind::OpenAi,
                "Rust makes systems programming approachable. Ownership rules \
                 catch whole classes of bugs before the code ever runs.",
            )))
            .with(Arc::new(ScriptedProvider::failing(
                ProviderKind::Anthropic,
                "Anthropic API error 529 Overloaded",
            )));
        Self::fake_with(registry)
    }

    pub fn fake_with(providers: ProviderRegistry) -> Self {
        use crate::testing::{MemoryContentRepo, MemoryUserRepo};

        Self::from_parts(
            Arc::new(AppConfig::for_tests()),
            Arc::new(MemoryUserRepo::default()),
            Arc::new(MemoryContentRepo::default()),
            Arc::new(providers),
        )
    }
}
