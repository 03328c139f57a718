use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;

use crate::{
    config::Config,
    middlewares::auth::JwtService,
    services::{
        account_service::AccountRegistry,
        hint_ledger::{HintLedger, InMemoryHintLedger, RedisHintLedger},
        llm::{Generator, OpenAiClient},
        vector_store::{QdrantClient, QdrantRetriever, Retriever},
    },
    utils::retry::{retry_async_with_config, RetryConfig},
};

pub struct AppState {
    pub config: Config,
    pub accounts: AccountRegistry,
    pub jwt: JwtService,
    pub hint_ledger: Arc<dyn HintLedger>,
    /// `None` when the vector store could not be set up.
    pub retriever: Option<Arc<dyn Retriever>>,
    /// `None` when no LLM API key is configured.
    pub generator: Option<Arc<dyn Generator>>,
}

impl AppState {
    /// Connects the collaborators named in `config`. Missing or unreachable
    /// LLM/vector store leave the service running in a degraded mode.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let hint_ledger: Arc<dyn HintLedger> = match &config.redis_uri {
            Some(uri) => {
                let redis = connect_redis(uri).await?;
                Arc::new(RedisHintLedger::new(
                    redis,
                    config.hints.history_ttl_seconds,
                ))
            }
            None => {
                tracing::warn!("REDIS_URI not set, hint histories are kept in memory");
                Arc::new(InMemoryHintLedger::new())
            }
        };

        let openai = OpenAiClient::from_settings(&config.openai)?.map(Arc::new);
        if openai.is_none() {
            tracing::warn!("OPENAI_API_KEY not set, hints and uploads are disabled");
        }

        let retriever: Option<Arc<dyn Retriever>> = match &openai {
            Some(openai) => {
                let qdrant = QdrantClient::new(&config.qdrant)?;
                let ensured = retry_async_with_config(
                    "qdrant_ensure_collection",
                    RetryConfig::startup(),
                    || qdrant.ensure_collection(),
                )
                .await;

                match ensured {
                    Ok(_) => {
                        tracing::info!(
                            "Vector store ready: {} at {}",
                            config.qdrant.collection,
                            config.qdrant.url
                        );
                        Some(Arc::new(QdrantRetriever::new(qdrant, openai.clone())))
                    }
                    Err(e) => {
                        tracing::error!("Vector store unavailable: {:#}", e);
                        None
                    }
                }
            }
            None => None,
        };

        let generator = openai.map(|client| client as Arc<dyn Generator>);

        Self::with_collaborators(config, hint_ledger, retriever, generator)
    }

    /// Builds the state around already constructed collaborators.
    pub fn with_collaborators(
        config: Config,
        hint_ledger: Arc<dyn HintLedger>,
        retriever: Option<Arc<dyn Retriever>>,
        generator: Option<Arc<dyn Generator>>,
    ) -> anyhow::Result<Self> {
        let accounts = AccountRegistry::from_settings(&config.accounts)?;
        let jwt = JwtService::new(&config.jwt_secret);

        Ok(Self {
            config,
            accounts,
            jwt,
            hint_ledger,
            retriever,
            generator,
        })
    }
}

async fn connect_redis(uri: &str) -> anyhow::Result<ConnectionManager> {
    tracing::info!("Attempting to connect to Redis...");

    let client = redis::Client::open(uri)?;
    let redis = tokio::time::timeout(Duration::from_secs(30), ConnectionManager::new(client))
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

    let mut conn = redis.clone();
    tokio::time::timeout(
        Duration::from_secs(5),
        redis::cmd("PING").query_async::<String>(&mut conn),
    )
    .await
    .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

    tracing::info!("Redis connection established successfully");
    Ok(redis)
}

pub mod account_service;
pub mod auth_service;
pub mod chunking;
pub mod document_service;
pub mod extract;
pub mod hint_ledger;
pub mod hint_service;
pub mod llm;
pub mod prompt;
pub mod stats_service;
pub mod vector_store;
