use serde::Deserialize;
use std::env;

pub const STUDENT_ACCOUNT_COUNT: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub openai: OpenAiSettings,
    pub qdrant: QdrantSettings,
    pub redis_uri: Option<String>,
    pub accounts: AccountSettings,
    pub hints: HintSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QdrantSettings {
    pub url: String,
    pub collection: String,
    pub vector_size: u64,
}

/// Passwords for the fixed tutor accounts: one trainer and five students.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountSettings {
    pub trainer_password: String,
    pub student_passwords: Vec<String>,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HintSettings {
    /// Number of passages pulled from the vector store per hint.
    pub retrieval_k: usize,
    /// Lifetime of a per-question hint history in the Redis ledger.
    pub history_ttl_seconds: u64,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            temperature: 0.3,
            timeout_seconds: 60,
        }
    }
}

impl Default for QdrantSettings {
    fn default() -> Self {
        Self {
            url: "http://qdrant:6333".to_string(),
            collection: "rag_tutor_docs".to_string(),
            vector_size: 1536,
        }
    }
}

impl Default for HintSettings {
    fn default() -> Self {
        Self {
            retrieval_k: 8,
            history_ttl_seconds: 8 * 3600,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // .env sits next to docker-compose.yml in deployments; fall back to the working dir
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/{env}.toml first, APP__SECTION__KEY env vars on top
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let lookup = |key: &str, var: &str| -> Option<String> {
            settings
                .get_string(key)
                .ok()
                .or_else(|| env::var(var).ok())
                .filter(|value| !value.trim().is_empty())
        };

        let bind_addr = lookup("server.bind_addr", "APP_BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8000".to_string());

        let jwt_secret = match lookup("auth.jwt_secret", "JWT_SECRET") {
            Some(secret) => secret,
            None if app_env == "prod" => {
                return Err(config::ConfigError::Message(
                    "JWT_SECRET must be set in production".to_string(),
                ))
            }
            None => {
                eprintln!("WARNING: Using default JWT_SECRET (dev mode only!)");
                "change-me-in-production".to_string()
            }
        };

        let access_token_ttl_minutes = parse_or(
            lookup("auth.access_token_ttl_minutes", "ACCESS_TOKEN_EXPIRE_MINUTES"),
            480,
        )?;

        let openai_defaults = OpenAiSettings::default();
        let openai = OpenAiSettings {
            api_key: lookup("openai.api_key", "OPENAI_API_KEY"),
            base_url: lookup("openai.base_url", "OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(openai_defaults.base_url),
            chat_model: lookup("openai.chat_model", "OPENAI_CHAT_MODEL")
                .unwrap_or(openai_defaults.chat_model),
            embedding_model: lookup("openai.embedding_model", "OPENAI_EMBEDDING_MODEL")
                .unwrap_or(openai_defaults.embedding_model),
            temperature: parse_or(
                lookup("openai.temperature", "OPENAI_TEMPERATURE"),
                openai_defaults.temperature,
            )?,
            timeout_seconds: parse_or(
                lookup("openai.timeout_seconds", "OPENAI_TIMEOUT_SECONDS"),
                openai_defaults.timeout_seconds,
            )?,
        };

        let qdrant_defaults = QdrantSettings::default();
        let qdrant_url = match lookup("qdrant.url", "QDRANT_URL") {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let host =
                    lookup("qdrant.host", "QDRANT_HOST").unwrap_or_else(|| "qdrant".to_string());
                let port = lookup("qdrant.port", "QDRANT_PORT").unwrap_or_else(|| "6333".to_string());
                format!("http://{}:{}", host, port)
            }
        };
        let qdrant = QdrantSettings {
            url: qdrant_url,
            collection: lookup("qdrant.collection", "QDRANT_COLLECTION")
                .unwrap_or(qdrant_defaults.collection),
            vector_size: parse_or(
                lookup("qdrant.vector_size", "QDRANT_VECTOR_SIZE"),
                qdrant_defaults.vector_size,
            )?,
        };

        let redis_uri = lookup("redis.uri", "REDIS_URI");

        let trainer_password =
            lookup("accounts.trainer_password", "ADMIN_PASSWORD").unwrap_or_else(|| {
                eprintln!("WARNING: ADMIN_PASSWORD not set, using the default trainer password");
                "trainer2024".to_string()
            });
        let student_passwords = (1..=STUDENT_ACCOUNT_COUNT)
            .map(|n| {
                lookup(
                    &format!("accounts.student{}_password", n),
                    &format!("STUDENT{}_PW", n),
                )
                .unwrap_or_else(|| format!("student{:02}", n))
            })
            .collect();
        let accounts = AccountSettings {
            trainer_password,
            student_passwords,
            bcrypt_cost: parse_or(
                lookup("accounts.bcrypt_cost", "BCRYPT_COST"),
                bcrypt::DEFAULT_COST,
            )?,
        };

        let hint_defaults = HintSettings::default();
        let hints = HintSettings {
            retrieval_k: parse_or(
                lookup("hints.retrieval_k", "HINT_RETRIEVAL_K"),
                hint_defaults.retrieval_k,
            )?,
            history_ttl_seconds: parse_or(
                lookup("hints.history_ttl_seconds", "HINT_HISTORY_TTL_SECONDS"),
                hint_defaults.history_ttl_seconds,
            )?,
        };

        Ok(Config {
            bind_addr,
            jwt_secret,
            access_token_ttl_minutes,
            openai,
            qdrant,
            redis_uri,
            accounts,
            hints,
        })
    }
}

fn parse_or<T>(raw: Option<String>, default: T) -> Result<T, config::ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.trim().parse::<T>().map_err(|e| {
            config::ConfigError::Message(format!("Invalid value '{}': {}", value, e))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "APP_BIND_ADDR",
            "JWT_SECRET",
            "OPENAI_API_KEY",
            "QDRANT_URL",
            "QDRANT_HOST",
            "QDRANT_PORT",
            "APP__QDRANT__HOST",
            "REDIS_URI",
            "ADMIN_PASSWORD",
            "STUDENT3_PW",
            "HINT_RETRIEVAL_K",
            "APP_ENV",
        ] {
            env::remove_var(var);
        }
        env::set_var("SKIP_ROOT_ENV", "1");
    }

    #[test]
    #[serial]
    fn test_defaults_match_deployment() {
        clear_env();
        let config = Config::load().unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.access_token_ttl_minutes, 480);
        assert_eq!(config.qdrant.url, "http://qdrant:6333");
        assert_eq!(config.qdrant.collection, "rag_tutor_docs");
        assert_eq!(config.qdrant.vector_size, 1536);
        assert_eq!(config.openai.chat_model, "gpt-4o-mini");
        assert!(config.openai.api_key.is_none());
        assert!(config.redis_uri.is_none());
        assert_eq!(config.accounts.trainer_password, "trainer2024");
        assert_eq!(
            config.accounts.student_passwords.len(),
            STUDENT_ACCOUNT_COUNT
        );
        assert_eq!(config.accounts.student_passwords[2], "student03");
        assert_eq!(config.hints.retrieval_k, 8);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        env::set_var("QDRANT_HOST", "localhost");
        env::set_var("QDRANT_PORT", "6334");
        env::set_var("STUDENT3_PW", "s3cret");
        env::set_var("OPENAI_API_KEY", "sk-test");
        env::set_var("HINT_RETRIEVAL_K", "4");

        let config = Config::load().unwrap();
        clear_env();

        assert_eq!(config.qdrant.url, "http://localhost:6334");
        assert_eq!(config.accounts.student_passwords[2], "s3cret");
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.hints.retrieval_k, 4);
    }

    #[test]
    #[serial]
    fn test_blank_qdrant_host_uses_default_and_app_override_wins() {
        clear_env();
        env::set_var("QDRANT_HOST", "");
        let blank = Config::load().unwrap();

        env::set_var("QDRANT_HOST", "localhost");
        env::set_var("APP__QDRANT__HOST", "qdrant.internal");
        let overridden = Config::load().unwrap();
        clear_env();

        assert_eq!(blank.qdrant.url, "http://qdrant:6333");
        assert_eq!(overridden.qdrant.url, "http://qdrant.internal:6333");
    }

    #[test]
    #[serial]
    fn test_prod_requires_jwt_secret() {
        clear_env();
        env::set_var("APP_ENV", "prod");
        let result = Config::load();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_invalid_number_is_rejected() {
        clear_env();
        env::set_var("HINT_RETRIEVAL_K", "many");
        let result = Config::load();
        clear_env();

        assert!(result.is_err());
    }
}
