// Server configuration
// Decision: Everything comes from the environment (after .env), with dev-friendly defaults
// Decision: No DATABASE_URL means in-memory dev mode; no peer means a single node

use std::str::FromStr;
use std::time::Duration;

use rand::{distributions::Alphanumeric, Rng};
use torb_core::{BoxOfficeConfig, CacheConfig, RetryPolicy};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_PEER_TIMEOUT_MS: u64 = 500;
const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 3600;

/// Session cookie signing configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HS256 secret. Both nodes must share it.
    pub secret: String,
    pub max_age: Duration,
}

impl SessionConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            max_age: Duration::from_secs(DEFAULT_SESSION_MAX_AGE_SECS),
        }
    }
}

/// The other node of the pair
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// `host:port` of the peer's HTTP listener
    pub address: String,
    pub timeout: Duration,
}

/// Administrator created at startup when missing
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub login_name: String,
    pub password: String,
    pub nickname: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: Option<String>,
    pub listen_addr: String,
    pub peer: Option<PeerConfig>,
    pub session: SessionConfig,
    pub box_office: BoxOfficeConfig,
    pub admin: Option<AdminBootstrap>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let database_url = env_string("DATABASE_URL");
        let listen_addr =
            env_string("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());

        let peer = env_string("PEER_APP_SERVER")
            .or_else(|| env_string("ANOTHER_APP_SERVER"))
            .map(|address| PeerConfig {
                address,
                timeout: Duration::from_millis(
                    env_parse("PEER_TIMEOUT_MS").unwrap_or(DEFAULT_PEER_TIMEOUT_MS),
                ),
            });

        let secret = env_string("SESSION_SECRET").unwrap_or_else(|| {
            tracing::warn!(
                "SESSION_SECRET not set, using a random secret; sessions will not survive restarts or cross nodes"
            );
            random_secret()
        });
        let session = SessionConfig {
            secret,
            max_age: Duration::from_secs(
                env_parse("SESSION_MAX_AGE_SECS").unwrap_or(DEFAULT_SESSION_MAX_AGE_SECS),
            ),
        };

        let mut retry = match env_parse::<usize>("CLAIM_MAX_ATTEMPTS") {
            Some(max) => RetryPolicy::bounded(max),
            None => RetryPolicy::unbounded(),
        };
        if let Some(ms) = env_parse::<u64>("CLAIM_BACKOFF_MS").filter(|ms| *ms > 0) {
            let base = Duration::from_millis(ms);
            retry = retry.with_backoff(base, base.saturating_mul(32));
        }

        let mut cache = CacheConfig::default();
        if let Some(secs) = env_parse::<u64>("CACHE_MAX_AGE_SECS") {
            cache = cache.with_max_age(Duration::from_secs(secs));
        }

        let admin = match (env_string("ADMIN_LOGIN_NAME"), env_string("ADMIN_PASSWORD")) {
            (Some(login_name), Some(password)) => Some(AdminBootstrap {
                nickname: env_string("ADMIN_NICKNAME").unwrap_or_else(|| login_name.clone()),
                login_name,
                password,
            }),
            (Some(_), None) => {
                tracing::warn!("ADMIN_LOGIN_NAME set without ADMIN_PASSWORD, skipping bootstrap");
                None
            }
            _ => None,
        };

        Self {
            database_url,
            listen_addr,
            peer,
            session,
            box_office: BoxOfficeConfig::new().with_retry(retry).with_cache(cache),
            admin,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable environment variable");
            None
        }
    }
}

fn random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}
