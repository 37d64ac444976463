//! Service configuration.

use std::str::FromStr;
use std::time::Duration;

use lending_core::DecisionPolicy;
use rust_decimal::Decimal;

/// Core banking system (SOAP) settings.
#[derive(Debug, Clone)]
pub struct CbsConfig {
    /// KYC service endpoint (optional).
    pub kyc_url: Option<String>,
    /// Transactions service endpoint (optional).
    pub transactions_url: Option<String>,
    /// Username sent in the WS-Security header.
    pub username: String,
    /// Password sent in the WS-Security header.
    pub password: String,
    /// Per-call timeout.
    pub timeout: Duration,
}

impl Default for CbsConfig {
    fn default() -> Self {
        Self {
            kyc_url: None,
            transactions_url: None,
            username: "admin".into(),
            password: String::new(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Scoring engine settings.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Base URL, e.g. `https://scoring.example.com/api/v1` (optional).
    pub base_url: Option<String>,
    /// Maximum number of score queries per application.
    pub max_retries: u32,
    /// Fixed delay between score queries.
    pub retry_delay: Duration,
    /// Per-call timeout.
    pub timeout: Duration,
    /// Upper bound on the score polling loop.
    pub deadline: Duration,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            timeout: Duration::from_secs(10),
            deadline: Duration::from_secs(60),
        }
    }
}

/// Lookup cache settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// KYC entry lifetime.
    pub kyc_ttl: Duration,
    /// Transaction history entry lifetime.
    pub transactions_ttl: Duration,
    /// Loan status entry lifetime.
    pub loan_status_ttl: Duration,
    /// Entry bound per cache.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            kyc_ttl: Duration::from_secs(3600),
            transactions_ttl: Duration::from_secs(3600),
            loan_status_ttl: Duration::from_secs(300),
            max_entries: 10_000,
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8000").
    pub listen_addr: String,

    /// PostgreSQL URL. Without it the service keeps state in memory.
    pub database_url: Option<String>,

    /// Pool size for PostgreSQL.
    pub database_max_connections: u32,

    /// Name registered with the scoring engine.
    pub service_name: String,

    /// Basic-auth username for protected endpoints and scoring callbacks.
    pub service_username: String,

    /// Basic-auth password for protected endpoints and scoring callbacks.
    pub service_password: String,

    /// Public base URL of this service, used for the callback URL.
    pub base_url: String,

    /// CBS settings.
    pub cbs: CbsConfig,

    /// Scoring engine settings.
    pub scoring: ScoringConfig,

    /// Cache settings.
    pub cache: CacheConfig,

    /// Loan decision policy.
    pub policy: DecisionPolicy,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout. Must exceed the scoring deadline.
    pub request_timeout: Duration,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    #[must_use]
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_ok() {
            tracing::debug!("Loaded .env file");
        }

        let defaults = Self::default();

        Self {
            listen_addr: env_or("LISTEN_ADDR", defaults.listen_addr),
            database_url: env_opt("DATABASE_URL"),
            database_max_connections: env_parse(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            service_name: env_or("SERVICE_NAME", defaults.service_name),
            service_username: env_or("SERVICE_USERNAME", defaults.service_username),
            service_password: env_or("SERVICE_PASSWORD", defaults.service_password),
            base_url: env_or("BASE_URL", defaults.base_url),
            cbs: CbsConfig {
                kyc_url: env_opt("CBS_KYC_URL"),
                transactions_url: env_opt("CBS_TRANSACTIONS_URL"),
                username: env_or("CBS_USERNAME", defaults.cbs.username),
                password: env_or("CBS_PASSWORD", defaults.cbs.password),
                timeout: env_secs("CBS_TIMEOUT_SECONDS", defaults.cbs.timeout),
            },
            scoring: ScoringConfig {
                base_url: env_opt("SCORING_BASE_URL"),
                max_retries: env_parse("SCORING_MAX_RETRIES", defaults.scoring.max_retries),
                retry_delay: env_secs("SCORING_RETRY_DELAY_SECONDS", defaults.scoring.retry_delay),
                timeout: env_secs("SCORING_TIMEOUT_SECONDS", defaults.scoring.timeout),
                deadline: env_secs("SCORING_DEADLINE_SECONDS", defaults.scoring.deadline),
            },
            cache: CacheConfig {
                kyc_ttl: env_secs("KYC_CACHE_TTL_SECONDS", defaults.cache.kyc_ttl),
                transactions_ttl: env_secs(
                    "TRANSACTIONS_CACHE_TTL_SECONDS",
                    defaults.cache.transactions_ttl,
                ),
                loan_status_ttl: env_secs(
                    "LOAN_STATUS_CACHE_TTL_SECONDS",
                    defaults.cache.loan_status_ttl,
                ),
                max_entries: env_parse("CACHE_MAX_ENTRIES", defaults.cache.max_entries),
            },
            policy: DecisionPolicy {
                min_score: env_parse("LOAN_MIN_SCORE", defaults.policy.min_score),
                interest_rate: env_parse::<Decimal>(
                    "LOAN_INTEREST_RATE",
                    defaults.policy.interest_rate,
                ),
                term_days: env_parse("LOAN_TERM_DAYS", defaults.policy.term_days),
                ..defaults.policy
            },
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout: env_secs("REQUEST_TIMEOUT_SECONDS", defaults.request_timeout),
        }
    }

    /// Callback URL the scoring engine uses to pull transaction data.
    #[must_use]
    pub fn transactions_callback_url(&self) -> String {
        format!(
            "{}/api/v1/transactions/",
            self.base_url.trim_end_matches('/')
        )
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: String) -> String {
    env_opt(key).unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable setting");
            default
        }),
        Err(_) => default,
    }
}

fn env_secs(key: &str, default: Duration) -> Duration {
    Duration::from_secs(env_parse(key, default.as_secs()))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".into(),
            database_url: None,
            database_max_connections: 10,
            service_name: "DigitalLendingPlatform".into(),
            service_username: "lending_user".into(),
            service_password: String::new(),
            base_url: "http://localhost:8000".into(),
            cbs: CbsConfig::default(),
            scoring: ScoringConfig::default(),
            cache: CacheConfig::default(),
            policy: DecisionPolicy::default(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout: Duration::from_secs(90),
        }
    }
}
