//! Application configuration loaded from environment variables.
//!
//! Configuration is loaded once at startup and validated before the server
//! starts. A variable that is set but cannot be parsed is an error, not a
//! silent fallback to the default.
//!
//! ## Server
//!
//! - `LISTEN` - Bind address (default: `0.0.0.0:8090`)
//! - `RUST_LOG` - Log level (default: `info`)
//! - `LOG_FORMAT` - Log format: `text` or `json` (default: `text`)
//! - `BEHIND_PROXY` - Identify clients by `X-Forwarded-For` / `X-Real-IP` (default: `false`)
//! - `CORS_ALLOWED_ORIGINS` - Comma-separated allow-list
//!
//! ## Global limiter
//!
//! - `GLOBAL_LIMITER_CAPACITY` - Bucket size (default: 50000)
//! - `GLOBAL_LIMITER_INITIAL` - Tokens at startup (default: capacity)
//! - `GLOBAL_LIMITER_RATE` - Tokens added per second (default: 10000)
//!
//! ## Per-client limiter
//!
//! - `CLIENT_LIMITER_CAPACITY` - Tracked clients (default: 10000)
//! - `CLIENT_LIMITER_MAX_REQUESTS` - Requests per window (default: 10)
//! - `CLIENT_LIMITER_WINDOW_MS` - Window length (default: 1000)
//! - `CLIENT_LIMITER_IDLE_TTL_SECONDS` - Idle client lifetime (default: 300)
//! - `CLIENT_LIMITER_SWEEP_INTERVAL_SECONDS` - Idle sweep period (default: 60)
//!
//! ## URL store
//!
//! - `URL_STORE_CAPACITY` - Stored mappings (default: 100000)
//! - `URL_TTL_SECONDS` - Mapping lifetime (default: 86400)
//! - `URL_CODE_LENGTH` - Short code length, 4-32 (default: 10)
//! - `URL_SWEEP_INTERVAL_SECONDS` - Expiry sweep period (default: 60)
//! - `MAX_URL_LENGTH` - Longest accepted URL, 16-65536 (default: 2048)
//!
//! ## Front-end
//!
//! - `FRONTEND_DIR` - Static site root (default: `frontend/out`)
//! - `NOT_FOUND_PAGE` - HTML served for unknown codes (default: `<FRONTEND_DIR>/404.html`)
//! - `FALLBACK_404_HTML` - Inline HTML used when the page cannot be read
//!
//! ## Stress test
//!
//! - `STRESS_TEST_COMMAND` - Load generator executable (default: `loadgen` next to the server binary)
//! - `STRESS_TEST_ARGS` - Whitespace-separated extra arguments
//! - `STRESS_TEST_LISTEN` - Bind address of the isolated server (default: `127.0.0.1:0`)

use anyhow::{Context, Result, anyhow};
use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::utils::code_generator::{MAX_CODE_LENGTH, MIN_CODE_LENGTH};

const DEFAULT_FALLBACK_404_HTML: &str =
    "<!DOCTYPE html><html><body><h1>404</h1><p>This short link does not exist or has expired.</p></body></html>";

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub log_level: String,
    pub log_format: String,
    /// When true, client identity is read from X-Forwarded-For / X-Real-IP.
    /// Enable only when the service is behind a trusted reverse proxy.
    pub behind_proxy: bool,
    pub cors_allowed_origins: Vec<String>,
    pub global_limiter: GlobalLimiterConfig,
    pub client_limiter: ClientLimiterConfig,
    pub url_store: UrlStoreConfig,
    pub frontend_dir: PathBuf,
    pub not_found_page: PathBuf,
    pub fallback_404_html: String,
    pub stress_test: StressTestConfig,
}

/// Settings of the process-wide token bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalLimiterConfig {
    pub capacity: u64,
    pub initial: u64,
    /// Tokens added per second.
    pub rate: u64,
}

/// Settings of the sliding-window limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientLimiterConfig {
    /// Maximum number of clients tracked at once.
    pub capacity: usize,
    pub max_requests: usize,
    pub window: Duration,
    pub idle_ttl: Duration,
    pub sweep_interval: Duration,
}

/// Settings of the URL store and its input checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlStoreConfig {
    pub capacity: usize,
    pub ttl: Duration,
    pub code_length: usize,
    pub sweep_interval: Duration,
    pub max_url_length: usize,
}

/// How the stress harness launches its load generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StressTestConfig {
    pub command: String,
    pub args: Vec<String>,
    pub listen_addr: String,
}

impl Default for GlobalLimiterConfig {
    fn default() -> Self {
        Self {
            capacity: 50_000,
            initial: 50_000,
            rate: 10_000,
        }
    }
}

impl Default for ClientLimiterConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            max_requests: 10,
            window: Duration::from_millis(1000),
            idle_ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl Default for UrlStoreConfig {
    fn default() -> Self {
        Self {
            capacity: 100_000,
            ttl: Duration::from_secs(86_400),
            code_length: 10,
            sweep_interval: Duration::from_secs(60),
            max_url_length: 2048,
        }
    }
}

impl Default for StressTestConfig {
    fn default() -> Self {
        Self {
            command: default_stress_command(),
            args: Vec::new(),
            listen_addr: "127.0.0.1:0".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let frontend_dir = PathBuf::from("frontend/out");
        Self {
            listen_addr: "0.0.0.0:8090".to_string(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            behind_proxy: false,
            cors_allowed_origins: vec![
                "http://localhost:8090".to_string(),
                "http://localhost:3000".to_string(),
            ],
            global_limiter: GlobalLimiterConfig::default(),
            client_limiter: ClientLimiterConfig::default(),
            url_store: UrlStoreConfig::default(),
            not_found_page: frontend_dir.join("404.html"),
            frontend_dir,
            fallback_404_html: DEFAULT_FALLBACK_404_HTML.to_string(),
            stress_test: StressTestConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Unset variables take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let listen_addr = env::var("LISTEN").unwrap_or(defaults.listen_addr);
        let log_level = env::var("RUST_LOG").unwrap_or(defaults.log_level);
        let log_format = env::var("LOG_FORMAT").unwrap_or(defaults.log_format);

        let behind_proxy = env::var("BEHIND_PROXY")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let cors_allowed_origins = match env::var("CORS_ALLOWED_ORIGINS") {
            Ok(list) => list
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => defaults.cors_allowed_origins,
        };

        let capacity = env_parse("GLOBAL_LIMITER_CAPACITY", defaults.global_limiter.capacity)?;
        let global_limiter = GlobalLimiterConfig {
            capacity,
            initial: env_parse("GLOBAL_LIMITER_INITIAL", capacity)?,
            rate: env_parse("GLOBAL_LIMITER_RATE", defaults.global_limiter.rate)?,
        };

        let client_defaults = defaults.client_limiter;
        let client_limiter = ClientLimiterConfig {
            capacity: env_parse("CLIENT_LIMITER_CAPACITY", client_defaults.capacity)?,
            max_requests: env_parse("CLIENT_LIMITER_MAX_REQUESTS", client_defaults.max_requests)?,
            window: Duration::from_millis(env_parse(
                "CLIENT_LIMITER_WINDOW_MS",
                millis(client_defaults.window),
            )?),
            idle_ttl: Duration::from_secs(env_parse(
                "CLIENT_LIMITER_IDLE_TTL_SECONDS",
                client_defaults.idle_ttl.as_secs(),
            )?),
            sweep_interval: Duration::from_secs(env_parse(
                "CLIENT_LIMITER_SWEEP_INTERVAL_SECONDS",
                client_defaults.sweep_interval.as_secs(),
            )?),
        };

        let store_defaults = defaults.url_store;
        let url_store = UrlStoreConfig {
            capacity: env_parse("URL_STORE_CAPACITY", store_defaults.capacity)?,
            ttl: Duration::from_secs(env_parse("URL_TTL_SECONDS", store_defaults.ttl.as_secs())?),
            code_length: env_parse("URL_CODE_LENGTH", store_defaults.code_length)?,
            sweep_interval: Duration::from_secs(env_parse(
                "URL_SWEEP_INTERVAL_SECONDS",
                store_defaults.sweep_interval.as_secs(),
            )?),
            max_url_length: env_parse("MAX_URL_LENGTH", store_defaults.max_url_length)?,
        };

        let frontend_dir = env::var("FRONTEND_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.frontend_dir);
        let not_found_page = env::var("NOT_FOUND_PAGE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| frontend_dir.join("404.html"));
        let fallback_404_html =
            env::var("FALLBACK_404_HTML").unwrap_or(defaults.fallback_404_html);

        let stress_defaults = defaults.stress_test;
        let stress_test = StressTestConfig {
            command: env::var("STRESS_TEST_COMMAND").unwrap_or(stress_defaults.command),
            args: env::var("STRESS_TEST_ARGS")
                .map(|args| args.split_whitespace().map(str::to_string).collect())
                .unwrap_or(stress_defaults.args),
            listen_addr: env::var("STRESS_TEST_LISTEN").unwrap_or(stress_defaults.listen_addr),
        };

        Ok(Self {
            listen_addr,
            log_level,
            log_format,
            behind_proxy,
            cors_allowed_origins,
            global_limiter,
            client_limiter,
            url_store,
            frontend_dir,
            not_found_page,
            fallback_404_html,
            stress_test,
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - a capacity, rate, limit, window or interval is zero
    /// - the initial token count exceeds the bucket capacity
    /// - `code_length` is outside 4-32 or `max_url_length` outside 16-65536
    /// - `log_format` is not `text` or `json`
    /// - a listen address is not a socket address
    /// - the stress test command is empty
    pub fn validate(&self) -> Result<()> {
        self.listen_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("LISTEN must be 'host:port', got '{}'", self.listen_addr))?;

        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            );
        }

        // AllowOrigin::list panics on "*"; credentials rule out a wildcard.
        if self.cors_allowed_origins.iter().any(|origin| origin == "*") {
            anyhow::bail!(
                "CORS_ALLOWED_ORIGINS must list explicit origins, '*' is not allowed with credentials"
            );
        }

        let global = &self.global_limiter;
        if global.capacity == 0 {
            anyhow::bail!("GLOBAL_LIMITER_CAPACITY must be greater than 0");
        }
        if global.initial > global.capacity {
            anyhow::bail!(
                "GLOBAL_LIMITER_INITIAL ({}) must not exceed GLOBAL_LIMITER_CAPACITY ({})",
                global.initial,
                global.capacity
            );
        }
        if global.rate == 0 {
            anyhow::bail!("GLOBAL_LIMITER_RATE must be greater than 0");
        }

        let client = &self.client_limiter;
        if client.capacity == 0 {
            anyhow::bail!("CLIENT_LIMITER_CAPACITY must be greater than 0");
        }
        if client.max_requests == 0 {
            anyhow::bail!("CLIENT_LIMITER_MAX_REQUESTS must be greater than 0");
        }
        check_duration("CLIENT_LIMITER_WINDOW_MS", client.window)?;
        check_duration("CLIENT_LIMITER_IDLE_TTL_SECONDS", client.idle_ttl)?;
        check_duration("CLIENT_LIMITER_SWEEP_INTERVAL_SECONDS", client.sweep_interval)?;

        let store = &self.url_store;
        if store.capacity == 0 {
            anyhow::bail!("URL_STORE_CAPACITY must be greater than 0");
        }
        check_duration("URL_TTL_SECONDS", store.ttl)?;
        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&store.code_length) {
            anyhow::bail!(
                "URL_CODE_LENGTH must be between {MIN_CODE_LENGTH} and {MAX_CODE_LENGTH}, got {}",
                store.code_length
            );
        }
        check_duration("URL_SWEEP_INTERVAL_SECONDS", store.sweep_interval)?;
        if !(16..=65_536).contains(&store.max_url_length) {
            anyhow::bail!(
                "MAX_URL_LENGTH must be between 16 and 65536, got {}",
                store.max_url_length
            );
        }

        if self.stress_test.command.trim().is_empty() {
            anyhow::bail!("STRESS_TEST_COMMAND must not be empty");
        }
        self.stress_test
            .listen_addr
            .parse::<SocketAddr>()
            .with_context(|| {
                format!(
                    "STRESS_TEST_LISTEN must be 'host:port', got '{}'",
                    self.stress_test.listen_addr
                )
            })?;

        Ok(())
    }

    /// Prints configuration summary.
    pub fn print_summary(&self) {
        let global = &self.global_limiter;
        let client = &self.client_limiter;
        let store = &self.url_store;

        tracing::info!("Configuration loaded:");
        tracing::info!("  Listen address: {}", self.listen_addr);
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
        tracing::info!("  Behind proxy: {}", self.behind_proxy);
        tracing::info!(
            "  Global limiter: capacity {}, initial {}, {} tokens/s",
            global.capacity,
            global.initial,
            global.rate
        );
        tracing::info!(
            "  Client limiter: {} requests per {:?}, {} clients, idle TTL {:?}",
            client.max_requests,
            client.window,
            client.capacity,
            client.idle_ttl
        );
        tracing::info!(
            "  URL store: capacity {}, TTL {:?}, code length {}",
            store.capacity,
            store.ttl,
            store.code_length
        );
        tracing::info!("  CORS origins: {}", self.cors_allowed_origins.join(", "));
        tracing::info!("  Front-end: {}", self.frontend_dir.display());
        tracing::info!("  Stress test command: {}", self.stress_test.command);
    }
}

/// Longest accepted TTL, window or sweep interval.
pub const MAX_DURATION: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

fn check_duration(name: &str, value: Duration) -> Result<()> {
    if value.is_zero() {
        anyhow::bail!("{name} must be greater than 0");
    }
    if value > MAX_DURATION {
        anyhow::bail!(
            "{name} must not exceed {} seconds (10 years)",
            MAX_DURATION.as_secs()
        );
    }
    Ok(())
}

/// Reads `name` and parses it, returning `default` when unset.
fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{name} has invalid value '{raw}': {e}")),
        Err(_) => Ok(default),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// The `loadgen` binary built alongside the running executable, or plain
/// `loadgen` resolved through `PATH`.
fn default_stress_command() -> String {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("loadgen")))
        .filter(|candidate| candidate.is_file())
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "loadgen".to_string())
}

/// Loads and validates configuration from environment variables.
///
/// # Errors
///
/// Returns an error if a variable cannot be parsed or validation fails.
///
/// # Note
///
/// This function expects environment variables to be already loaded
/// (e.g., via `dotenvy::dotenv()` in the server binary).
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.log_format = "invalid".to_string();
        assert!(config.validate().is_err());
        config.log_format = "json".to_string();
        assert!(config.validate().is_ok());

        config.listen_addr = "8090".to_string();
        assert!(config.validate().is_err());
        config.listen_addr = "127.0.0.1:8090".to_string();

        config.global_limiter.initial = config.global_limiter.capacity + 1;
        assert!(config.validate().is_err());
        config.global_limiter.initial = 0;
        assert!(config.validate().is_ok());

        config.global_limiter.rate = 0;
        assert!(config.validate().is_err());
        config.global_limiter.rate = 1;

        config.client_limiter.window = Duration::ZERO;
        assert!(config.validate().is_err());
        config.client_limiter.window = Duration::from_secs(1);

        config.client_limiter.max_requests = 0;
        assert!(config.validate().is_err());
        config.client_limiter.max_requests = 3;

        config.stress_test.command = "  ".to_string();
        assert!(config.validate().is_err());
        config.stress_test.command = "loadgen".to_string();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_code_length_bounds() {
        let mut config = Config::default();

        config.url_store.code_length = 3;
        assert!(config.validate().is_err());

        config.url_store.code_length = 4;
        assert!(config.validate().is_ok());

        config.url_store.code_length = 32;
        assert!(config.validate().is_ok());

        config.url_store.code_length = 33;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_upper_bounds() {
        let mut config = Config::default();

        config.url_store.ttl = Duration::from_secs(u64::MAX);
        assert!(config.validate().is_err());
        config.url_store.ttl = MAX_DURATION;
        assert!(config.validate().is_ok());
        config.url_store.ttl = MAX_DURATION + Duration::from_secs(1);
        assert!(config.validate().is_err());
        config.url_store.ttl = Duration::from_secs(60);

        config.url_store.sweep_interval = Duration::from_secs(u64::MAX);
        assert!(config.validate().is_err());
        config.url_store.sweep_interval = Duration::from_secs(60);

        config.client_limiter.idle_ttl = Duration::from_secs(u64::MAX);
        assert!(config.validate().is_err());
        config.client_limiter.idle_ttl = Duration::from_secs(300);

        config.client_limiter.sweep_interval = Duration::from_secs(u64::MAX);
        assert!(config.validate().is_err());
        config.client_limiter.sweep_interval = Duration::from_secs(60);

        config.client_limiter.window = Duration::from_millis(u64::MAX);
        assert!(config.validate().is_err());
        config.client_limiter.window = Duration::from_secs(1);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_wildcard_cors_origin_is_rejected() {
        let mut config = Config::default();

        config.cors_allowed_origins = vec!["https://a.example".to_string(), "*".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CORS_ALLOWED_ORIGINS"));

        config.cors_allowed_origins = vec!["https://a.example".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_url_length_bounds() {
        let mut config = Config::default();

        config.url_store.max_url_length = 15;
        assert!(config.validate().is_err());

        config.url_store.max_url_length = 65_537;
        assert!(config.validate().is_err());

        config.url_store.max_url_length = 16;
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        let config = Config::from_env().unwrap();

        assert_eq!(config.global_limiter, GlobalLimiterConfig::default());
        assert_eq!(config.client_limiter, ClientLimiterConfig::default());
        assert_eq!(config.url_store, UrlStoreConfig::default());
        assert_eq!(config.not_found_page, PathBuf::from("frontend/out/404.html"));
    }

    #[test]
    #[serial]
    fn test_initial_defaults_to_capacity() {
        // SAFETY: Tests are run serially due to #[serial], so no concurrent access
        unsafe {
            env::set_var("GLOBAL_LIMITER_CAPACITY", "500");
        }

        let config = Config::from_env().unwrap();

        assert_eq!(config.global_limiter.capacity, 500);
        assert_eq!(config.global_limiter.initial, 500);

        // Cleanup
        unsafe {
            env::remove_var("GLOBAL_LIMITER_CAPACITY");
        }
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        // SAFETY: Tests are run serially due to #[serial], so no concurrent access
        unsafe {
            env::set_var("CLIENT_LIMITER_WINDOW_MS", "250");
            env::set_var("URL_TTL_SECONDS", "30");
            env::set_var("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example ,");
            env::set_var("STRESS_TEST_ARGS", "--requests 50  --concurrency 2");
            env::set_var("FRONTEND_DIR", "/srv/site");
        }

        let config = Config::from_env().unwrap();

        assert_eq!(config.client_limiter.window, Duration::from_millis(250));
        assert_eq!(config.url_store.ttl, Duration::from_secs(30));
        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(
            config.stress_test.args,
            vec!["--requests", "50", "--concurrency", "2"]
        );
        assert_eq!(config.not_found_page, PathBuf::from("/srv/site/404.html"));

        // Cleanup
        unsafe {
            env::remove_var("CLIENT_LIMITER_WINDOW_MS");
            env::remove_var("URL_TTL_SECONDS");
            env::remove_var("CORS_ALLOWED_ORIGINS");
            env::remove_var("STRESS_TEST_ARGS");
            env::remove_var("FRONTEND_DIR");
        }
    }

    #[test]
    #[serial]
    fn test_unparsable_value_is_an_error() {
        // SAFETY: Tests are run serially
        unsafe {
            env::set_var("URL_STORE_CAPACITY", "lots");
        }

        let result = Config::from_env();

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("URL_STORE_CAPACITY"));

        // Cleanup
        unsafe {
            env::remove_var("URL_STORE_CAPACITY");
        }
    }

    #[test]
    #[serial]
    fn test_negative_initial_is_rejected() {
        // SAFETY: Tests are run serially
        unsafe {
            env::set_var("GLOBAL_LIMITER_INITIAL", "-5");
        }

        assert!(Config::from_env().is_err());

        // Cleanup
        unsafe {
            env::remove_var("GLOBAL_LIMITER_INITIAL");
        }
    }
}
