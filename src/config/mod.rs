//! Configuration system (layered: code > env > config file > defaults).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{LinkError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.rotur.dev/link";
pub const DEFAULT_ME_ENDPOINT: &str = "https://api.rotur.dev/me";
pub const DEFAULT_AVATAR_BASE: &str = "https://avatars.rotur.dev";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
const DEFAULT_LOG_LEVEL: &str = "info";

/// Runtime configuration for a [`LinkSession`](crate::link::LinkSession).
///
/// Resolution order:
/// 1. Values set in code through the `with_*` builders
/// 2. `WARPLINK_*` environment variables (a `.env` file is honoured)
/// 3. The TOML config file (`~/.config/warplink/config.toml` by default)
/// 4. Built-in defaults
#[derive(Debug, Clone, PartialEq)]
pub struct LinkConfig {
    /// Base URL for the `/code` and `/user` endpoints.
    pub api_base: String,
    /// Account endpoint queried with `?auth={token}` once linked.
    pub me_endpoint: String,
    /// Prefix for derived avatar URLs.
    pub avatar_base: String,
    /// Period of the repeating link-status check.
    pub poll_interval: Duration,
    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Keep code, token and account across [`reset`](crate::link::LinkSession::reset).
    ///
    /// When off, a status check already in flight at reset time still
    /// finishes and writes its result (`waiting`, `error`, or `linked` with a
    /// token) onto the cleared record, which leaves an empty code. Last writer
    /// wins, as with overlapping checks.
    pub retain_credentials_on_reset: bool,
    /// Ignore a status check issued while another one is still outstanding.
    pub single_flight_checks: bool,
    /// Default `tracing` filter for the CLI when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            me_endpoint: DEFAULT_ME_ENDPOINT.to_string(),
            avatar_base: DEFAULT_AVATAR_BASE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: None,
            retain_credentials_on_reset: true,
            single_flight_checks: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl LinkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load defaults, the default config file (if any) and the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(None)
    }

    /// Like [`from_env`](Self::from_env), reading `path` instead of the
    /// default config file when given.
    pub fn from_env_with(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::load(path)
    }

    /// Load from an explicit config file (or the default location) and overlay
    /// the process environment.
    ///
    /// An explicit `path` must exist; the default location may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_file_if_exists(&Self::default_config_path())?,
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file path (`<config dir>/warplink/config.toml`).
    pub fn default_config_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "rotur", "warplink")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("warplink.toml"))
    }

    /// Parse a TOML config file on top of the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            LinkError::Configuration(format!("Cannot read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    fn from_file_if_exists(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(LinkError::Io(err)),
        }
    }

    /// Parse TOML config text on top of the defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(raw)?;
        let mut config = Self::default();
        file.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Overlay `WARPLINK_*` variables resolved through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("WARPLINK_API_BASE") {
            self.api_base = value;
        }
        if let Some(value) = lookup("WARPLINK_ME_ENDPOINT") {
            self.me_endpoint = value;
        }
        if let Some(value) = lookup("WARPLINK_AVATAR_BASE") {
            self.avatar_base = value;
        }
        if let Some(value) = lookup("WARPLINK_POLL_INTERVAL_MS") {
            let millis = parse_millis("WARPLINK_POLL_INTERVAL_MS", &value)?;
            self.poll_interval = Duration::from_millis(millis);
        }
        if let Some(value) = lookup("WARPLINK_REQUEST_TIMEOUT_MS") {
            let millis = parse_millis("WARPLINK_REQUEST_TIMEOUT_MS", &value)?;
            self.request_timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }
        if let Some(value) = lookup("WARPLINK_RETAIN_CREDENTIALS") {
            self.retain_credentials_on_reset = parse_flag("WARPLINK_RETAIN_CREDENTIALS", &value)?;
        }
        if let Some(value) = lookup("WARPLINK_SINGLE_FLIGHT") {
            self.single_flight_checks = parse_flag("WARPLINK_SINGLE_FLIGHT", &value)?;
        }
        if let Some(value) = lookup("WARPLINK_LOG") {
            self.log_level = value;
        }
        Ok(())
    }

    /// Reject settings that would make the session unusable.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(LinkError::Configuration(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        for (name, value) in [
            ("api_base", &self.api_base),
            ("me_endpoint", &self.me_endpoint),
        ] {
            if value.trim().is_empty() {
                return Err(LinkError::Configuration(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    pub fn with_me_endpoint(mut self, url: impl Into<String>) -> Self {
        self.me_endpoint = url.into();
        self
    }

    pub fn with_avatar_base(mut self, url: impl Into<String>) -> Self {
        self.avatar_base = url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retain_credentials_on_reset(mut self, retain: bool) -> Self {
        self.retain_credentials_on_reset = retain;
        self
    }

    pub fn with_single_flight_checks(mut self, enabled: bool) -> Self {
        self.single_flight_checks = enabled;
        self
    }

    /// Base URL with any trailing slash removed.
    pub(crate) fn api_base_trimmed(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }
}

/// On-disk shape of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    api_base: Option<String>,
    me_endpoint: Option<String>,
    avatar_base: Option<String>,
    poll_interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    retain_credentials_on_reset: Option<bool>,
    single_flight_checks: Option<bool>,
    log_level: Option<String>,
}

impl ConfigFile {
    fn apply_to(self, config: &mut LinkConfig) {
        if let Some(v) = self.api_base {
            config.api_base = v;
        }
        if let Some(v) = self.me_endpoint {
            config.me_endpoint = v;
        }
        if let Some(v) = self.avatar_base {
            config.avatar_base = v;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.request_timeout_ms {
            config.request_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(v) = self.retain_credentials_on_reset {
            config.retain_credentials_on_reset = v;
        }
        if let Some(v) = self.single_flight_checks {
            config.single_flight_checks = v;
        }
        if let Some(v) = self.log_level {
            config.log_level = v;
        }
    }
}

fn parse_millis(var: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| {
        LinkError::Configuration(format!(
            "{var} must be a whole number of milliseconds, got '{value}'"
        ))
    })
}

fn parse_flag(var: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(LinkError::Configuration(format!(
            "{var} must be a boolean, got '{value}'"
        ))),
    }
}
