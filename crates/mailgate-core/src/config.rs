//! Gateway configuration.
//!
//! The configuration is built once at startup, from environment variables
//! or a JSON file, and is read-only afterwards.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default bound on every network phase.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("configuration error: cannot read {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for this structure.
    #[error("configuration error: {0}")]
    Json(#[from] serde_json::Error),

    /// A port is not a number in 1..=65535.
    #[error("configuration error: invalid port {value:?} in {name}")]
    InvalidPort {
        /// Variable or field name.
        name: String,
        /// Offending value.
        value: String,
    },

    /// A security mode is not one of `none`, `starttls`, `tls`.
    #[error("configuration error: invalid security mode {0:?} (expected none, starttls or tls)")]
    InvalidSecurity(String),

    /// The timeout is not a positive number of seconds.
    #[error("configuration error: invalid timeout {0:?}")]
    InvalidTimeout(String),
}

/// How a connection is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// Plaintext. Only for local relays and tests.
    None,
    /// Plaintext greeting, then STARTTLS.
    StartTls,
    /// TLS from the first byte.
    Tls,
}

impl FromStr for Security {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "plain" => Ok(Self::None),
            "starttls" => Ok(Self::StartTls),
            "tls" | "ssl" => Ok(Self::Tls),
            _ => Err(ConfigError::InvalidSecurity(s.to_string())),
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::StartTls => "starttls",
            Self::Tls => "tls",
        })
    }
}

/// A server address and its security mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Hostname, also used for TLS server name verification.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Connection security.
    pub security: Security,
}

impl Endpoint {
    /// Creates an endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, security: Security) -> Self {
        Self {
            host: host.into(),
            port,
            security,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.host, self.port, self.security)
    }
}

/// The service account secret. Never printed.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret for use on the wire.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Everything the gateway needs to reach its mail servers and store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// SMTP submission server.
    pub submission: Endpoint,
    /// IMAP retrieval server.
    pub retrieval: Endpoint,
    /// Service account mailbox, used as sender and IMAP login.
    pub service_account_address: String,
    /// Service account secret. Sends and fetches fail without it.
    pub service_account_secret: Option<Secret>,
    /// Bound on each network phase.
    pub timeout: Duration,
    /// SQLite database holding the credential table.
    pub database_path: PathBuf,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            submission: Endpoint::new("smtp.gmail.com", 587, Security::StartTls),
            retrieval: Endpoint::new("imap.gmail.com", 993, Security::Tls),
            service_account_address: String::new(),
            service_account_secret: None,
            timeout: DEFAULT_TIMEOUT,
            database_path: PathBuf::from("mailgate.db"),
        }
    }
}

/// On-disk form; every field is optional and falls back to the default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    submission: Option<Endpoint>,
    retrieval: Option<Endpoint>,
    service_account_address: Option<String>,
    service_account_secret: Option<Secret>,
    timeout_secs: Option<u64>,
    database_path: Option<PathBuf>,
}

impl GatewayConfig {
    /// Reads the configuration from `MAILGATE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a port, security mode or timeout is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    ///
    /// Unset variables keep their defaults. An unset or empty
    /// `MAILGATE_SECRET` leaves the secret unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a port, security mode or timeout is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        apply_endpoint(&lookup, "MAILGATE_SMTP", &mut config.submission)?;
        apply_endpoint(&lookup, "MAILGATE_IMAP", &mut config.retrieval)?;

        if let Some(address) = lookup("MAILGATE_ADDRESS") {
            config.service_account_address = address;
        }
        config.service_account_secret = lookup("MAILGATE_SECRET")
            .filter(|s| !s.is_empty())
            .map(Secret);
        if let Some(value) = lookup("MAILGATE_TIMEOUT_SECS") {
            config.timeout = parse_timeout(&value)?;
        }
        if let Some(path) = lookup("MAILGATE_DATABASE") {
            config.database_path = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Reads the configuration from a JSON file.
    ///
    /// ```json
    /// {
    ///   "submission": { "host": "smtp.example.com", "port": 587, "security": "starttls" },
    ///   "retrieval": { "host": "imap.example.com", "port": 993, "security": "tls" },
    ///   "service_account_address": "relay@example.com",
    ///   "service_account_secret": "app-password",
    ///   "timeout_secs": 30,
    ///   "database_path": "/var/lib/mailgate/users.db"
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds a
    /// zero port or timeout.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parses the JSON form shown on [`from_json_file`](Self::from_json_file).
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid or holds a zero port or
    /// timeout.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(text)?;
        let defaults = Self::default();

        let config = Self {
            submission: file.submission.unwrap_or(defaults.submission),
            retrieval: file.retrieval.unwrap_or(defaults.retrieval),
            service_account_address: file
                .service_account_address
                .unwrap_or(defaults.service_account_address),
            service_account_secret: file.service_account_secret.filter(|s| !s.0.is_empty()),
            timeout: match file.timeout_secs {
                Some(0) => return Err(ConfigError::InvalidTimeout("0".to_string())),
                Some(secs) => Duration::from_secs(secs),
                None => defaults.timeout,
            },
            database_path: file.database_path.unwrap_or(defaults.database_path),
        };

        for (name, endpoint) in [("submission", &config.submission), ("retrieval", &config.retrieval)] {
            if endpoint.port == 0 {
                return Err(ConfigError::InvalidPort {
                    name: format!("{name}.port"),
                    value: "0".to_string(),
                });
            }
        }

        Ok(config)
    }
}

fn apply_endpoint<F>(lookup: &F, prefix: &str, endpoint: &mut Endpoint) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup(&format!("{prefix}_HOST")) {
        endpoint.host = host;
    }

    let port_var = format!("{prefix}_PORT");
    if let Some(value) = lookup(&port_var) {
        endpoint.port = value
            .trim()
            .parse()
            .ok()
            .filter(|&port: &u16| port != 0)
            .ok_or(ConfigError::InvalidPort {
                name: port_var,
                value,
            })?;
    }

    if let Some(value) = lookup(&format!("{prefix}_SECURITY")) {
        endpoint.security = value.parse()?;
    }

    Ok(())
}

fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|&secs| secs > 0)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::InvalidTimeout(value.to_string()))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_match_gmail_deployment() {
        let config = GatewayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(
            config.submission,
            Endpoint::new("smtp.gmail.com", 587, Security::StartTls)
        );
        assert_eq!(
            config.retrieval,
            Endpoint::new("imap.gmail.com", 993, Security::Tls)
        );
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.service_account_secret.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("MAILGATE_SMTP_HOST", "127.0.0.1"),
            ("MAILGATE_SMTP_PORT", "2525"),
            ("MAILGATE_SMTP_SECURITY", "none"),
            ("MAILGATE_IMAP_SECURITY", "STARTTLS"),
            ("MAILGATE_ADDRESS", "relay@example.com"),
            ("MAILGATE_SECRET", "hunter2"),
            ("MAILGATE_TIMEOUT_SECS", "5"),
            ("MAILGATE_DATABASE", "/tmp/users.db"),
        ]))
        .unwrap();

        assert_eq!(config.submission, Endpoint::new("127.0.0.1", 2525, Security::None));
        assert_eq!(config.retrieval.security, Security::StartTls);
        assert_eq!(config.service_account_address, "relay@example.com");
        assert_eq!(
            config.service_account_secret.as_ref().map(Secret::expose),
            Some("hunter2")
        );
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.database_path, PathBuf::from("/tmp/users.db"));
    }

    #[test]
    fn test_empty_secret_is_missing() {
        let config = GatewayConfig::from_lookup(lookup(&[("MAILGATE_SECRET", "")])).unwrap();
        assert!(config.service_account_secret.is_none());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(&[("MAILGATE_IMAP_PORT", "imap")])),
            Err(ConfigError::InvalidPort { .. })
        ));
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(&[("MAILGATE_SMTP_PORT", "0")])),
            Err(ConfigError::InvalidPort { .. })
        ));
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(&[("MAILGATE_SMTP_SECURITY", "maybe")])),
            Err(ConfigError::InvalidSecurity(_))
        ));
        assert!(matches!(
            GatewayConfig::from_lookup(lookup(&[("MAILGATE_TIMEOUT_SECS", "0")])),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_secret_is_redacted() {
        let config = GatewayConfig {
            service_account_secret: Some(Secret::new("hunter2")),
            ..GatewayConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("Secret(***)"));
    }

    #[test]
    fn test_from_json_partial() {
        let config = GatewayConfig::from_json(
            r#"{
                "submission": { "host": "mail.example.com", "port": 465, "security": "tls" },
                "service_account_address": "relay@example.com",
                "timeout_secs": 10
            }"#,
        )
        .unwrap();

        assert_eq!(config.submission, Endpoint::new("mail.example.com", 465, Security::Tls));
        assert_eq!(config.retrieval.host, "imap.gmail.com");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.service_account_secret.is_none());
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        assert!(matches!(
            GatewayConfig::from_json(r#"{ "timeout_secs": 0 }"#),
            Err(ConfigError::InvalidTimeout(_))
        ));
        assert!(matches!(
            GatewayConfig::from_json(r#"{ "retrieval": { "host": "x", "port": 0, "security": "tls" } }"#),
            Err(ConfigError::InvalidPort { .. })
        ));
        assert!(matches!(
            GatewayConfig::from_json(r#"{ "smtp": {} }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("mailgate-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "service_account_secret": "s3cret" }"#).unwrap();

        let config = GatewayConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(
            config.service_account_secret.as_ref().map(Secret::expose),
            Some("s3cret")
        );

        assert!(matches!(
            GatewayConfig::from_json_file(&path),
            Err(ConfigError::Io { .. })
        ));
    }
}
