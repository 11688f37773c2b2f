//! Environment-driven configuration shared by the CLI and the web frontend.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::{debug, warn};

const ENV_API_URL: &str = "CONTRAK_API_URL";
const ENV_APP_URL: &str = "CONTRAK_URL";
const ENV_DEPLOYER_KEY: &str = "DEPLOYER_PRIVATE_KEY";
const ENV_ORG_KEY: &str = "TEAM_PRIVATE_KEY";
const ENV_NOTIFY_PROJECT: &str = "NEXT_PUBLIC_PROJECT_ID";
const ENV_NOTIFY_SECRET: &str = "NOTIFY_API_SECRET";
const ENV_WEB_ADDR: &str = "CONTRAK_WEB_ADDR";
const ENV_LOG_DIR: &str = "CONTRAK_LOG_DIR";

const DEFAULT_WEB_ADDR: &str = "127.0.0.1:3000";

/// Errors raised while reading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("{0} is not set")]
    Missing(&'static str),

    /// A variable is set but its value is unusable.
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Credentials for the push-notification API. Present only when both halves
/// are configured.
#[derive(Clone, PartialEq, Eq)]
pub struct NotifyCredentials {
    pub project_id: String,
    pub api_secret: String,
}

impl fmt::Debug for NotifyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyCredentials")
            .field("project_id", &self.project_id)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Runtime configuration, resolved from the process environment (and `.env`).
#[derive(Clone)]
pub struct ContrakConfig {
    pub api_url: Option<String>,
    pub app_url: Option<String>,
    pub deployer_private_key: Option<String>,
    pub org_private_key: Option<String>,
    pub notify_project_id: Option<String>,
    pub notify_api_secret: Option<String>,
    pub web_addr: SocketAddr,
    pub log_dir: Option<PathBuf>,
}

impl fmt::Debug for ContrakConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ContrakConfig")
            .field("api_url", &self.api_url)
            .field("app_url", &self.app_url)
            .field("deployer_private_key", &redact(&self.deployer_private_key))
            .field("org_private_key", &redact(&self.org_private_key))
            .field("notify_project_id", &self.notify_project_id)
            .field("notify_api_secret", &redact(&self.notify_api_secret))
            .field("web_addr", &self.web_addr)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl ContrakConfig {
    /// Load `.env` from the working directory (if any), then read the process
    /// environment. Variables already set in the environment win over `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!("failed to load .env: {e}"),
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let web_addr = match get(ENV_WEB_ADDR) {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                name: ENV_WEB_ADDR,
                reason: format!("{e}"),
            })?,
            None => DEFAULT_WEB_ADDR
                .parse()
                .map_err(|e| ConfigError::Invalid {
                    name: ENV_WEB_ADDR,
                    reason: format!("{e}"),
                })?,
        };

        Ok(Self {
            api_url: get(ENV_API_URL).map(|u| u.trim_end_matches('/').to_string()),
            app_url: get(ENV_APP_URL).map(|u| u.trim_end_matches('/').to_string()),
            deployer_private_key: get(ENV_DEPLOYER_KEY),
            org_private_key: get(ENV_ORG_KEY),
            notify_project_id: get(ENV_NOTIFY_PROJECT),
            notify_api_secret: get(ENV_NOTIFY_SECRET),
            web_addr,
            log_dir: get(ENV_LOG_DIR).map(PathBuf::from),
        })
    }

    /// Notification credentials, only when both project id and secret exist.
    pub fn notify(&self) -> Option<NotifyCredentials> {
        match (&self.notify_project_id, &self.notify_api_secret) {
            (Some(project_id), Some(api_secret)) => Some(NotifyCredentials {
                project_id: project_id.clone(),
                api_secret: api_secret.clone(),
            }),
            _ => None,
        }
    }

    /// The backend URL, validated.
    pub fn require_api_url(&self) -> Result<&str, ConfigError> {
        let url = self
            .api_url
            .as_deref()
            .ok_or(ConfigError::Missing(ENV_API_URL))?;
        if !validate_url(url) {
            return Err(ConfigError::Invalid {
                name: ENV_API_URL,
                reason: format!("{url} is not an http(s) URL"),
            });
        }
        Ok(url)
    }
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ContrakConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ContrakConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert!(config.api_url.is_none());
        assert!(config.deployer_private_key.is_none());
        assert!(config.org_private_key.is_none());
        assert_eq!(config.web_addr.port(), 3000);
        assert!(config.notify().is_none());
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = config_from(&[(ENV_DEPLOYER_KEY, "   "), (ENV_API_URL, "")]).unwrap();
        assert!(config.deployer_private_key.is_none());
        assert!(config.api_url.is_none());
    }

    #[test]
    fn api_url_trailing_slash_is_trimmed() {
        let config = config_from(&[(ENV_API_URL, "https://api.example.com/")]).unwrap();
        assert_eq!(config.require_api_url().unwrap(), "https://api.example.com");
    }

    #[test]
    fn require_api_url_reports_missing() {
        let config = config_from(&[]).unwrap();
        let err = config.require_api_url().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ENV_API_URL)));
    }

    #[test]
    fn require_api_url_rejects_non_http() {
        let config = config_from(&[(ENV_API_URL, "ftp://files.example.com")]).unwrap();
        assert!(config.require_api_url().is_err());
    }

    #[test]
    fn notify_requires_both_halves() {
        let half = config_from(&[(ENV_NOTIFY_PROJECT, "proj")]).unwrap();
        assert!(half.notify().is_none());

        let full =
            config_from(&[(ENV_NOTIFY_PROJECT, "proj"), (ENV_NOTIFY_SECRET, "s3cret")]).unwrap();
        let creds = full.notify().unwrap();
        assert_eq!(creds.project_id, "proj");
        assert_eq!(creds.api_secret, "s3cret");
    }

    #[test]
    fn invalid_web_addr_is_rejected() {
        let err = config_from(&[(ENV_WEB_ADDR, "not-an-addr")]).unwrap_err();
        assert!(err.to_string().contains(ENV_WEB_ADDR));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = config_from(&[
            (ENV_DEPLOYER_KEY, "0xdeadbeef"),
            (ENV_NOTIFY_PROJECT, "proj"),
            (ENV_NOTIFY_SECRET, "s3cret"),
        ])
        .unwrap();
        let rendered = format!("{config:?} {:?}", config.notify().unwrap());
        assert!(!rendered.contains("deadbeef"));
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn validate_url_accepts_http_and_https() {
        assert!(validate_url("https://api.example.com"));
        assert!(validate_url("http://localhost:8080"));
    }

    #[test]
    fn validate_url_rejects_garbage() {
        assert!(!validate_url(""));
        assert!(!validate_url("not a url"));
        assert!(!validate_url("file:///etc/passwd"));
    }
}
