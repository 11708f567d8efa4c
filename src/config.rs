//! Assistant configuration: TOML file, then environment, then CLI flags.
//!
//! ```toml
//! endpoint = "https://example.supabase.co/functions/v1/dsa-chat"
//! api_key = "..."
//! system_prompt = "You are a helpful assistant specializing in Data Structures and Algorithms."
//! connect_timeout_secs = 10
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{ChatError, Result};

pub const ENV_ENDPOINT: &str = "DSA_ASSISTANT_ENDPOINT";
pub const ENV_API_KEY: &str = "DSA_ASSISTANT_API_KEY";
pub const ENV_SYSTEM_PROMPT: &str = "DSA_ASSISTANT_SYSTEM_PROMPT";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantConfig {
    /// Chat endpoint receiving the streaming POST.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Bearer token sent in the `Authorization` header.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Optional instruction sent as a leading `system` message.
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            system_prompt: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl AssistantConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Apply overrides from the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Blank values are ignored.
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get(ENV_ENDPOINT) {
            self.endpoint = Some(v);
        }
        if let Some(v) = get(ENV_API_KEY) {
            self.api_key = Some(v);
        }
        if let Some(v) = get(ENV_SYSTEM_PROMPT) {
            self.system_prompt = Some(v);
        }
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Check that a request could be built from this configuration.
    pub fn validate(&self) -> Result<()> {
        let endpoint = self
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ChatError::Config(format!("endpoint not set. Export {ENV_ENDPOINT} or pass --endpoint."))
            })?;
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ChatError::Config(format!("endpoint must be an http(s) URL, got {endpoint}")));
        }
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(ChatError::Config(format!(
                "{ENV_API_KEY} not set. Export it or add api_key to the config file."
            )));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ChatError::Config("connect_timeout_secs must be >= 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn valid() -> AssistantConfig {
        AssistantConfig {
            endpoint: Some("https://chat.example.com/v1/chat".to_string()),
            api_key: Some("key".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_timeout() {
        let c = AssistantConfig::default();
        assert_eq!(c.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_full_toml() {
        let c = AssistantConfig::from_toml_str(
            r#"
            endpoint = "http://localhost:54321/functions/v1/chat"
            api_key = "anon"
            system_prompt = "Answer concisely."
            connect_timeout_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(c.endpoint.as_deref(), Some("http://localhost:54321/functions/v1/chat"));
        assert_eq!(c.api_key.as_deref(), Some("anon"));
        assert_eq!(c.system_prompt.as_deref(), Some("Answer concisely."));
        assert_eq!(c.connect_timeout_secs, 3);
    }

    #[test]
    fn test_parse_empty_toml_uses_defaults() {
        assert_eq!(AssistantConfig::from_toml_str("").unwrap(), AssistantConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = AssistantConfig::from_toml_str("model = \"gpt\"").unwrap_err();
        assert!(matches!(err, ChatError::ConfigParse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "endpoint = \"https://x.test/chat\"").unwrap();
        let c = AssistantConfig::from_file(f.path()).unwrap();
        assert_eq!(c.endpoint.as_deref(), Some("https://x.test/chat"));
    }

    #[test]
    fn test_from_missing_file() {
        let err = AssistantConfig::from_file(Path::new("/nonexistent/dsa.toml")).unwrap_err();
        assert!(matches!(err, ChatError::Io(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(ENV_ENDPOINT, "https://env.test/chat"), (ENV_API_KEY, "env-key")].into();
        let c = valid().with_env_from(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(c.endpoint.as_deref(), Some("https://env.test/chat"));
        assert_eq!(c.api_key.as_deref(), Some("env-key"));
        assert!(c.system_prompt.is_none());
    }

    #[test]
    fn test_blank_env_ignored() {
        let c = valid().with_env_from(|k| (k == ENV_API_KEY).then(|| "  ".to_string()));
        assert_eq!(c.api_key.as_deref(), Some("key"));
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_endpoint() {
        let c = AssistantConfig { endpoint: None, ..valid() };
        assert!(c.validate().unwrap_err().to_string().contains(ENV_ENDPOINT));
    }

    #[test]
    fn test_validate_bad_scheme() {
        let c = AssistantConfig { endpoint: Some("ftp://x".into()), ..valid() };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_validate_missing_key() {
        let c = AssistantConfig { api_key: Some(" ".into()), ..valid() };
        assert!(c.validate().unwrap_err().to_string().contains(ENV_API_KEY));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let c = AssistantConfig { connect_timeout_secs: 0, ..valid() };
        assert!(c.validate().is_err());
    }
}
