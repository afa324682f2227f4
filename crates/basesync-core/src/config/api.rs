use std::fmt;
use std::time::Duration;

use crate::errors::ConfigError;

pub const DEFAULT_API_URL: &str = "https://api.airtable.com/v0/meta/bases";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the remote schema API.
///
/// The credential is never printed: `Debug` redacts it so the struct can be
/// logged as a whole.
#[derive(Clone)]
pub struct ApiConfig {
    pub base_id: String,
    pub api_key: String,
    pub api_url: String,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_id: Option<String>, api_key: Option<String>) -> Result<Self, ConfigError> {
        let base_id = non_blank(base_id).ok_or(ConfigError::MissingCredential("base id"))?;
        let api_key = non_blank(api_key).ok_or(ConfigError::MissingCredential("API key"))?;
        Ok(Self {
            base_id,
            api_key,
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `{api_url}/{base_id}/tables`
    pub fn tables_url(&self) -> String {
        format!(
            "{}/{}/tables",
            self.api_url.trim_end_matches('/'),
            self.base_id
        )
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_id", &self.base_id)
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials() {
        let err = ApiConfig::new(None, Some("pat123".into())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential("base id")));

        let err = ApiConfig::new(Some("app1".into()), Some("   ".into())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential("API key")));
    }

    #[test]
    fn test_debug_redacts_key() {
        let cfg = ApiConfig::new(Some("app1".into()), Some("pat.secret".into())).unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("pat.secret"));
        assert!(dbg.contains("<redacted>"));
        assert!(dbg.contains("app1"));
    }

    #[test]
    fn test_tables_url() {
        let cfg = ApiConfig::new(Some("app1".into()), Some("k".into())).unwrap();
        assert_eq!(
            cfg.tables_url(),
            "https://api.airtable.com/v0/meta/bases/app1/tables"
        );

        let cfg = cfg.with_api_url("http://127.0.0.1:9999/");
        assert_eq!(cfg.tables_url(), "http://127.0.0.1:9999/app1/tables");
    }
}
