use serde::{
    Deserialize,
    Serialize,
};

use crate::persistence::load_json_or_default;

pub const CONFIG_FILE: &str = "config.json";
pub const API_URL_ENV: &str = "AFFINITY_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub implicit_top_n: usize,
    pub toast_capacity: usize,
    pub toast_duration_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".to_string(),
            request_timeout_secs: 30,
            implicit_top_n: 10,
            toast_capacity: 5,
            toast_duration_ms: 5000,
        }
    }
}

impl ClientConfig {
    /// Read `config.json` from the app data directory, then apply environment overrides.
    pub fn load() -> Self {
        let config: ClientConfig = load_json_or_default(CONFIG_FILE);
        config.with_env_overrides(std::env::var(API_URL_ENV).ok())
    }

    pub fn with_env_overrides(mut self, api_url: Option<String>) -> Self {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        self
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn toast_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.toast_duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"api_url": "https://profiles.example"}"#).unwrap();
        assert_eq!(config.api_url, "https://profiles.example");
        assert_eq!(config.implicit_top_n, 10);
        assert_eq!(config.toast_capacity, 5);
    }

    #[test]
    fn test_env_override() {
        let config = ClientConfig::default().with_env_overrides(Some(" http://10.0.0.2:5000 ".into()));
        assert_eq!(config.api_url, "http://10.0.0.2:5000");

        let config = ClientConfig::default().with_env_overrides(Some("".into()));
        assert_eq!(config.api_url, "http://localhost:5000");
    }
}
