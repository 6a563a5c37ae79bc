// src/config.rs - Backend endpoint configuration
use serde::Deserialize;
use std::path::Path;

use crate::error::{ClientError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8001";

/// Shape of the optional `config.json` served/shipped alongside the client.
/// Either `api.url` or `frontend.api_url` may carry the override.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    api: Option<ApiSection>,
    #[serde(default)]
    frontend: Option<FrontendSection>,
}

#[derive(Debug, Deserialize)]
struct ApiSection {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FrontendSection {
    api_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
}

impl AppConfig {
    /// Resolve the backend base URL.
    ///
    /// Order: `config.json` next to the binary (or at `config_path`), then
    /// the `LOGOVISION_API_URL` environment variable, then the local default.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(url) = Self::from_config_file(config_path)? {
            tracing::info!("Loaded API URL from config file: {}", url);
            return Ok(Self { api_url: url });
        }

        if let Ok(url) = std::env::var("LOGOVISION_API_URL") {
            if !url.trim().is_empty() {
                tracing::info!("Loaded API URL from environment: {}", url);
                return Ok(Self { api_url: url });
            }
        }

        tracing::info!("Using default API URL: {}", DEFAULT_API_URL);
        Ok(Self {
            api_url: DEFAULT_API_URL.to_string(),
        })
    }

    fn from_config_file(config_path: Option<&Path>) -> Result<Option<String>> {
        let path = config_path.unwrap_or_else(|| Path::new("config.json"));
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)?;
        let parsed: ConfigFile = serde_json::from_str(&raw)
            .map_err(|e| ClientError::Config(format!("invalid {}: {}", path.display(), e)))?;

        let url = parsed
            .api
            .and_then(|a| a.url)
            .or_else(|| parsed.frontend.and_then(|f| f.api_url));

        Ok(url.filter(|u| !u.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_config_file_falls_back_to_default() {
        let config = AppConfig::load(Some(Path::new("/nonexistent/config.json"))).unwrap();
        // No file and (normally) no env override: local default applies.
        if std::env::var("LOGOVISION_API_URL").is_err() {
            assert_eq!(config.api_url, DEFAULT_API_URL);
        }
    }

    #[test]
    fn config_file_api_url_wins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"api": {{"url": "http://backend:9000"}}}}"#).unwrap();
        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.api_url, "http://backend:9000");
    }

    #[test]
    fn frontend_section_is_accepted_as_fallback_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"frontend": {{"api_url": "http://other:8080"}}}}"#).unwrap();
        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.api_url, "http://other:8080");
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(AppConfig::load(Some(file.path())).is_err());
    }
}
