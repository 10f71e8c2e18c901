//! Runtime configuration loaded from the process environment.
//!
//! A `.env` file is honored by `main` before this is read. Upload limits are
//! not configurable here; they live as constants in [`crate::validation`].

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_VISION_URL: &str = "https://vision.googleapis.com";
const DEFAULT_VISION_TIMEOUT_SECS: u64 = 30;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// Non-empty environment variable, trimmed.
fn env_non_empty(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub vision: VisionConfig,
}

/// How the Vision client authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisionAuth {
    ApiKey(String),
    ServiceAccount(PathBuf),
    /// No credentials configured; the engine cannot be constructed.
    Missing,
}

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub base_url: String,
    pub auth: VisionAuth,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_non_empty("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_env_or("PORT", DEFAULT_PORT),
            log_level: env_non_empty("LOG_LEVEL")
                .map(|l| l.to_lowercase())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            vision: VisionConfig::from_env(),
        }
    }

    /// Socket address string the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Default tracing filter used when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> String {
        format!(
            "ocr_extract_api={level},tower_http={level}",
            level = self.log_level
        )
    }
}

impl VisionConfig {
    pub fn from_env() -> Self {
        // An explicit API key wins over application default credentials.
        let auth = if let Some(key) = env_non_empty("GOOGLE_VISION_API_KEY") {
            VisionAuth::ApiKey(key)
        } else if let Some(path) = env_non_empty("GOOGLE_APPLICATION_CREDENTIALS") {
            VisionAuth::ServiceAccount(PathBuf::from(path))
        } else {
            VisionAuth::Missing
        };

        Self {
            base_url: env_non_empty("VISION_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_VISION_URL.to_string()),
            auth,
            timeout: Duration::from_secs(parse_env_or(
                "VISION_TIMEOUT_SECS",
                DEFAULT_VISION_TIMEOUT_SECS,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_addr_and_filter() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 9000,
            log_level: "debug".to_string(),
            vision: VisionConfig {
                base_url: DEFAULT_VISION_URL.to_string(),
                auth: VisionAuth::Missing,
                timeout: Duration::from_secs(DEFAULT_VISION_TIMEOUT_SECS),
            },
        };

        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert_eq!(
            config.default_log_filter(),
            "ocr_extract_api=debug,tower_http=debug"
        );
    }

    #[test]
    fn test_parse_env_or_falls_back_on_garbage() {
        env::set_var("OCR_TEST_BAD_PORT", "not-a-port");
        assert_eq!(parse_env_or("OCR_TEST_BAD_PORT", 8080u16), 8080);
        env::set_var("OCR_TEST_BAD_PORT", "3001");
        assert_eq!(parse_env_or("OCR_TEST_BAD_PORT", 8080u16), 3001);
        env::remove_var("OCR_TEST_BAD_PORT");
        assert_eq!(parse_env_or("OCR_TEST_BAD_PORT", 8080u16), 8080);
    }

    #[test]
    fn test_env_non_empty_ignores_blank() {
        env::set_var("OCR_TEST_BLANK", "   ");
        assert_eq!(env_non_empty("OCR_TEST_BLANK"), None);
        env::set_var("OCR_TEST_BLANK", " value ");
        assert_eq!(env_non_empty("OCR_TEST_BLANK").as_deref(), Some("value"));
        env::remove_var("OCR_TEST_BLANK");
    }
}
