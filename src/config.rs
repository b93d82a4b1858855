use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use filehub_client::{types::API_URL_ENV, types::DEFAULT_API_URL, ClientConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub timeout_seconds: u64,
    pub download_dir: PathBuf,
    pub debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_seconds: 30,
            download_dir: PathBuf::from("."),
            debounce_ms: crate::search::DEFAULT_DEBOUNCE.as_millis() as u64,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api_url)
            .with_context(|| format!("api url '{}' is invalid", self.api_url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(anyhow::Error::msg(format!(
                "api url '{}' is invalid, scheme must be http or https",
                self.api_url
            )));
        }

        if self.timeout_seconds < 1 || self.timeout_seconds > 3600 {
            return Err(anyhow::Error::msg(format!(
                "timeout '{}' is invalid, must be between [1, 3600] seconds",
                self.timeout_seconds
            )));
        }

        if self.debounce_ms < 1 || self.debounce_ms > 10_000 {
            return Err(anyhow::Error::msg(format!(
                "debounce '{}' is invalid, must be between [1, 10000] ms",
                self.debounce_ms
            )));
        }

        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_url.clone(),
            timeout_seconds: self.timeout_seconds,
            download_dir: self.download_dir.clone(),
        }
    }

    fn override_url(&mut self, url: Option<String>) {
        if let Some(url) = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
            self.api_url = url;
        }
    }
}

/// Parse the config file into Config struct.
pub fn parse_config(filepath: &str) -> Result<Config> {
    let content = fs::read_to_string(filepath).context("failed to read config file")?;
    let c: Config = toml::from_str(&content).context("failed to convert toml config data")?;

    c.validate()?;
    Ok(c)
}

/// Resolve the effective configuration: defaults, then the config file, then
/// `FILEHUB_API_URL`, then the command line url.
pub fn load(filepath: Option<&str>, api_url: Option<String>) -> Result<Config> {
    resolve(filepath, std::env::var(API_URL_ENV).ok(), api_url)
}

fn resolve(filepath: Option<&str>, env_url: Option<String>, flag_url: Option<String>) -> Result<Config> {
    let mut config = match filepath {
        Some(path) => parse_config(path)?,
        None => Config::default(),
    };

    config.override_url(env_url);
    config.override_url(flag_url);
    config.validate()?;

    debug!("configuration: {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults() {
        let config = resolve(None, None, None).unwrap();
        assert_eq!(config.api_url, "http://localhost:8000/api");
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.client_config().timeout_seconds, 30);
    }

    #[test]
    fn file_values_and_partial_files() {
        let file = write_config(
            r#"
            api_url = "https://files.example.com/api"
            debounce_ms = 150
            "#,
        );
        let config = parse_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.api_url, "https://files.example.com/api");
        assert_eq!(config.debounce_ms, 150);
        // missing keys fall back to defaults
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.download_dir, PathBuf::from("."));
    }

    #[test]
    fn env_then_flag_override() {
        let file = write_config(r#"api_url = "http://from-file:8000/api""#);
        let path = file.path().to_str().unwrap();

        let config = resolve(Some(path), Some("http://from-env:8000/api".into()), None).unwrap();
        assert_eq!(config.api_url, "http://from-env:8000/api");

        let config = resolve(
            Some(path),
            Some("http://from-env:8000/api".into()),
            Some("http://from-flag:8000/api".into()),
        )
        .unwrap();
        assert_eq!(config.api_url, "http://from-flag:8000/api");

        // blank values are ignored
        let config = resolve(Some(path), Some("  ".into()), None).unwrap();
        assert_eq!(config.api_url, "http://from-file:8000/api");
    }

    #[test]
    fn invalid_values() {
        assert!(resolve(None, Some("ftp://nope".into()), None).is_err());
        assert!(resolve(None, None, Some("not a url".into())).is_err());

        let file = write_config("timeout_seconds = 0");
        assert!(parse_config(file.path().to_str().unwrap()).is_err());

        let file = write_config("debounce_ms = 20000");
        assert!(parse_config(file.path().to_str().unwrap()).is_err());

        let file = write_config("api_url = [1, 2]");
        assert!(parse_config(file.path().to_str().unwrap()).is_err());

        assert!(parse_config("/nonexistent/filehub.toml").is_err());
    }
}
