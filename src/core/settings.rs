use crate::core::models::Channel;
use crate::core::tokens::TokenStore;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://order-api-dev.thetigerteamacademy.net";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub upstream: UpstreamSettings,
    pub polling: PollingSettings,
    pub sheet: SheetSettings,
    pub storage: StorageSettings,
    pub server: ServerSettings,
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    pub base_url: String,
    /// Refresh token used when the token store is empty.
    pub seed_refresh_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            seed_refresh_token: None,
            timeout_secs: 30,
        }
    }
}

impl UpstreamSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    pub interval_secs: u64,
    pub lookback_days: u32,
    pub lead_days: u32,
    pub channel: Channel,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_secs: 3 * 60 * 60,
            lookback_days: 10,
            lead_days: 1,
            channel: Channel::Shopee,
        }
    }
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSettings {
    pub rows_per_page: usize,
    pub min_rows: usize,
}

impl Default for SheetSettings {
    fn default() -> Self {
        Self {
            rows_per_page: 20,
            min_rows: 21,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub token_path: Option<PathBuf>,
}

impl StorageSettings {
    pub fn resolved_token_path(&self) -> Option<PathBuf> {
        self.token_path.clone().or_else(TokenStore::default_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub enabled: bool,
    pub bind: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("order-sheet").join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path().context("Could not determine config directory")?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        settings.validate()?;

        tracing::info!(?path, "Loaded config");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let base_url = self.upstream.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            anyhow::bail!(
                "upstream.base_url must start with http:// or https://, got {:?}",
                self.upstream.base_url
            );
        }
        if self.upstream.timeout_secs == 0 {
            anyhow::bail!("upstream.timeout_secs must be greater than 0");
        }
        if self.polling.interval_secs == 0 {
            anyhow::bail!("polling.interval_secs must be greater than 0");
        }
        if self.sheet.rows_per_page == 0 {
            anyhow::bail!("sheet.rows_per_page must be greater than 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.upstream.base_url, DEFAULT_BASE_URL);
        assert!(settings.upstream.seed_refresh_token.is_none());
        assert_eq!(settings.upstream.timeout(), Duration::from_secs(30));
        assert_eq!(settings.polling.interval(), Duration::from_secs(10_800));
        assert_eq!(settings.polling.lookback_days, 10);
        assert_eq!(settings.polling.lead_days, 1);
        assert_eq!(settings.polling.channel, Channel::Shopee);
        assert_eq!(settings.sheet.rows_per_page, 20);
        assert_eq!(settings.sheet.min_rows, 21);
        assert!(!settings.server.enabled);
        assert!(!settings.debug);
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());

        settings.upstream.base_url = "ftp://example.com".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.polling.interval_secs = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.sheet.rows_per_page = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.upstream.timeout_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            debug = true

            [upstream]
            base_url = "http://localhost:9000"
            seed_refresh_token = "5766544f464b6c62"
            timeout_secs = 5

            [polling]
            interval_secs = 600
            lookback_days = 7
            channel = "tiktok"

            [sheet]
            rows_per_page = 10

            [storage]
            token_path = "/var/lib/order-sheet/tokens.json"

            [server]
            enabled = true
            bind = "0.0.0.0:8080"
        "#;

        let settings: Settings = toml::from_str(toml).unwrap();
        assert!(settings.debug);
        assert_eq!(settings.upstream.base_url, "http://localhost:9000");
        assert_eq!(
            settings.upstream.seed_refresh_token.as_deref(),
            Some("5766544f464b6c62")
        );
        assert_eq!(settings.upstream.timeout_secs, 5);
        assert_eq!(settings.polling.interval_secs, 600);
        assert_eq!(settings.polling.lookback_days, 7);
        assert_eq!(settings.polling.lead_days, 1);
        assert_eq!(settings.polling.channel, Channel::TikTok);
        assert_eq!(settings.sheet.rows_per_page, 10);
        assert_eq!(settings.sheet.min_rows, 21);
        assert_eq!(
            settings.storage.resolved_token_path(),
            Some(PathBuf::from("/var/lib/order-sheet/tokens.json"))
        );
        assert!(settings.server.enabled);
        assert_eq!(settings.server.bind.port(), 8080);
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings.polling.channel, Channel::Shopee);
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[polling]\ninterval_secs = 0\n").unwrap();

        assert!(Settings::load_from(&path).is_err());
    }
}
