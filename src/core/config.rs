use crate::core::conversion::ConversionParams;
use crate::core::currency::CurrencyCode;
use crate::core::ledger::DEFAULT_HISTORY_LIMIT;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    ExchangeRate,
    Fixture,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ExchangeRateProviderConfig {
    fn default() -> Self {
        ExchangeRateProviderConfig {
            base_url: "https://api.exchangerate-api.com".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub exchangerate: ExchangeRateProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DefaultsConfig {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub amount: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        let params = ConversionParams::default();
        DefaultsConfig {
            from: params.from.clone(),
            to: params.to.clone(),
            amount: params.amount(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_base_currency")]
    pub base_currency: CurrencyCode,
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_stale_after_minutes")]
    pub stale_after_minutes: i64,
    pub data_path: Option<String>,
}

fn default_base_currency() -> CurrencyCode {
    CurrencyCode::from_static("USD")
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_stale_after_minutes() -> i64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            base_currency: default_base_currency(),
            provider: ProviderKind::default(),
            providers: ProvidersConfig::default(),
            defaults: DefaultsConfig::default(),
            history_limit: default_history_limit(),
            stale_after_minutes: default_stale_after_minutes(),
            data_path: None,
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, or defaults if there is
    /// no config file yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "cambio", "cambio")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "cambio", "cambio")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn default_params(&self) -> Result<ConversionParams> {
        ConversionParams::new(
            self.defaults.from.clone(),
            self.defaults.to.clone(),
            self.defaults.amount,
        )
        .context("Invalid conversion defaults in config")
    }

    pub fn stale_after(&self) -> Result<chrono::Duration> {
        chrono::Duration::try_minutes(self.stale_after_minutes).with_context(|| {
            format!(
                "stale_after_minutes is out of range: {}",
                self.stale_after_minutes
            )
        })
    }

    /// Checks values serde cannot: a history cap of at least one entry and a
    /// representable staleness window.
    pub fn validate(&self) -> Result<()> {
        if self.history_limit == 0 {
            anyhow::bail!("history_limit must be at least 1");
        }
        self.stale_after()?;
        Ok(())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
