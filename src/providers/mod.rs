pub mod exchangerate_api;
pub mod fixture;
pub mod util;

use crate::core::config::{AppConfig, ProviderKind};
use crate::core::rates::RateTableProvider;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Builds the rate provider selected in `config`.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn RateTableProvider>> {
    let provider: Arc<dyn RateTableProvider> = match config.provider {
        ProviderKind::ExchangeRate => {
            let settings = &config.providers.exchangerate;
            Arc::new(
                exchangerate_api::ExchangeRateApiProvider::new(
                    &settings.base_url,
                    settings.api_key.as_deref(),
                )
                .context("Failed to create exchange rate client")?,
            )
        }
        ProviderKind::Fixture => Arc::new(fixture::FixtureRateTableProvider::new()),
    };
    Ok(provider)
}
