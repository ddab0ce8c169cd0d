//! A fixed demo rate table, for offline use and tests.

use crate::core::currency::CurrencyCode;
use crate::core::error::{FxError, Result};
use crate::core::rates::{RateTable, RateTableProvider};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

const FIXTURE_BASE: &str = "EUR";

/// Rates per 1 EUR.
const FIXTURE_RATES: &[(&str, f64)] = &[
    ("EUR", 1.0),
    ("USD", 1.08),
    ("GBP", 0.86),
    ("JPY", 161.12),
    ("CAD", 1.47),
    ("AUD", 1.64),
    ("CHF", 0.97),
    ("CNY", 7.86),
    ("MXN", 19.87),
    ("BRL", 5.45),
    ("ARS", 947.5),
    ("COP", 4234.15),
    ("CLP", 978.42),
    ("PEN", 4.07),
];

/// Serves a hardcoded table, re-expressed against whichever base is asked for.
pub struct FixtureRateTableProvider {
    fixed_at: Option<DateTime<Utc>>,
}

impl FixtureRateTableProvider {
    /// Tables are stamped with the time of each fetch.
    pub fn new() -> Self {
        Self { fixed_at: None }
    }

    /// Tables are always stamped with `at`.
    pub fn with_timestamp(at: DateTime<Utc>) -> Self {
        Self { fixed_at: Some(at) }
    }
}

impl Default for FixtureRateTableProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateTableProvider for FixtureRateTableProvider {
    async fn fetch(&self, base: &CurrencyCode) -> Result<RateTable> {
        let base_rate = FIXTURE_RATES
            .iter()
            .find(|(c, _)| *c == base.as_str())
            .map(|(_, r)| *r)
            .ok_or_else(|| FxError::InvalidBaseCurrency(base.clone()))?;

        let rates: BTreeMap<CurrencyCode, f64> = FIXTURE_RATES
            .iter()
            .map(|(c, r)| {
                let rate = if *c == base.as_str() { 1.0 } else { r / base_rate };
                (CurrencyCode::from_static(*c), rate)
            })
            .collect();
        debug!(%base, fixture_base = FIXTURE_BASE, "Serving fixture rates");

        RateTable::new(base.clone(), rates, self.fixed_at.unwrap_or_else(Utc::now))
    }

    fn name(&self) -> &str {
        "fixture"
    }
}
