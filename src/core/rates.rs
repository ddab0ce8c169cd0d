//! Rate tables and the abstractions that produce and keep them.

use crate::core::currency::CurrencyCode;
use crate::core::error::{FxError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A snapshot of exchange rates relative to a single base currency.
///
/// `rates[X]` is the number of units of `X` bought by one unit of `base`.
/// The base itself may be omitted from `rates`; lookups treat it as `1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRateTable")]
pub struct RateTable {
    base: CurrencyCode,
    rates: BTreeMap<CurrencyCode, f64>,
    fetched_at: DateTime<Utc>,
}

/// Unchecked wire form; deserialized tables go through [`RateTable::new`].
#[derive(Deserialize)]
struct RawRateTable {
    base: CurrencyCode,
    rates: BTreeMap<CurrencyCode, f64>,
    fetched_at: DateTime<Utc>,
}

impl TryFrom<RawRateTable> for RateTable {
    type Error = FxError;

    fn try_from(raw: RawRateTable) -> Result<Self> {
        RateTable::new(raw.base, raw.rates, raw.fetched_at)
    }
}

impl RateTable {
    /// Builds a table, rejecting non-positive or non-finite rates and a base
    /// entry other than 1.
    pub fn new(
        base: CurrencyCode,
        rates: BTreeMap<CurrencyCode, f64>,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self> {
        if let Some((code, value)) = rates.iter().find(|(_, v)| !v.is_finite() || **v <= 0.0) {
            return Err(FxError::InvalidRateTable(format!(
                "rate for {code} must be positive and finite, got {value}"
            )));
        }
        if let Some(self_rate) = rates.get(&base) {
            if (*self_rate - 1.0).abs() > f64::EPSILON {
                return Err(FxError::InvalidRateTable(format!(
                    "base {base} must have a rate of 1, got {self_rate}"
                )));
            }
        }
        Ok(Self {
            base,
            rates,
            fetched_at,
        })
    }

    /// An empty table; every lookup between distinct currencies is unavailable.
    pub fn empty(base: CurrencyCode, fetched_at: DateTime<Utc>) -> Self {
        Self {
            base,
            rates: BTreeMap::new(),
            fetched_at,
        }
    }

    pub fn base(&self) -> &CurrencyCode {
        &self.base
    }

    pub fn rates(&self) -> &BTreeMap<CurrencyCode, f64> {
        &self.rates
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Rate of `code` against the base, with the base implicitly `1`.
    pub fn rate_of(&self, code: &CurrencyCode) -> Option<f64> {
        if code == &self.base {
            return Some(1.0);
        }
        self.rates.get(code).copied()
    }

    /// Sorted list of the currencies this table can convert between.
    pub fn available_currencies(&self) -> Vec<CurrencyCode> {
        let mut codes: Vec<CurrencyCode> = self.rates.keys().cloned().collect();
        if !self.rates.is_empty() && !self.rates.contains_key(&self.base) {
            codes.push(self.base.clone());
            codes.sort();
        }
        codes
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }

    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) > max_age
    }
}

/// Source of rate tables.
#[async_trait]
pub trait RateTableProvider: Send + Sync {
    async fn fetch(&self, base: &CurrencyCode) -> Result<RateTable>;

    fn name(&self) -> &str;
}

/// Keeps the last successfully fetched table per base so callers can fall
/// back to it when the provider is unreachable.
#[async_trait]
pub trait RateSnapshotStore: Send + Sync {
    async fn load_snapshot(&self, base: &CurrencyCode) -> Result<Option<RateTable>>;

    async fn save_snapshot(&self, table: &RateTable) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn code(s: &str) -> CurrencyCode {
        s.parse().unwrap()
    }

    pub(crate) fn table(base: &str, entries: &[(&str, f64)]) -> RateTable {
        let rates = entries.iter().map(|(c, r)| (code(c), *r)).collect();
        RateTable::new(code(base), rates, fixed_time()).unwrap()
    }

    pub(crate) fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_rejects_non_positive_rates() {
        let rates = BTreeMap::from([(code("USD"), 1.0), (code("EUR"), 0.0)]);
        let result = RateTable::new(code("USD"), rates, fixed_time());
        assert!(matches!(result, Err(FxError::InvalidRateTable(_))));

        let rates = BTreeMap::from([(code("EUR"), -0.5)]);
        assert!(RateTable::new(code("USD"), rates, fixed_time()).is_err());

        let rates = BTreeMap::from([(code("EUR"), f64::NAN)]);
        assert!(RateTable::new(code("USD"), rates, fixed_time()).is_err());

        let rates = BTreeMap::from([(code("EUR"), f64::INFINITY)]);
        assert!(RateTable::new(code("USD"), rates, fixed_time()).is_err());
    }

    #[test]
    fn test_rejects_base_rate_other_than_one() {
        let rates = BTreeMap::from([(code("USD"), 1.2), (code("EUR"), 0.9)]);
        let err = RateTable::new(code("USD"), rates, fixed_time()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid rate table: base USD must have a rate of 1, got 1.2"
        );
    }

    #[test]
    fn test_base_has_implicit_rate_of_one() {
        let t = table("USD", &[("EUR", 0.92)]);
        assert_eq!(t.rate_of(&code("USD")), Some(1.0));
        assert_eq!(t.rate_of(&code("EUR")), Some(0.92));
        assert_eq!(t.rate_of(&code("GBP")), None);
    }

    #[test]
    fn test_available_currencies_includes_base() {
        let t = table("USD", &[("GBP", 0.79), ("EUR", 0.92)]);
        let codes: Vec<String> = t
            .available_currencies()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(codes, vec!["EUR", "GBP", "USD"]);

        let empty = RateTable::empty(code("USD"), fixed_time());
        assert!(empty.available_currencies().is_empty());
    }

    #[test]
    fn test_deserialize_validates_rates() {
        let saved = table("USD", &[("USD", 1.0), ("EUR", 0.92)]);
        let json = serde_json::to_string(&saved).unwrap();
        assert_eq!(serde_json::from_str::<RateTable>(&json).unwrap(), saved);

        let corrupt = r#"{
            "base": "USD",
            "rates": {"USD": 2.0, "EUR": -0.5, "GBP": 0.0},
            "fetched_at": "2024-05-01T12:00:00Z"
        }"#;
        let err = serde_json::from_str::<RateTable>(corrupt).unwrap_err();
        assert!(err.to_string().contains("Invalid rate table"), "{err}");

        let wrong_base = r#"{
            "base": "USD",
            "rates": {"USD": 2.0, "EUR": 0.92},
            "fetched_at": "2024-05-01T12:00:00Z"
        }"#;
        assert!(serde_json::from_str::<RateTable>(wrong_base).is_err());
    }

    #[test]
    fn test_staleness_is_relative_to_given_time() {
        let t = table("USD", &[("EUR", 0.92)]);
        let later = fixed_time() + Duration::minutes(90);

        assert_eq!(t.age(later), Duration::minutes(90));
        assert!(t.is_stale(later, Duration::minutes(60)));
        assert!(!t.is_stale(later, Duration::minutes(120)));
        assert!(!t.is_stale(fixed_time(), Duration::zero()));
    }
}
