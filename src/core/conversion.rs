//! Pairwise rates and conversions over a [`RateTable`].
//!
//! Every rate in a table is relative to the table's base, so the rate from
//! `A` to `B` is `rates[B] / rates[A]` with the base counting as `1`. These
//! functions are pure: the same table and inputs always give the same answer.

use crate::core::currency::CurrencyCode;
use crate::core::error::FxError;
use crate::core::rates::RateTable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Returned when a pair cannot be priced from the table at hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateUnavailable {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

impl Display for RateUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rate unavailable for {} -> {}", self.from, self.to)
    }
}

impl From<RateUnavailable> for FxError {
    fn from(err: RateUnavailable) -> Self {
        FxError::RateUnavailable {
            from: err.from,
            to: err.to,
        }
    }
}

/// Units of `to` bought by one unit of `from`.
pub fn rate(
    table: &RateTable,
    from: &CurrencyCode,
    to: &CurrencyCode,
) -> Result<f64, RateUnavailable> {
    if from == to {
        return Ok(1.0);
    }
    let unavailable = || RateUnavailable {
        from: from.clone(),
        to: to.clone(),
    };
    if table.is_empty() {
        return Err(unavailable());
    }
    match (table.rate_of(from), table.rate_of(to)) {
        (Some(from_rate), Some(to_rate)) => Ok(to_rate / from_rate),
        _ => Err(unavailable()),
    }
}

pub fn convert(
    table: &RateTable,
    from: &CurrencyCode,
    to: &CurrencyCode,
    amount: f64,
) -> Result<f64, RateUnavailable> {
    rate(table, from, to).map(|r| amount * r)
}

/// What the user wants converted next.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionParams {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    amount: f64,
}

impl ConversionParams {
    pub fn new(from: CurrencyCode, to: CurrencyCode, amount: f64) -> Result<Self, FxError> {
        Ok(Self {
            from,
            to,
            amount: validate_amount(amount)?,
        })
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Merges the fields present in `update`, leaving the rest untouched.
    /// Nothing changes if the new amount is invalid.
    pub fn apply(&mut self, update: ParamsUpdate) -> Result<(), FxError> {
        let amount = match update.amount {
            Some(amount) => validate_amount(amount)?,
            None => self.amount,
        };
        if let Some(from) = update.from {
            self.from = from;
        }
        if let Some(to) = update.to {
            self.to = to;
        }
        self.amount = amount;
        Ok(())
    }

    pub fn swapped(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
            amount: self.amount,
        }
    }

    /// Converts against `table`, stamping the record with `at`.
    pub fn evaluate(
        &self,
        table: &RateTable,
        at: DateTime<Utc>,
    ) -> Result<ConversionRecord, RateUnavailable> {
        let pair_rate = rate(table, &self.from, &self.to)?;
        Ok(ConversionRecord {
            from: self.from.clone(),
            to: self.to.clone(),
            amount: self.amount,
            result: self.amount * pair_rate,
            rate: pair_rate,
            timestamp: at,
        })
    }
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            from: CurrencyCode::from_static("EUR"),
            to: CurrencyCode::from_static("USD"),
            amount: 1.0,
        }
    }
}

fn validate_amount(amount: f64) -> Result<f64, FxError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(FxError::InvalidAmount(amount))
    }
}

/// A partial change to [`ConversionParams`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamsUpdate {
    pub from: Option<CurrencyCode>,
    pub to: Option<CurrencyCode>,
    pub amount: Option<f64>,
}

/// A completed conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub amount: f64,
    pub result: f64,
    pub rate: f64,
    pub timestamp: DateTime<Utc>,
}
