//! Error taxonomy for the rate model and the ledger.

use crate::core::currency::CurrencyCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FxError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FxError {
    #[error("Rate source unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Base currency not supported by rate source: {0}")]
    InvalidBaseCurrency(CurrencyCode),

    #[error("Rate unavailable for {from} -> {to}")]
    RateUnavailable { from: CurrencyCode, to: CurrencyCode },

    #[error("Favorite {from} -> {to} already exists")]
    DuplicateFavorite { from: CurrencyCode, to: CurrencyCode },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Invalid currency code: '{0}'")]
    InvalidCurrencyCode(String),

    #[error("Invalid amount: {0} (must be a non-negative finite number)")]
    InvalidAmount(f64),

    #[error("Invalid rate table: {0}")]
    InvalidRateTable(String),
}

impl FxError {
    pub(crate) fn persistence(err: impl std::fmt::Display) -> Self {
        FxError::PersistenceFailure(err.to_string())
    }

    pub(crate) fn upstream(err: impl std::fmt::Display) -> Self {
        FxError::UpstreamUnavailable(err.to_string())
    }
}
