//! Core rate model, conversion and ledger

pub mod config;
pub mod conversion;
pub mod currency;
pub mod error;
pub mod ledger;
pub mod log;
pub mod rates;
pub mod session;

// Re-export main types for cleaner imports
pub use conversion::{ConversionParams, ConversionRecord, ParamsUpdate, RateUnavailable};
pub use currency::CurrencyCode;
pub use error::FxError;
pub use ledger::{FavoritePair, Ledger, LedgerStore};
pub use rates::{RateSnapshotStore, RateTable, RateTableProvider};
pub use session::Session;
