//! Conversion history and favorite currency pairs.
//!
//! Mutations apply to the in-memory view immediately and mark the touched
//! collection dirty. [`Ledger::persist`] writes dirty collections through the
//! [`LedgerStore`]; a failed write keeps both the in-memory state and the
//! dirty mark so the caller can retry.

use crate::core::conversion::ConversionRecord;
use crate::core::currency::CurrencyCode;
use crate::core::error::{FxError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoritePair {
    pub id: String,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub created_at: DateTime<Utc>,
}

/// Backing storage for a [`Ledger`].
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn load_history(&self) -> Result<Vec<ConversionRecord>>;
    async fn save_history(&self, history: &[ConversionRecord]) -> Result<()>;
    async fn load_favorites(&self) -> Result<Vec<FavoritePair>>;
    async fn save_favorites(&self, favorites: &[FavoritePair]) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Dirty {
    history: bool,
    favorites: bool,
}

pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    history: Vec<ConversionRecord>,
    favorites: Vec<FavoritePair>,
    limit: Option<usize>,
    dirty: Dirty,
}

impl Ledger {
    /// An empty ledger that has not read anything from `store`.
    pub fn new(store: Arc<dyn LedgerStore>, limit: Option<usize>) -> Self {
        Self {
            store,
            history: Vec::new(),
            favorites: Vec::new(),
            limit,
            dirty: Dirty::default(),
        }
    }

    pub async fn load(store: Arc<dyn LedgerStore>, limit: Option<usize>) -> Result<Self> {
        let mut history = store.load_history().await?;
        let favorites = store.load_favorites().await?;
        if let Some(limit) = limit {
            history.truncate(limit);
        }
        debug!(
            history = history.len(),
            favorites = favorites.len(),
            "Loaded ledger"
        );
        Ok(Self {
            store,
            history,
            favorites,
            limit,
            dirty: Dirty::default(),
        })
    }

    /// Adds `record` as the most recent entry, dropping the oldest entries
    /// beyond the history limit.
    pub fn append(&mut self, record: ConversionRecord) {
        self.history.insert(0, record);
        if let Some(limit) = self.limit {
            self.history.truncate(limit);
        }
        self.dirty.history = true;
    }

    /// History, most recent first.
    pub fn list(&self) -> &[ConversionRecord] {
        &self.history
    }

    pub fn recent(&self, count: usize) -> &[ConversionRecord] {
        &self.history[..count.min(self.history.len())]
    }

    pub fn clear_history(&mut self) {
        if !self.history.is_empty() {
            self.history.clear();
            self.dirty.history = true;
        }
    }

    pub fn favorites(&self) -> &[FavoritePair] {
        &self.favorites
    }

    pub fn find_favorite(&self, id: &str) -> Option<&FavoritePair> {
        self.favorites.iter().find(|f| f.id == id)
    }

    /// Saves `from -> to` as a favorite. The direction matters: `USD -> EUR`
    /// and `EUR -> USD` are different favorites.
    pub fn add_favorite(
        &mut self,
        from: CurrencyCode,
        to: CurrencyCode,
        at: DateTime<Utc>,
    ) -> Result<FavoritePair> {
        if self.favorites.iter().any(|f| f.from == from && f.to == to) {
            return Err(FxError::DuplicateFavorite { from, to });
        }
        let favorite = FavoritePair {
            id: Uuid::new_v4().to_string(),
            from,
            to,
            created_at: at,
        };
        self.favorites.push(favorite.clone());
        self.dirty.favorites = true;
        Ok(favorite)
    }

    pub fn remove_favorite(&mut self, id: &str) -> Result<FavoritePair> {
        let index = self
            .favorites
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| FxError::NotFound(format!("favorite '{id}'")))?;
        self.dirty.favorites = true;
        Ok(self.favorites.remove(index))
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty.history || self.dirty.favorites
    }

    /// Writes every dirty collection to the store.
    pub async fn persist(&mut self) -> Result<()> {
        if self.dirty.history {
            if let Err(e) = self.store.save_history(&self.history).await {
                warn!(error = %e, "Failed to save history");
                return Err(e);
            }
            self.dirty.history = false;
        }
        if self.dirty.favorites {
            if let Err(e) = self.store.save_favorites(&self.favorites).await {
                warn!(error = %e, "Failed to save favorites");
                return Err(e);
            }
            self.dirty.favorites = false;
        }
        Ok(())
    }
}
