use crate::core::conversion::ConversionRecord;
use crate::core::currency::CurrencyCode;
use crate::core::error::{FxError, Result};
use crate::core::ledger::{FavoritePair, LedgerStore};
use crate::core::rates::{RateSnapshotStore, RateTable};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct Contents {
    history: Vec<ConversionRecord>,
    favorites: Vec<FavoritePair>,
    snapshots: HashMap<CurrencyCode, RateTable>,
}

/// In-memory store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Contents>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent save fail until turned off again.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(FxError::persistence("memory store is read-only"));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn load_history(&self) -> Result<Vec<ConversionRecord>> {
        Ok(self.inner.lock().await.history.clone())
    }

    async fn save_history(&self, history: &[ConversionRecord]) -> Result<()> {
        self.check_writable()?;
        self.inner.lock().await.history = history.to_vec();
        debug!(entries = history.len(), "Saved history");
        Ok(())
    }

    async fn load_favorites(&self) -> Result<Vec<FavoritePair>> {
        Ok(self.inner.lock().await.favorites.clone())
    }

    async fn save_favorites(&self, favorites: &[FavoritePair]) -> Result<()> {
        self.check_writable()?;
        self.inner.lock().await.favorites = favorites.to_vec();
        debug!(entries = favorites.len(), "Saved favorites");
        Ok(())
    }
}

#[async_trait]
impl RateSnapshotStore for MemoryStore {
    async fn load_snapshot(&self, base: &CurrencyCode) -> Result<Option<RateTable>> {
        Ok(self.inner.lock().await.snapshots.get(base).cloned())
    }

    async fn save_snapshot(&self, table: &RateTable) -> Result<()> {
        self.check_writable()?;
        self.inner
            .lock()
            .await
            .snapshots
            .insert(table.base().clone(), table.clone());
        Ok(())
    }
}
