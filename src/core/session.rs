//! The conversion session: everything a front end needs to refresh rates,
//! convert, and record history, wired together from injected collaborators.

use crate::core::conversion::{ConversionParams, ConversionRecord, ParamsUpdate, RateUnavailable};
use crate::core::currency::CurrencyCode;
use crate::core::error::{FxError, Result};
use crate::core::ledger::Ledger;
use crate::core::rates::{RateSnapshotStore, RateTable, RateTableProvider};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct Session {
    provider: Arc<dyn RateTableProvider>,
    snapshots: Option<Arc<dyn RateSnapshotStore>>,
    table: Option<Arc<RateTable>>,
    ledger: Ledger,
    params: ConversionParams,
}

impl Session {
    pub fn new(provider: Arc<dyn RateTableProvider>, ledger: Ledger) -> Self {
        Self {
            provider,
            snapshots: None,
            table: None,
            ledger,
            params: ConversionParams::default(),
        }
    }

    pub fn with_snapshots(mut self, snapshots: Arc<dyn RateSnapshotStore>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn with_params(mut self, params: ConversionParams) -> Self {
        self.params = params;
        self
    }

    /// Fetches a new table for `base` and makes it current. On failure the
    /// previously held table stays current.
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn refresh(&mut self, base: &CurrencyCode) -> Result<Arc<RateTable>> {
        let table = Arc::new(self.provider.fetch(base).await?);
        info!(
            base = %table.base(),
            currencies = table.rates().len(),
            "Refreshed rate table"
        );
        if let Some(snapshots) = &self.snapshots {
            // Not fatal: the fresh table is still used.
            if let Err(e) = snapshots.save_snapshot(&table).await {
                warn!(error = %e, "Failed to save rate snapshot");
            }
        }
        self.table = Some(Arc::clone(&table));
        Ok(table)
    }

    /// Makes the last saved snapshot for `base` current, if there is one.
    pub async fn restore_snapshot(
        &mut self,
        base: &CurrencyCode,
    ) -> Result<Option<Arc<RateTable>>> {
        let Some(snapshots) = &self.snapshots else {
            return Ok(None);
        };
        let restored = snapshots.load_snapshot(base).await?.map(Arc::new);
        if let Some(table) = &restored {
            debug!(fetched_at = %table.fetched_at(), "Restored rate snapshot");
            self.table = Some(Arc::clone(table));
        }
        Ok(restored)
    }

    /// Refreshes, falling back to the saved snapshot when the provider is
    /// unreachable. The returned flag is `true` when the snapshot was used.
    pub async fn refresh_or_restore(
        &mut self,
        base: &CurrencyCode,
    ) -> Result<(Arc<RateTable>, bool)> {
        match self.refresh(base).await {
            Ok(table) => Ok((table, false)),
            Err(FxError::UpstreamUnavailable(reason)) => {
                warn!(%reason, "Rate source unavailable, trying saved snapshot");
                match self.restore_snapshot(base).await? {
                    Some(table) => Ok((table, true)),
                    None => Err(FxError::UpstreamUnavailable(reason)),
                }
            }
            Err(e) => Err(e),
        }
    }

    pub fn current_table(&self) -> Option<Arc<RateTable>> {
        self.table.clone()
    }

    pub fn params(&self) -> &ConversionParams {
        &self.params
    }

    pub fn update_params(&mut self, update: ParamsUpdate) -> Result<()> {
        self.params.apply(update)
    }

    /// Rate for `from -> to` against the current table.
    pub fn rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> std::result::Result<f64, RateUnavailable> {
        match &self.table {
            Some(table) => crate::core::conversion::rate(table, from, to),
            None if from == to => Ok(1.0),
            None => Err(RateUnavailable {
                from: from.clone(),
                to: to.clone(),
            }),
        }
    }

    /// Converts the current params against the current table without
    /// recording anything.
    pub fn preview(
        &self,
        at: DateTime<Utc>,
    ) -> std::result::Result<ConversionRecord, RateUnavailable> {
        match &self.table {
            Some(table) => self.params.evaluate(table, at),
            None => {
                let empty = RateTable::empty(self.params.from.clone(), at);
                self.params.evaluate(&empty, at)
            }
        }
    }

    /// Converts the current params and appends the result to the history.
    pub fn convert(&mut self, at: DateTime<Utc>) -> Result<ConversionRecord> {
        let record = self.preview(at)?;
        self.ledger.append(record.clone());
        Ok(record)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rates::tests::{code, fixed_time};
    use crate::providers::fixture::FixtureRateTableProvider;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves the fixture on the first call and fails afterwards.
    struct FlakyProvider {
        inner: FixtureRateTableProvider,
        calls: AtomicUsize,
        error: FxError,
    }

    #[async_trait]
    impl RateTableProvider for FlakyProvider {
        async fn fetch(&self, base: &CurrencyCode) -> Result<RateTable> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.inner.fetch(base).await
            } else {
                Err(self.error.clone())
            }
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn flaky(error: FxError) -> Arc<FlakyProvider> {
        Arc::new(FlakyProvider {
            inner: FixtureRateTableProvider::with_timestamp(fixed_time()),
            calls: AtomicUsize::new(0),
            error,
        })
    }

    fn session(provider: Arc<dyn RateTableProvider>, store: Arc<MemoryStore>) -> Session {
        let ledger = Ledger::new(store.clone(), Some(100));
        Session::new(provider, ledger).with_snapshots(store)
    }

    #[tokio::test]
    async fn test_convert_without_table_is_unavailable() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session(flaky(FxError::upstream("down")), store);

        let result = session.convert(fixed_time());
        assert_eq!(
            result,
            Err(FxError::RateUnavailable {
                from: code("EUR"),
                to: code("USD")
            })
        );
        assert!(session.ledger().list().is_empty());
        assert_eq!(session.rate(&code("GBP"), &code("GBP")), Ok(1.0));
    }

    #[tokio::test]
    async fn test_refresh_then_convert_records_history() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session(flaky(FxError::upstream("down")), store);

        session.refresh(&code("EUR")).await.unwrap();
        session
            .update_params(ParamsUpdate {
                amount: Some(10.0),
                ..Default::default()
            })
            .unwrap();
        let record = session.convert(fixed_time()).unwrap();

        assert_eq!(record.from, code("EUR"));
        assert_eq!(record.to, code("USD"));
        assert!((record.result - 10.8).abs() < 1e-9);
        assert_eq!(session.ledger().list(), &[record]);
        assert!(session.ledger().has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_table() {
        let store = Arc::new(MemoryStore::new());
        let provider = flaky(FxError::InvalidBaseCurrency(code("XXX")));
        let mut session = session(provider, store);

        let first = session.refresh(&code("EUR")).await.unwrap();
        let err = session.refresh(&code("XXX")).await.unwrap_err();
        assert_eq!(err, FxError::InvalidBaseCurrency(code("XXX")));

        let current = session.current_table().unwrap();
        assert!(Arc::ptr_eq(&first, &current));
    }

    #[tokio::test]
    async fn test_refresh_or_restore_uses_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session(flaky(FxError::upstream("timeout")), store.clone());
        let saved = session.refresh(&code("EUR")).await.unwrap();

        // A new session with an empty in-memory table, as on the next run.
        let mut next = self::session(flaky(FxError::upstream("timeout")), store);
        next.refresh(&code("USD")).await.unwrap();
        let (table, from_snapshot) = next.refresh_or_restore(&code("EUR")).await.unwrap();
        assert!(from_snapshot);
        assert_eq!(*table, *saved);

        let missing = next.refresh_or_restore(&code("JPY")).await;
        assert_eq!(missing, Err(FxError::upstream("timeout")));
    }

    #[tokio::test]
    async fn test_refresh_or_restore_does_not_mask_invalid_base() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session(flaky(FxError::InvalidBaseCurrency(code("EUR"))), store);
        session.refresh(&code("EUR")).await.unwrap();

        let result = session.refresh_or_restore(&code("EUR")).await;
        assert_eq!(result, Err(FxError::InvalidBaseCurrency(code("EUR"))));
    }
}
