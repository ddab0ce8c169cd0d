use crate::core::conversion::ConversionRecord;
use crate::core::currency::CurrencyCode;
use crate::core::error::{FxError, Result};
use crate::core::ledger::{FavoritePair, LedgerStore};
use crate::core::rates::{RateSnapshotStore, RateTable};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use tracing::debug;

const LEDGER_PARTITION: &str = "ledger";
const RATES_PARTITION: &str = "rates";
const HISTORY_KEY: &str = "history";
const FAVORITES_KEY: &str = "favorites";

/// Ledger and rate snapshots in a fjall keyspace. Values are JSON.
pub struct DiskStore {
    keyspace: Keyspace,
    ledger: PartitionHandle,
    rates: PartitionHandle,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path).map_err(FxError::persistence)?;
        let keyspace = fjall::Config::new(path)
            .open()
            .map_err(FxError::persistence)?;
        let ledger = keyspace
            .open_partition(LEDGER_PARTITION, PartitionCreateOptions::default())
            .map_err(FxError::persistence)?;
        let rates = keyspace
            .open_partition(RATES_PARTITION, PartitionCreateOptions::default())
            .map_err(FxError::persistence)?;
        debug!("Opened store at {}", path.display());
        Ok(Self {
            keyspace,
            ledger,
            rates,
        })
    }

    fn read<V: DeserializeOwned>(partition: &PartitionHandle, key: &str) -> Result<Option<V>> {
        match partition.get(key).map_err(FxError::persistence)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(FxError::persistence),
            None => Ok(None),
        }
    }

    fn write<V: Serialize + ?Sized>(
        &self,
        partition: &PartitionHandle,
        key: &str,
        value: &V,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(value).map_err(FxError::persistence)?;
        partition.insert(key, bytes).map_err(FxError::persistence)?;
        self.keyspace
            .persist(PersistMode::SyncAll)
            .map_err(FxError::persistence)
    }
}

#[async_trait]
impl LedgerStore for DiskStore {
    async fn load_history(&self) -> Result<Vec<ConversionRecord>> {
        Ok(Self::read(&self.ledger, HISTORY_KEY)?.unwrap_or_default())
    }

    async fn save_history(&self, history: &[ConversionRecord]) -> Result<()> {
        self.write(&self.ledger, HISTORY_KEY, history)?;
        debug!(entries = history.len(), "Saved history");
        Ok(())
    }

    async fn load_favorites(&self) -> Result<Vec<FavoritePair>> {
        Ok(Self::read(&self.ledger, FAVORITES_KEY)?.unwrap_or_default())
    }

    async fn save_favorites(&self, favorites: &[FavoritePair]) -> Result<()> {
        self.write(&self.ledger, FAVORITES_KEY, favorites)?;
        debug!(entries = favorites.len(), "Saved favorites");
        Ok(())
    }
}

#[async_trait]
impl RateSnapshotStore for DiskStore {
    async fn load_snapshot(&self, base: &CurrencyCode) -> Result<Option<RateTable>> {
        let snapshot: Option<RateTable> = Self::read(&self.rates, base.as_str())?;
        match snapshot {
            Some(table) if table.base() != base => Err(FxError::PersistenceFailure(format!(
                "snapshot stored for {base} has base {}",
                table.base()
            ))),
            snapshot => Ok(snapshot),
        }
    }

    async fn save_snapshot(&self, table: &RateTable) -> Result<()> {
        self.write(&self.rates, table.base().as_str(), table)?;
        debug!(base = %table.base(), "Saved rate snapshot");
        Ok(())
    }
}
