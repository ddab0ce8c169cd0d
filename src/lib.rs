pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::favorites::FavoritesAction;
use crate::core::config::AppConfig;
use crate::core::{CurrencyCode, FxError, Ledger, ParamsUpdate, Session};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Rates {
        base: Option<CurrencyCode>,
    },
    Convert {
        amount: Option<f64>,
        from: Option<CurrencyCode>,
        to: Option<CurrencyCode>,
        favorite: Option<String>,
        save: bool,
    },
    History {
        limit: Option<usize>,
        clear: bool,
    },
    Favorites(FavoritesAction),
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("cambio starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let data_path = config.data_path()?;
    let store = Arc::new(
        store::DiskStore::open(&data_path)
            .with_context(|| format!("Failed to open data store at {}", data_path.display()))?,
    );
    let ledger = Ledger::load(store.clone(), Some(config.history_limit))
        .await
        .context("Failed to load history and favorites")?;

    match command {
        AppCommand::Rates { base } => {
            let mut session = Session::new(providers::from_config(&config)?, ledger)
                .with_snapshots(store);
            let base = base.unwrap_or_else(|| config.base_currency.clone());
            cli::rates::run(&mut session, &base, config.stale_after()?).await
        }
        AppCommand::Convert {
            amount,
            from,
            to,
            favorite,
            save,
        } => {
            let mut session = Session::new(providers::from_config(&config)?, ledger)
                .with_snapshots(store)
                .with_params(config.default_params()?);

            if let Some(id) = favorite {
                let pair = session
                    .ledger()
                    .find_favorite(&id)
                    .ok_or_else(|| FxError::NotFound(format!("favorite '{id}'")))?
                    .clone();
                session.update_params(ParamsUpdate {
                    from: Some(pair.from),
                    to: Some(pair.to),
                    amount: None,
                })?;
            }
            session.update_params(ParamsUpdate { from, to, amount })?;

            cli::convert::run(
                &mut session,
                &config.base_currency,
                config.stale_after()?,
                save,
            )
            .await
        }
        AppCommand::History { limit, clear } => {
            let mut ledger = ledger;
            cli::history::run(&mut ledger, limit, clear).await
        }
        AppCommand::Favorites(action) => {
            let mut ledger = ledger;
            cli::favorites::run(&mut ledger, action).await
        }
    }
}
