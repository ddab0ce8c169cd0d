use super::{rates, ui};
use crate::core::{ConversionRecord, CurrencyCode, FxError, Session};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use tracing::debug;

pub fn display_record(record: &ConversionRecord) -> String {
    format!(
        "{} {} = {} {}\n{}",
        ui::format_number(record.amount, 2),
        record.from,
        ui::style_text(&ui::format_number(record.result, 2), ui::StyleType::TotalValue),
        ui::style_text(record.to.as_str(), ui::StyleType::TotalLabel),
        ui::style_text(
            &format!(
                "1 {} = {} {}",
                record.from,
                ui::format_number(record.rate, 6),
                record.to
            ),
            ui::StyleType::Subtle
        )
    )
}

/// Converts the session's current params and optionally records the result.
pub async fn run(
    session: &mut Session,
    base: &CurrencyCode,
    stale_after: Duration,
    save: bool,
) -> Result<()> {
    let (table, _) = rates::refresh(session, base).await?;

    let now = Utc::now();
    let record = if save {
        session.convert(now)
    } else {
        session.preview(now).map_err(FxError::from)
    }?;

    println!("{}", display_record(&record));
    println!("{}", rates::freshness_line(Some(&table), now, stale_after));

    if save {
        session
            .ledger_mut()
            .persist()
            .await
            .context("Conversion shown but not saved to history")?;
        debug!("Conversion saved to history");
    }
    Ok(())
}
