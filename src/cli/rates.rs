use super::ui;
use crate::core::{CurrencyCode, RateTable, Session};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use comfy_table::Cell;
use std::sync::Arc;

/// Refreshes the rate table for `base`, falling back to the saved snapshot
/// when the rate source is unreachable.
pub async fn refresh(
    session: &mut Session,
    base: &CurrencyCode,
) -> Result<(Arc<RateTable>, bool)> {
    let pb = ui::new_spinner(&format!("Fetching {base} rates..."));
    let result = session.refresh_or_restore(base).await;
    pb.finish_and_clear();

    let (table, from_snapshot) = result?;
    if from_snapshot {
        eprintln!(
            "{}",
            ui::style_text(
                &format!(
                    "Rate source unavailable, using saved rates from {}",
                    ui::format_timestamp(Some(table.fetched_at()))
                ),
                ui::StyleType::Warning
            )
        );
    }
    Ok((table, from_snapshot))
}

/// Status line describing when `table` was fetched and whether it is stale.
pub fn freshness_line(
    table: Option<&RateTable>,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> String {
    let Some(table) = table else {
        return format!("Last update: {}", ui::format_timestamp(None));
    };
    let updated = ui::format_timestamp(Some(table.fetched_at()));
    let age = ui::format_age(table.age(now));
    if table.is_stale(now, stale_after) {
        format!(
            "Last update: {updated} ({})",
            ui::style_text(&format!("stale, {age} old"), ui::StyleType::Warning)
        )
    } else {
        format!(
            "Last update: {updated} {}",
            ui::style_text(&format!("({age} ago)"), ui::StyleType::Subtle)
        )
    }
}

pub fn display_table(table: &RateTable, now: DateTime<Utc>, stale_after: Duration) -> String {
    let mut rates_table = ui::new_styled_table();
    rates_table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell(&format!("Per 1 {}", table.base())),
        ui::header_cell(&format!("In {}", table.base())),
    ]);

    for code in table.available_currencies() {
        if let Some(rate) = table.rate_of(&code) {
            rates_table.add_row(vec![
                Cell::new(code.as_str()),
                ui::number_cell(rate, 4),
                ui::number_cell(1.0 / rate, 6),
            ]);
        }
    }

    let mut output = format!(
        "Rates: {}\n\n",
        ui::style_text(table.base().as_str(), ui::StyleType::Title)
    );
    if table.is_empty() {
        output.push_str(&ui::style_text("No rates available", ui::StyleType::Error));
    } else {
        output.push_str(&rates_table.to_string());
    }
    output.push_str("\n\n");
    output.push_str(&freshness_line(Some(table), now, stale_after));
    output
}

pub async fn run(session: &mut Session, base: &CurrencyCode, stale_after: Duration) -> Result<()> {
    let (table, _) = refresh(session, base).await?;
    println!("{}", display_table(&table, Utc::now(), stale_after));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn code(s: &str) -> CurrencyCode {
        s.parse().unwrap()
    }

    fn sample(fetched_at: DateTime<Utc>) -> RateTable {
        let rates = BTreeMap::from([(code("EUR"), 0.92), (code("GBP"), 0.79)]);
        RateTable::new(code("USD"), rates, fetched_at).unwrap()
    }

    #[test]
    fn test_display_lists_every_currency() {
        console::set_colors_enabled(false);
        let now = Utc::now();
        let output = display_table(&sample(now), now, Duration::minutes(60));

        assert!(output.contains("Rates: USD"));
        assert!(output.contains("Per 1 USD"));
        for c in ["EUR", "GBP", "USD"] {
            assert!(output.contains(c), "missing {c}");
        }
        assert!(output.contains("0.9200"));
        assert!(output.contains("1.000000"));
        assert!(!output.contains("stale"));
    }

    #[test]
    fn test_freshness_line_marks_stale_tables() {
        console::set_colors_enabled(false);
        let now = Utc::now();
        let old = sample(now - Duration::hours(3));

        let line = freshness_line(Some(&old), now, Duration::minutes(60));
        assert!(line.contains("stale, 3h 0m old"), "{line}");

        assert_eq!(
            freshness_line(None, now, Duration::minutes(60)),
            "Last update: Never"
        );
    }

    #[test]
    fn test_display_empty_table() {
        console::set_colors_enabled(false);
        let now = Utc::now();
        let empty = RateTable::empty(code("USD"), now);
        let output = display_table(&empty, now, Duration::minutes(60));
        assert!(output.contains("No rates available"));
    }
}
