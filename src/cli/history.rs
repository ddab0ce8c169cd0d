use super::ui;
use crate::core::{ConversionRecord, Ledger};
use anyhow::{Context, Result};
use comfy_table::Cell;

pub fn display_history(records: &[ConversionRecord]) -> String {
    if records.is_empty() {
        return ui::style_text("No conversions yet", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("From"),
        ui::header_cell("Amount"),
        ui::header_cell("To"),
        ui::header_cell("Result"),
        ui::header_cell("Rate"),
    ]);
    for record in records {
        table.add_row(vec![
            Cell::new(ui::format_timestamp(Some(record.timestamp))),
            Cell::new(record.from.as_str()),
            ui::number_cell(record.amount, 2),
            Cell::new(record.to.as_str()),
            ui::number_cell(record.result, 2),
            ui::number_cell(record.rate, 6),
        ]);
    }
    table.to_string()
}

pub async fn run(ledger: &mut Ledger, limit: Option<usize>, clear: bool) -> Result<()> {
    if clear {
        let count = ledger.list().len();
        ledger.clear_history();
        ledger.persist().await.context("Failed to clear history")?;
        println!("Removed {count} conversions from history");
        return Ok(());
    }

    let records = match limit {
        Some(limit) => ledger.recent(limit),
        None => ledger.list(),
    };
    println!(
        "{}\n\n{}",
        ui::style_text("Conversion history", ui::StyleType::Title),
        display_history(records)
    );
    Ok(())
}
