use super::ui;
use crate::core::{CurrencyCode, FavoritePair, Ledger};
use anyhow::{Context, Result};
use chrono::Utc;
use comfy_table::Cell;

pub enum FavoritesAction {
    List,
    Add { from: CurrencyCode, to: CurrencyCode },
    Remove { id: String },
}

pub fn display_favorites(favorites: &[FavoritePair]) -> String {
    if favorites.is_empty() {
        return ui::style_text("No favorites saved", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Id"),
        ui::header_cell("Pair"),
        ui::header_cell("Added"),
    ]);
    for favorite in favorites {
        table.add_row(vec![
            Cell::new(&favorite.id),
            Cell::new(format!("{} -> {}", favorite.from, favorite.to)),
            Cell::new(ui::format_timestamp(Some(favorite.created_at))),
        ]);
    }
    table.to_string()
}

pub async fn run(ledger: &mut Ledger, action: FavoritesAction) -> Result<()> {
    match action {
        FavoritesAction::List => {
            println!(
                "{}\n\n{}",
                ui::style_text("Favorites", ui::StyleType::Title),
                display_favorites(ledger.favorites())
            );
        }
        FavoritesAction::Add { from, to } => {
            let favorite = ledger.add_favorite(from, to, Utc::now())?;
            ledger.persist().await.context("Favorite added but not saved")?;
            println!(
                "Saved favorite {} -> {} ({})",
                favorite.from,
                favorite.to,
                ui::style_text(&favorite.id, ui::StyleType::Subtle)
            );
        }
        FavoritesAction::Remove { id } => {
            let removed = ledger.remove_favorite(&id)?;
            ledger
                .persist()
                .await
                .context("Favorite removed but the change was not saved")?;
            println!("Removed favorite {} -> {}", removed.from, removed.to);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FxError;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn code(s: &str) -> CurrencyCode {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_add_and_remove() {
        let mut ledger = Ledger::new(Arc::new(MemoryStore::new()), None);

        run(
            &mut ledger,
            FavoritesAction::Add {
                from: code("USD"),
                to: code("EUR"),
            },
        )
        .await
        .unwrap();
        assert_eq!(ledger.favorites().len(), 1);
        assert!(!ledger.has_unsaved_changes());

        let duplicate = run(
            &mut ledger,
            FavoritesAction::Add {
                from: code("USD"),
                to: code("EUR"),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(
            duplicate.downcast_ref::<FxError>(),
            Some(FxError::DuplicateFavorite { .. })
        ));

        let id = ledger.favorites()[0].id.clone();
        run(&mut ledger, FavoritesAction::Remove { id }).await.unwrap();
        assert!(ledger.favorites().is_empty());

        let missing = run(
            &mut ledger,
            FavoritesAction::Remove {
                id: "nonexistent-id".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(
            missing.downcast_ref::<FxError>(),
            Some(FxError::NotFound(_))
        ));
    }

    #[test]
    fn test_display_favorites() {
        console::set_colors_enabled(false);
        assert_eq!(display_favorites(&[]), "No favorites saved");
    }
}
