use super::ui;
use crate::core::config::AppConfig;
use crate::core::{PersistedRate, RateRepository};
use crate::store::SqliteRateStore;
use anyhow::Result;
use comfy_table::Cell;

const NO_RATES: &str = "No exchange rates stored yet.";

/// Lists stored rates without creating or altering the database.
pub async fn run(config: &AppConfig, limit: u32) -> Result<()> {
    let database_path = &config.serve.database_path;
    if !database_path.exists() {
        println!("{NO_RATES}");
        return Ok(());
    }

    let store = SqliteRateStore::connect_read_only(database_path).await?;
    let rows = store.recent(limit).await?;
    store.close().await;

    if rows.is_empty() {
        println!("{NO_RATES}");
    } else {
        println!("{}", render_table(&rows));
    }
    Ok(())
}

pub fn render_table(rows: &[PersistedRate]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell("Bid"),
        ui::header_cell("Fetched At (UTC)"),
    ]);

    for row in rows {
        table.add_row(vec![
            ui::number_cell(row.id),
            ui::number_cell(&row.bid),
            Cell::new(row.created_at.format("%Y-%m-%d %H:%M:%S").to_string()),
        ]);
    }

    table.to_string()
}
