use crate::core::config::{AppConfig, FETCH_URL_ENV};
use crate::providers::{HttpRateFetcher, QuoteShape};
use crate::store::{format_rate_line, write_rate_file};
use anyhow::{Context, Result};
use tracing::{error, info};

const ERR_FETCHING_EXCHANGE_RATE: &str = "error fetching dollar exchange rate";

/// Fetches the rate once, prints it and saves it to the output file.
///
/// A failed fetch aborts before anything is printed or written. A failed file
/// write is logged and does not fail the command.
pub async fn run(config: &AppConfig) -> Result<()> {
    let url = config.require_fetch_url()?;
    let fetcher = HttpRateFetcher::new(url, QuoteShape::Flat, FETCH_URL_ENV)?;

    let reading = fetcher
        .fetch(config.fetch.timeout())
        .await
        .context(ERR_FETCHING_EXCHANGE_RATE)?;

    println!("{}", format_rate_line(&reading));

    let output_path = &config.fetch.output_path;
    match write_rate_file(output_path, &reading) {
        Ok(()) => info!("Saved exchange rate to {}", output_path.display()),
        Err(e) => error!(error = %e, category = e.category(), "Failed to save exchange rate"),
    }
    Ok(())
}
