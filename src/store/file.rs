//! Single-line text artifact holding the latest rate.

use crate::core::{Error, RateReading};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

pub const RATE_PREFIX: &str = "Exchange Rate (USD): ";

pub fn format_rate_line(reading: &RateReading) -> String {
    format!("{RATE_PREFIX}{reading}")
}

/// Replaces the file's content with one line for `reading`.
///
/// A failed write is not rolled back and may leave the file truncated.
pub fn write_rate_file<P: AsRef<Path>>(path: P, reading: &RateReading) -> Result<(), Error> {
    let path = path.as_ref();
    let mut file = File::create(path).map_err(Error::FileCreate)?;
    let line = format_rate_line(reading) + "\n";
    file.write_all(line.as_bytes()).map_err(Error::FileWrite)?;
    debug!("Wrote exchange rate to {}", path.display());
    Ok(())
}
