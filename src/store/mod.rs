pub mod file;
pub mod sqlite;

pub use file::{format_rate_line, write_rate_file};
pub use sqlite::SqliteRateStore;
