pub mod rate_api;

pub use rate_api::{HttpRateFetcher, QuoteShape};
