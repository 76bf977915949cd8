//! Core business logic abstractions

pub mod config;
pub mod error;
pub mod log;
pub mod rate;

// Re-export main types for cleaner imports
pub use error::Error;
pub use rate::{PersistedRate, RateProvider, RateReading, RateRepository};
