//! Error taxonomy shared by the fetcher, the sinks and the responder.
//!
//! Every variant carries its category string so a failure can be logged once,
//! at the boundary where it surfaces, with a stable prefix.

use std::io;
use std::time::Duration;
use thiserror::Error;

pub const ERR_CONFIG_MISSING: &str = "missing required configuration";
pub const ERR_CREATING_REQUEST: &str = "error creating HTTP request";
pub const ERR_SENDING_REQUEST: &str = "error sending HTTP request";
pub const ERR_DECODING_RESPONSE: &str = "error decoding response body";
pub const ERR_CREATING_FILE: &str = "error creating file";
pub const ERR_WRITING_FILE: &str = "error writing to file";
pub const ERR_OPENING_DATABASE: &str = "error opening database";
pub const ERR_DATABASE_OPERATION: &str = "error saving to database";

#[derive(Error, Debug)]
pub enum Error {
    /// A required setting is absent or blank; carries the environment variable name.
    #[error("missing required configuration: {0} is not set")]
    ConfigMissing(&'static str),

    #[error("error creating HTTP request: {0}")]
    RequestBuild(#[source] reqwest::Error),

    /// Connection failures and timeouts.
    #[error("error sending HTTP request: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("error sending HTTP request: upstream answered {0}")]
    Status(reqwest::StatusCode),

    #[error("error decoding response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("error creating file: {0}")]
    FileCreate(#[source] io::Error),

    #[error("error writing to file: {0}")]
    FileWrite(#[source] io::Error),

    /// Fatal at startup.
    #[error("error opening database: {0}")]
    StoreOpen(#[source] sqlx::Error),

    #[error("error saving to database: {0}")]
    StoreQuery(#[source] sqlx::Error),

    #[error("error saving to database: timed out after {0:?}")]
    StoreTimeout(Duration),
}

impl Error {
    pub fn category(&self) -> &'static str {
        match self {
            Error::ConfigMissing(_) => ERR_CONFIG_MISSING,
            Error::RequestBuild(_) => ERR_CREATING_REQUEST,
            Error::Transport(_) | Error::Status(_) => ERR_SENDING_REQUEST,
            Error::Decode(_) => ERR_DECODING_RESPONSE,
            Error::FileCreate(_) => ERR_CREATING_FILE,
            Error::FileWrite(_) => ERR_WRITING_FILE,
            Error::StoreOpen(_) => ERR_OPENING_DATABASE,
            Error::StoreQuery(_) | Error::StoreTimeout(_) => ERR_DATABASE_OPERATION,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Transport(e) => e.is_timeout(),
            Error::StoreTimeout(_) => true,
            _ => false,
        }
    }
}
