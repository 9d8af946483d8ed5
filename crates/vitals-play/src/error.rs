use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Service account file not found: {0}")]
    ConfigMissing(PathBuf),

    #[error("Access token error: {0}")]
    Token(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Reporting API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("No vitals data available in the last {days} days")]
    NoData { days: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
