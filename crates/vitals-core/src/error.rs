use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read results file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown app: {0}")]
    UnknownApp(String),

    #[error("Invalid app registry: {0}")]
    InvalidRegistry(String),

    #[error("Unsupported report window: {0} days (expected 7 or 30)")]
    UnsupportedWindow(u32),

    #[error("Invalid report window '{0}' (expected 7 or 30)")]
    InvalidWindow(String),

    #[error("Phase order violated: cannot move from {from} to {to}")]
    PhaseOrder { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, Error>;
