use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The browsing session is gone or cannot be driven. Aborts the batch.
    #[error("Session error: {0}")]
    Session(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error(transparent)]
    Core(#[from] vitals_core::Error),

    #[error("Interrupted")]
    Interrupted,
}

impl Error {
    /// Errors that stop the whole batch rather than one app
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Session(_) | Error::Interrupted)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
