use thiserror::Error;

/// Errors surfaced by the tracking engine.
///
/// `InvalidGeofence` and `InvalidFix` reject a single call and leave all
/// state untouched. `Store` means a commit reached the in-memory log but
/// durability is unconfirmed; the tracker never retries on its own.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid geofence: {0}")]
    InvalidGeofence(String),

    #[error("invalid location fix: {0}")]
    InvalidFix(String),

    #[error("persistence failure: {0}")]
    Store(Box<dyn std::error::Error + Send + Sync>),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(Box::new(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Store(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
