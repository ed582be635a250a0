use thiserror::Error;

/// Failure to obtain a usable element set. Cloned out to every waiter of a
/// coalesced fetch, so variants carry strings rather than source errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ElementError {
    #[error("fetch for {catalog_id} timed out after {seconds}s")]
    Timeout { catalog_id: u32, seconds: u64 },
    #[error("no element set found for {0}")]
    NotFound(u32),
    #[error("malformed element set for {catalog_id}: {message}")]
    Malformed { catalog_id: u32, message: String },
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("fetch for {0} was abandoned before completing")]
    Abandoned(u32),
}

impl From<std::io::Error> for ElementError {
    fn from(err: std::io::Error) -> Self {
        ElementError::Io(err.to_string())
    }
}
