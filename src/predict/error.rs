use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::elements::ElementError;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("element data unavailable for {catalog_id}: {source}")]
    DataUnavailable {
        catalog_id: u32,
        source: ElementError,
    },
    #[error("propagation failed at {time}: {message}")]
    Propagation {
        time: DateTime<Utc>,
        message: String,
    },
    #[error("invalid window: {0}")]
    InvalidWindow(String),
    #[error("invalid observer: {0}")]
    InvalidObserver(String),
    #[error("invalid elements: {0}")]
    InvalidElements(String),
}
