use std::sync::Arc;

use crate::config::{Config, ConfigError};
use crate::elements::{ElementCache, ElementSource};
use crate::predict::{ObserverLocation, SearchParams};
use crate::predictor::Predictor;

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor<ElementSource>>,
    /// Station used when a request does not name its own.
    pub observer: ObserverLocation,
    pub params: SearchParams,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let cache = ElementCache::new(config.element_source()?, config.cache_policy()?);
        Ok(Self {
            predictor: Arc::new(Predictor::new(cache)),
            observer: config.observer()?,
            params: config.search_params()?,
        })
    }
}
