use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::elements::{ElementCache, ElementProvider, Freshness};
use crate::predict::{
    find_passes, validate_request, ObserverLocation, Pass, PredictError, SearchParams,
    Sgp4Propagator,
};

/// Passes for one object over one observer and window.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Prediction {
    pub satellite: String,
    pub catalog_id: u32,
    pub elements_epoch: DateTime<Utc>,
    /// Stale means the provider failed and an expired element set was used.
    pub freshness: Freshness,
    pub passes: Vec<Pass>,
}

/// Element cache plus the pass search: the entry point used by the CLI and
/// the HTTP API.
pub struct Predictor<P> {
    cache: ElementCache<P>,
}

impl<P: ElementProvider> Predictor<P> {
    pub fn new(cache: ElementCache<P>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &ElementCache<P> {
        &self.cache
    }

    pub async fn predict_passes(
        &self,
        catalog_id: u32,
        observer: &ObserverLocation,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        params: &SearchParams,
    ) -> Result<Prediction, PredictError> {
        self.predict_passes_at(catalog_id, observer, window_start, window_end, params, Utc::now())
            .await
    }

    /// As [`Predictor::predict_passes`], with the cache clock supplied.
    pub async fn predict_passes_at(
        &self,
        catalog_id: u32,
        observer: &ObserverLocation,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        params: &SearchParams,
        now: DateTime<Utc>,
    ) -> Result<Prediction, PredictError> {
        observer.validate()?;
        validate_request(window_start, window_end, params)?;

        let cached = self
            .cache
            .get(catalog_id, now)
            .await
            .map_err(|source| PredictError::DataUnavailable { catalog_id, source })?;
        let set = &cached.elements;

        let propagator = Sgp4Propagator::new(set, observer)?;
        let passes = find_passes(&propagator, window_start, window_end, params)?;

        log::info!(
            "{} ({}): {} pass(es) between {} and {} above {} deg",
            set.name,
            catalog_id,
            passes.len(),
            window_start,
            window_end,
            params.min_elevation_deg
        );

        Ok(Prediction {
            satellite: set.name.clone(),
            catalog_id,
            elements_epoch: set.epoch,
            freshness: cached.freshness,
            passes,
        })
    }
}
