use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::predict::{ObserverLocation, SearchParams};
use crate::predictor::Prediction;
use crate::web::api::error::{ApiError, ApiResult};
use crate::web::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct PassesQuery {
    /// NORAD catalog number
    pub norad: u32,
    /// Window start (RFC3339)
    #[serde(deserialize_with = "deserialize_datetime")]
    #[param(value_type = String)]
    pub start: DateTime<Utc>,
    /// Window end (RFC3339)
    #[serde(deserialize_with = "deserialize_datetime")]
    #[param(value_type = String)]
    pub end: DateTime<Utc>,
    /// Minimum elevation in degrees
    pub min_elevation: Option<f64>,
    pub coarse_step_seconds: Option<i64>,
    pub fine_tolerance_seconds: Option<f64>,
    /// Observer latitude; defaults to the configured station
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt_m: Option<f64>,
}

impl PassesQuery {
    fn observer(&self, default: &ObserverLocation) -> ApiResult<ObserverLocation> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok(ObserverLocation::new(
                lat,
                lon,
                self.alt_m.unwrap_or(0.0),
            )?),
            (None, None) => Ok(*default),
            _ => Err(ApiError::Validation(
                "lat and lon must be given together".into(),
            )),
        }
    }

    fn params(&self, default: &SearchParams) -> ApiResult<SearchParams> {
        let coarse_step = match self.coarse_step_seconds {
            Some(s) => Duration::try_seconds(s).ok_or_else(|| {
                ApiError::Validation(format!("coarse_step_seconds out of range: {}", s))
            })?,
            None => default.coarse_step,
        };
        let fine_tolerance = match self.fine_tolerance_seconds {
            Some(s) if !s.is_finite() => {
                return Err(ApiError::Validation(format!(
                    "fine_tolerance_seconds must be finite, got {}",
                    s
                )))
            }
            Some(s) => Duration::microseconds((s * 1e6).round() as i64),
            None => default.fine_tolerance,
        };
        Ok(SearchParams {
            min_elevation_deg: self.min_elevation.unwrap_or(default.min_elevation_deg),
            coarse_step,
            fine_tolerance,
            expected_min_pass: default.expected_min_pass,
        })
    }
}

#[utoipa::path(
    get,
    path = "/api/passes",
    tag = "passes",
    params(PassesQuery),
    responses(
        (status = 200, description = "Predicted passes", body = Prediction),
        (status = 400, description = "Invalid parameters", body = crate::web::api::error::ErrorResponse),
        (status = 503, description = "Element data unavailable", body = crate::web::api::error::ErrorResponse),
        (status = 500, description = "Propagation failed", body = crate::web::api::error::ErrorResponse)
    )
)]
pub async fn list_passes(
    State(state): State<AppState>,
    Query(query): Query<PassesQuery>,
) -> ApiResult<Json<Prediction>> {
    let observer = query.observer(&state.observer)?;
    let params = query.params(&state.params)?;

    let prediction = state
        .predictor
        .predict_passes(query.norad, &observer, query.start, query.end, &params)
        .await?;

    Ok(Json(prediction))
}

fn deserialize_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}
