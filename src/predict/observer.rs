use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::predict::error::PredictError;

// WGS-84
const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.137;
const EARTH_ECCENTRICITY_SQ: f64 = 0.006_694_379_990_14;

const MIN_ALTITUDE_M: f64 = -1000.0;

/// Fixed ground location on the WGS-84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ObserverLocation {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl ObserverLocation {
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Result<Self, PredictError> {
        let observer = Self {
            latitude_deg,
            longitude_deg,
            altitude_m,
        };
        observer.validate()?;
        Ok(observer)
    }

    /// Parse `"lat, lon"` as used in configuration files.
    pub fn from_coordinates(coordinates: &str, altitude_m: Option<f64>) -> Result<Self, PredictError> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return Err(PredictError::InvalidObserver(format!(
                "expected \"lat, lon\", got {:?}",
                coordinates
            )));
        }
        let parse = |s: &str| {
            s.parse::<f64>()
                .map_err(|e| PredictError::InvalidObserver(format!("{:?}: {}", s, e)))
        };
        Self::new(parse(parts[0])?, parse(parts[1])?, altitude_m.unwrap_or(0.0))
    }

    pub fn validate(&self) -> Result<(), PredictError> {
        if !(-90.0..=90.0).contains(&self.latitude_deg) {
            return Err(PredictError::InvalidObserver(format!(
                "latitude must be between -90 and 90 degrees, got {}",
                self.latitude_deg
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude_deg) {
            return Err(PredictError::InvalidObserver(format!(
                "longitude must be between -180 and 180 degrees, got {}",
                self.longitude_deg
            )));
        }
        if !self.altitude_m.is_finite() || self.altitude_m < MIN_ALTITUDE_M {
            return Err(PredictError::InvalidObserver(format!(
                "altitude must be >= {} meters, got {}",
                MIN_ALTITUDE_M, self.altitude_m
            )));
        }
        Ok(())
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let n = EARTH_EQUATORIAL_RADIUS_KM / (1.0 - EARTH_ECCENTRICITY_SQ * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        [
            (n + alt_km) * cos_lat * lon.cos(),
            (n + alt_km) * cos_lat * lon.sin(),
            (n * (1.0 - EARTH_ECCENTRICITY_SQ) + alt_km) * sin_lat,
        ]
    }
}
