use chrono::{DateTime, Utc};
use sgp4::{Constants, Elements};

use crate::elements::OrbitalElementSet;
use crate::predict::error::PredictError;
use crate::predict::observer::ObserverLocation;

/// Topocentric direction and distance to the object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub range_km: f64,
}

/// Position of one object relative to one observer as a function of time.
///
/// Implementations bind the element set and observer at construction so
/// per-call work is only the propagation itself.
pub trait Propagator {
    fn look_angles(&self, time: DateTime<Utc>) -> Result<LookAngles, PredictError>;
}

/// SGP4 propagation of a two-line element set.
pub struct Sgp4Propagator {
    elements: Elements,
    constants: Constants,
    observer_ecef: [f64; 3],
    lat_rad: f64,
    lon_rad: f64,
}

impl Sgp4Propagator {
    pub fn new(set: &OrbitalElementSet, observer: &ObserverLocation) -> Result<Self, PredictError> {
        Self::from_elements(set.elements.clone(), observer)
    }

    pub fn from_elements(elements: Elements, observer: &ObserverLocation) -> Result<Self, PredictError> {
        let constants = Constants::from_elements(&elements)
            .map_err(|e| PredictError::InvalidElements(e.to_string()))?;
        Ok(Self {
            elements,
            constants,
            observer_ecef: observer.position_ecef_km(),
            lat_rad: observer.lat_rad(),
            lon_rad: observer.lon_rad(),
        })
    }
}

impl Propagator for Sgp4Propagator {
    fn look_angles(&self, time: DateTime<Utc>) -> Result<LookAngles, PredictError> {
        let propagation_error = |message: String| PredictError::Propagation { time, message };

        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&time.naive_utc())
            .map_err(|e| propagation_error(e.to_string()))?;

        let prediction = self
            .constants
            .propagate(minutes)
            .map_err(|e| propagation_error(e.to_string()))?;

        let sidereal =
            sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&time.naive_utc()));

        let sat_ecef = teme_to_ecef_position(prediction.position, sidereal);
        let dr = [
            sat_ecef[0] - self.observer_ecef[0],
            sat_ecef[1] - self.observer_ecef[1],
            sat_ecef[2] - self.observer_ecef[2],
        ];

        Ok(topocentric(dr, self.lat_rad, self.lon_rad))
    }
}

/// Look angles for an ECEF offset from the observer.
pub fn topocentric(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> LookAngles {
    let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();
    let (east, north, up) = ecef_to_enu(dr, lat_rad, lon_rad);
    let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
    let elevation_deg = if range_km > 0.0 {
        (up / range_km).clamp(-1.0, 1.0).asin().to_degrees()
    } else {
        90.0
    };
    LookAngles {
        elevation_deg,
        azimuth_deg,
        range_km,
    }
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}
