//! Analytic elevation model for exercising the search without SGP4.
//!
//! Each arc is a parabola in time peaking at `peak_deg` and meeting
//! `FLOOR_DEG` at `center ± half_width`, so threshold crossings are known
//! in closed form.

use chrono::{DateTime, Duration, Utc};

use crate::predict::error::PredictError;
use crate::predict::propagation::{LookAngles, Propagator};

pub const FLOOR_DEG: f64 = -10.0;

#[derive(Debug, Clone, Copy)]
pub struct Arc {
    pub center_s: f64,
    pub half_width_s: f64,
    pub peak_deg: f64,
}

impl Arc {
    /// Offsets in seconds where this arc crosses `threshold_deg`.
    pub fn crossings(&self, threshold_deg: f64) -> (f64, f64) {
        let x = ((self.peak_deg - threshold_deg) / (self.peak_deg - FLOOR_DEG)).sqrt();
        (
            self.center_s - self.half_width_s * x,
            self.center_s + self.half_width_s * x,
        )
    }

    fn elevation(&self, t: f64) -> f64 {
        let x = (t - self.center_s) / self.half_width_s;
        self.peak_deg - (self.peak_deg - FLOOR_DEG) * x * x
    }
}

pub struct SyntheticSky {
    pub anchor: DateTime<Utc>,
    pub arcs: Vec<Arc>,
    nan_spans: Vec<(f64, f64)>,
}

impl SyntheticSky {
    pub fn new() -> Self {
        Self {
            anchor: "2025-10-05T00:00:00Z".parse().unwrap(),
            arcs: Vec::new(),
            nan_spans: Vec::new(),
        }
    }

    pub fn with_arc(mut self, center_s: f64, half_width_s: f64, peak_deg: f64) -> Self {
        self.arcs.push(Arc {
            center_s,
            half_width_s,
            peak_deg,
        });
        self
    }

    /// Elevation is NaN for offsets inside `[start_s, end_s]`.
    pub fn with_nan(mut self, start_s: f64, end_s: f64) -> Self {
        self.nan_spans.push((start_s, end_s));
        self
    }

    pub fn at(&self, seconds: f64) -> DateTime<Utc> {
        self.anchor + Duration::microseconds((seconds * 1e6).round() as i64)
    }

    pub fn offset(&self, time: DateTime<Utc>) -> f64 {
        (time - self.anchor).num_microseconds().unwrap() as f64 / 1e6
    }
}

impl Propagator for SyntheticSky {
    fn look_angles(&self, time: DateTime<Utc>) -> Result<LookAngles, PredictError> {
        let t = self.offset(time);
        let elevation_deg = if self.nan_spans.iter().any(|&(a, b)| t >= a && t <= b) {
            f64::NAN
        } else {
            self.arcs
                .iter()
                .map(|arc| arc.elevation(t))
                .fold(FLOOR_DEG, f64::max)
        };
        Ok(LookAngles {
            elevation_deg,
            azimuth_deg: (t / 10.0).rem_euclid(360.0),
            range_km: 1000.0 + t.abs() / 100.0,
        })
    }
}
