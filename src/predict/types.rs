use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// One evaluated point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub range_km: f64,
}

/// Sampler output as parallel arrays aligned index-for-index with the
/// requested times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBatch {
    pub times: Vec<DateTime<Utc>>,
    pub elevation_deg: Vec<f64>,
    pub azimuth_deg: Vec<f64>,
    pub range_km: Vec<f64>,
}

impl SampleBatch {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            times: Vec::with_capacity(n),
            elevation_deg: Vec::with_capacity(n),
            azimuth_deg: Vec::with_capacity(n),
            range_km: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.times.push(sample.time);
        self.elevation_deg.push(sample.elevation_deg);
        self.azimuth_deg.push(sample.azimuth_deg);
        self.range_km.push(sample.range_km);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Sample> {
        Some(Sample {
            time: *self.times.get(index)?,
            elevation_deg: self.elevation_deg[index],
            azimuth_deg: self.azimuth_deg[index],
            range_km: self.range_km[index],
        })
    }
}

/// Maximal run of coarse samples at or above the threshold, as inclusive
/// indices into the coarse batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateInterval {
    pub start_index: usize,
    pub end_index: usize,
    /// The run begins at the first sample of the window.
    pub truncated_start: bool,
    /// The run ends at the last sample of the window.
    pub truncated_end: bool,
}

/// A candidate after refinement, before assembly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefinedInterval {
    pub rise: Sample,
    pub peak: Sample,
    pub set: Sample,
    pub rise_truncated: bool,
    pub set_truncated: bool,
    pub low_confidence: bool,
}

/// A predicted pass
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Pass {
    pub rise_time: DateTime<Utc>,
    pub rise_azimuth_deg: f64,
    pub peak_time: DateTime<Utc>,
    pub peak_elevation_deg: f64,
    pub peak_azimuth_deg: f64,
    pub peak_range_km: f64,
    pub set_time: DateTime<Utc>,
    pub set_azimuth_deg: f64,
    pub duration_seconds: f64,
    /// Rise is the window start; the real rise may be earlier.
    pub rise_truncated: bool,
    /// Set is the window end; the real set may be later.
    pub set_truncated: bool,
    /// Refinement fell back to coarse bounds or the peak search disagreed
    /// with a dense scan.
    pub low_confidence: bool,
}
