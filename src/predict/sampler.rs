use std::cell::Cell;

use chrono::{DateTime, Utc};

use crate::predict::error::PredictError;
use crate::predict::propagation::Propagator;
use crate::predict::types::{Sample, SampleBatch};

/// Batch evaluation of a propagator. Counts batches and points so the
/// pipeline can report how much propagation a search cost.
pub struct ElevationSampler<'a, P: ?Sized> {
    propagator: &'a P,
    batches: Cell<usize>,
    evaluations: Cell<usize>,
}

impl<'a, P: Propagator + ?Sized> ElevationSampler<'a, P> {
    pub fn new(propagator: &'a P) -> Self {
        Self {
            propagator,
            batches: Cell::new(0),
            evaluations: Cell::new(0),
        }
    }

    /// Evaluate every time in `times`. Any propagation failure fails the
    /// whole batch, naming the offending time.
    pub fn sample(&self, times: &[DateTime<Utc>]) -> Result<SampleBatch, PredictError> {
        self.batches.set(self.batches.get() + 1);
        self.evaluations.set(self.evaluations.get() + times.len());

        let mut batch = SampleBatch::with_capacity(times.len());
        for &time in times {
            let angles = self.propagator.look_angles(time)?;
            batch.push(Sample {
                time,
                elevation_deg: angles.elevation_deg,
                azimuth_deg: angles.azimuth_deg,
                range_km: angles.range_km,
            });
        }
        Ok(batch)
    }

    pub fn elevation_at(&self, time: DateTime<Utc>) -> Result<f64, PredictError> {
        Ok(self.sample(&[time])?.elevation_deg[0])
    }

    pub fn batches(&self) -> usize {
        self.batches.get()
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.get()
    }
}
