use chrono::{DateTime, Duration, Utc};

use crate::predict::error::PredictError;
use crate::predict::propagation::Propagator;
use crate::predict::sampler::ElevationSampler;
use crate::predict::types::{CandidateInterval, SampleBatch};

pub const DEFAULT_COARSE_STEP: Duration = Duration::seconds(300);

/// Coarse samples over the whole window and the runs found in them. The
/// batch is kept because the refiner brackets crossings with its samples.
#[derive(Debug, Clone)]
pub struct CoarseScan {
    pub batch: SampleBatch,
    pub candidates: Vec<CandidateInterval>,
}

/// Sample the window at `coarse_step` in a single sampler call and collect
/// the runs at or above `min_elevation_deg`.
pub fn scan<P: Propagator + ?Sized>(
    sampler: &ElevationSampler<'_, P>,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    coarse_step: Duration,
    min_elevation_deg: f64,
) -> Result<CoarseScan, PredictError> {
    let times = coarse_times(window_start, window_end, coarse_step);
    let batch = sampler.sample(&times)?;
    let candidates = find_candidates(&batch.elevation_deg, min_elevation_deg);

    log::debug!(
        "Coarse scan: {} samples at {}s, {} candidate(s)",
        batch.len(),
        coarse_step.num_seconds(),
        candidates.len()
    );

    Ok(CoarseScan { batch, candidates })
}

/// `start, start + step, ...` up to and including `end`. The last step is
/// shortened when the window is not a whole number of steps.
pub fn coarse_times(start: DateTime<Utc>, end: DateTime<Utc>, step: Duration) -> Vec<DateTime<Utc>> {
    let mut times = Vec::new();
    if step <= Duration::zero() || end < start {
        return times;
    }

    let mut cursor = start;
    while cursor < end {
        times.push(cursor);
        cursor = match cursor.checked_add_signed(step) {
            Some(next) => next,
            None => break,
        };
    }
    times.push(end);
    times
}

/// Maximal runs of indices with elevation at or above the threshold. Runs
/// touching either end of the array are flagged as truncated.
pub fn find_candidates(elevations: &[f64], min_elevation_deg: f64) -> Vec<CandidateInterval> {
    let last = match elevations.len().checked_sub(1) {
        Some(last) => last,
        None => return Vec::new(),
    };

    let mut candidates = Vec::new();
    let mut run_start: Option<usize> = None;

    for (i, &elevation) in elevations.iter().enumerate() {
        let visible = elevation >= min_elevation_deg;
        match (visible, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                candidates.push(CandidateInterval {
                    start_index: start,
                    end_index: i - 1,
                    truncated_start: start == 0,
                    truncated_end: false,
                });
                run_start = None;
            }
            _ => {}
        }
    }

    if let Some(start) = run_start {
        candidates.push(CandidateInterval {
            start_index: start,
            end_index: last,
            truncated_start: start == 0,
            truncated_end: true,
        });
    }

    candidates
}
