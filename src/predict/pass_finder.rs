use chrono::{DateTime, Duration, Utc};

use crate::predict::assembler::assemble;
use crate::predict::error::PredictError;
use crate::predict::propagation::Propagator;
use crate::predict::refiner::{Refiner, DEFAULT_FINE_TOLERANCE};
use crate::predict::sampler::ElevationSampler;
use crate::predict::scanner::{scan, DEFAULT_COARSE_STEP};
use crate::predict::types::Pass;

/// Longest forecast window accepted.
pub const MAX_WINDOW: Duration = Duration::hours(168);
pub const DEFAULT_MIN_ELEVATION_DEG: f64 = 10.0;
pub const DEFAULT_EXPECTED_MIN_PASS: Duration = Duration::minutes(10);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub min_elevation_deg: f64,
    pub coarse_step: Duration,
    pub fine_tolerance: Duration,
    /// Shortest pass worth finding; the coarse step should be at most half of it.
    pub expected_min_pass: Duration,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            min_elevation_deg: DEFAULT_MIN_ELEVATION_DEG,
            coarse_step: DEFAULT_COARSE_STEP,
            fine_tolerance: DEFAULT_FINE_TOLERANCE,
            expected_min_pass: DEFAULT_EXPECTED_MIN_PASS,
        }
    }
}

impl SearchParams {
    pub fn with_min_elevation(min_elevation_deg: f64) -> Self {
        Self {
            min_elevation_deg,
            ..Self::default()
        }
    }
}

/// Reject a request before any propagation. Nothing is clamped.
pub fn validate_request(
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    params: &SearchParams,
) -> Result<(), PredictError> {
    if window_end <= window_start {
        return Err(PredictError::InvalidWindow(format!(
            "window end {} is not after start {}",
            window_end, window_start
        )));
    }
    if window_end - window_start > MAX_WINDOW {
        return Err(PredictError::InvalidWindow(format!(
            "window longer than {} hours",
            MAX_WINDOW.num_hours()
        )));
    }
    if !(0.0..90.0).contains(&params.min_elevation_deg) {
        return Err(PredictError::InvalidWindow(format!(
            "minimum elevation must be in [0, 90) degrees, got {}",
            params.min_elevation_deg
        )));
    }
    if params.coarse_step <= Duration::zero() {
        return Err(PredictError::InvalidWindow(
            "coarse step must be positive".into(),
        ));
    }
    if params.coarse_step > MAX_WINDOW {
        return Err(PredictError::InvalidWindow(format!(
            "coarse step longer than {} hours",
            MAX_WINDOW.num_hours()
        )));
    }
    if params.fine_tolerance <= Duration::zero() {
        return Err(PredictError::InvalidWindow(
            "fine tolerance must be positive".into(),
        ));
    }
    if params.fine_tolerance > params.coarse_step {
        return Err(PredictError::InvalidWindow(format!(
            "fine tolerance {}s exceeds coarse step {}s",
            params.fine_tolerance.num_seconds(),
            params.coarse_step.num_seconds()
        )));
    }
    if params.coarse_step * 2 > params.expected_min_pass {
        log::warn!(
            "Coarse step {}s is more than half the expected minimum pass of {}s; short passes may be missed",
            params.coarse_step.num_seconds(),
            params.expected_min_pass.num_seconds()
        );
    }
    Ok(())
}

/// Find all passes in `[window_start, window_end]`: one coarse batch, then
/// refinement of each candidate, then assembly.
pub fn find_passes<P: Propagator + ?Sized>(
    propagator: &P,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    params: &SearchParams,
) -> Result<Vec<Pass>, PredictError> {
    validate_request(window_start, window_end, params)?;

    let sampler = ElevationSampler::new(propagator);
    let coarse = scan(
        &sampler,
        window_start,
        window_end,
        params.coarse_step,
        params.min_elevation_deg,
    )?;

    let refiner = Refiner::new(&sampler, params.min_elevation_deg, params.fine_tolerance);
    let refined = coarse
        .candidates
        .iter()
        .map(|candidate| refiner.refine(&coarse.batch, candidate))
        .collect::<Result<Vec<_>, _>>()?;

    let passes = assemble(refined, params.min_elevation_deg);

    log::debug!(
        "Found {} pass(es) from {} candidate(s) using {} evaluations in {} batches",
        passes.len(),
        coarse.candidates.len(),
        sampler.evaluations(),
        sampler.batches()
    );

    Ok(passes)
}
