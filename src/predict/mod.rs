mod assembler;
mod error;
mod observer;
mod pass_finder;
mod propagation;
mod refiner;
mod sampler;
mod scanner;
#[cfg(test)]
mod testing;
mod types;

pub use assembler::assemble;
pub use error::PredictError;
pub use observer::ObserverLocation;
pub use pass_finder::{
    find_passes, validate_request, SearchParams, DEFAULT_EXPECTED_MIN_PASS,
    DEFAULT_MIN_ELEVATION_DEG, MAX_WINDOW,
};
pub use propagation::{LookAngles, Propagator, Sgp4Propagator};
pub use refiner::{Refiner, DEFAULT_FINE_TOLERANCE};
pub use sampler::ElevationSampler;
pub use scanner::{coarse_times, find_candidates, scan, CoarseScan, DEFAULT_COARSE_STEP};
pub use types::{CandidateInterval, Pass, RefinedInterval, Sample, SampleBatch};
