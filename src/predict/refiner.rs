//! Narrowing coarse candidates to precise rise, peak and set.
//!
//! Rise and set come from bisection between a sub-threshold coarse sample and
//! an at/above-threshold one. The peak comes from a golden-section search over
//! `[rise, set]`, which assumes a single maximum. That assumption is checked
//! against the coarse samples and, when in doubt, against a dense scan; a
//! disagreement marks the pass `low_confidence` instead of trusting the
//! optimizer. Every loop runs a bounded number of iterations derived from the
//! bracket width and tolerance.

use chrono::{DateTime, Duration, Utc};

use crate::predict::error::PredictError;
use crate::predict::propagation::Propagator;
use crate::predict::sampler::ElevationSampler;
use crate::predict::types::{CandidateInterval, RefinedInterval, SampleBatch};

pub const DEFAULT_FINE_TOLERANCE: Duration = Duration::seconds(1);

const INV_PHI: f64 = 0.618_033_988_749_895;
const MAX_ITERATIONS: u32 = 64;
/// Elevation margin by which another estimate must beat the optimizer's peak.
const PEAK_AGREEMENT_DEG: f64 = 0.05;
const DENSE_SAMPLES: usize = 64;

pub struct Refiner<'s, 'p, P: ?Sized> {
    sampler: &'s ElevationSampler<'p, P>,
    min_elevation_deg: f64,
    tolerance_s: f64,
}

/// Outcome of one edge search.
struct Edge {
    time: DateTime<Utc>,
    truncated: bool,
    fallback: bool,
}

impl<'s, 'p, P: Propagator + ?Sized> Refiner<'s, 'p, P> {
    pub fn new(
        sampler: &'s ElevationSampler<'p, P>,
        min_elevation_deg: f64,
        fine_tolerance: Duration,
    ) -> Self {
        Self {
            sampler,
            min_elevation_deg,
            tolerance_s: seconds(fine_tolerance),
        }
    }

    /// Refine one candidate found in `coarse`.
    pub fn refine(
        &self,
        coarse: &SampleBatch,
        candidate: &CandidateInterval,
    ) -> Result<RefinedInterval, PredictError> {
        let first = candidate.start_index;
        let last = candidate.end_index;
        let times = &coarse.times;

        let rise = if candidate.truncated_start {
            Edge {
                time: times[first],
                truncated: true,
                fallback: false,
            }
        } else {
            self.edge(coarse, first - 1, first)?
        };

        let set = if candidate.truncated_end {
            Edge {
                time: times[last],
                truncated: true,
                fallback: false,
            }
        } else {
            self.edge(coarse, last + 1, last)?
        };

        let coarse_best = coarse.elevation_deg[first..=last]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        let (peak_time, peak_suspect) = self.peak(&rise, &set, coarse_best)?;
        let peak_time = self.interior(rise.time, set.time, peak_time);

        let bounds = self.sampler.sample(&[rise.time, peak_time, set.time])?;
        let at = |i: usize| {
            bounds.get(i).ok_or_else(|| PredictError::Propagation {
                time: peak_time,
                message: "sampler returned a short batch".into(),
            })
        };
        let (rise_sample, peak_sample, set_sample) = (at(0)?, at(1)?, at(2)?);

        let low_confidence = rise.fallback || set.fallback || peak_suspect;
        if low_confidence {
            log::warn!(
                "Low-confidence pass around {} (rise fallback: {}, set fallback: {}, peak disagreement: {})",
                peak_time,
                rise.fallback,
                set.fallback,
                peak_suspect
            );
        }

        Ok(RefinedInterval {
            rise: rise_sample,
            peak: peak_sample,
            set: set_sample,
            rise_truncated: rise.truncated,
            set_truncated: set.truncated,
            low_confidence,
        })
    }

    /// Threshold crossing between coarse sample `below` (sub-threshold) and
    /// `above` (at/above threshold), in either time order.
    fn edge(&self, coarse: &SampleBatch, below: usize, above: usize) -> Result<Edge, PredictError> {
        let coarse_time = coarse.times[above];
        let crossing = self.bisect(
            coarse.times[below],
            coarse.elevation_deg[below],
            coarse_time,
            coarse.elevation_deg[above],
        )?;

        Ok(match crossing {
            Some(time) => Edge {
                time,
                truncated: false,
                fallback: false,
            },
            None => {
                log::debug!("Bisection failed near {}; using coarse boundary", coarse_time);
                Edge {
                    time: coarse_time,
                    truncated: false,
                    fallback: true,
                }
            }
        })
    }

    /// Midpoint of the final bracket, or `None` if the bracket does not hold
    /// a clean crossing: a non-finite elevation, or no progress at the
    /// clock's resolution.
    fn bisect(
        &self,
        mut below: DateTime<Utc>,
        below_el: f64,
        mut above: DateTime<Utc>,
        above_el: f64,
    ) -> Result<Option<DateTime<Utc>>, PredictError> {
        if !(below_el < self.min_elevation_deg && above_el >= self.min_elevation_deg) {
            return Ok(None);
        }

        let width = seconds(above - below).abs();
        for _ in 0..iteration_limit(width, self.tolerance_s, 2.0) {
            if seconds(above - below).abs() <= self.tolerance_s {
                return Ok(Some(midpoint(below, above)));
            }

            let mid = midpoint(below, above);
            if mid == below || mid == above {
                return Ok(None);
            }

            let elevation = self.sampler.elevation_at(mid)?;
            if !elevation.is_finite() {
                return Ok(None);
            }
            if elevation >= self.min_elevation_deg {
                above = mid;
            } else {
                below = mid;
            }
        }

        if seconds(above - below).abs() <= self.tolerance_s {
            Ok(Some(midpoint(below, above)))
        } else {
            Ok(None)
        }
    }

    /// Peak time and whether the optimizer's answer was overruled.
    ///
    /// A run cut by the window while elevation is still rising (or already
    /// falling) has its maximum at the cut. The dense scan finding it there
    /// is expected and does not lower confidence.
    fn peak(
        &self,
        rise: &Edge,
        set: &Edge,
        coarse_best: f64,
    ) -> Result<(DateTime<Utc>, bool), PredictError> {
        let (golden_time, golden_el) = self.golden_section(rise.time, set.time)?;

        let near_rise = seconds(golden_time - rise.time) <= 2.0 * self.tolerance_s;
        let near_set = seconds(set.time - golden_time) <= 2.0 * self.tolerance_s;
        let beaten_by_coarse = coarse_best > golden_el + PEAK_AGREEMENT_DEG;
        if !near_rise && !near_set && !beaten_by_coarse {
            return Ok((golden_time, false));
        }

        let (dense_time, dense_el) = self.dense_peak(rise.time, set.time)?;
        if dense_el > golden_el + PEAK_AGREEMENT_DEG {
            let at_cut = (rise.truncated && seconds(dense_time - rise.time) <= 2.0 * self.tolerance_s)
                || (set.truncated && seconds(set.time - dense_time) <= 2.0 * self.tolerance_s);
            if at_cut {
                log::debug!("Elevation peaks at the window edge near {}", dense_time);
            } else {
                log::debug!(
                    "Peak search settled on {:.2} deg but a dense scan found {:.2} deg",
                    golden_el,
                    dense_el
                );
            }
            Ok((dense_time, !at_cut))
        } else {
            Ok((golden_time, false))
        }
    }

    /// Clamp `peak` into the open interval `(rise, set)`, one tolerance (at
    /// most a quarter of the run) away from either end.
    fn interior(&self, rise: DateTime<Utc>, set: DateTime<Utc>, peak: DateTime<Utc>) -> DateTime<Utc> {
        if set <= rise {
            return rise;
        }
        let margin = self.tolerance_s.min(seconds(set - rise) / 4.0);
        peak.clamp(shift(rise, margin), shift(set, -margin))
    }

    /// Golden-section maximization over `[a, b]`; returns the midpoint of the
    /// final bracket and its elevation.
    fn golden_section(
        &self,
        a: DateTime<Utc>,
        b: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, f64), PredictError> {
        let origin = a;
        let mut lo = 0.0;
        let mut hi = seconds(b - a);

        let mut x1 = hi - INV_PHI * (hi - lo);
        let mut x2 = lo + INV_PHI * (hi - lo);
        let mut f1 = self.sampler.elevation_at(shift(origin, x1))?;
        let mut f2 = self.sampler.elevation_at(shift(origin, x2))?;

        for _ in 0..iteration_limit(hi - lo, self.tolerance_s, 1.0 / INV_PHI) {
            if hi - lo <= self.tolerance_s {
                break;
            }
            if f1 < f2 {
                lo = x1;
                x1 = x2;
                f1 = f2;
                x2 = lo + INV_PHI * (hi - lo);
                f2 = self.sampler.elevation_at(shift(origin, x2))?;
            } else {
                hi = x2;
                x2 = x1;
                f2 = f1;
                x1 = hi - INV_PHI * (hi - lo);
                f1 = self.sampler.elevation_at(shift(origin, x1))?;
            }
        }

        let time = shift(origin, (lo + hi) / 2.0);
        let elevation = self.sampler.elevation_at(time)?;
        Ok((time, elevation))
    }

    /// Evenly spaced scan of `[a, b]` in one batch, then a golden-section
    /// search between the neighbours of the best sample.
    fn dense_peak(
        &self,
        a: DateTime<Utc>,
        b: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, f64), PredictError> {
        let span = seconds(b - a);
        let step = span / (DENSE_SAMPLES - 1) as f64;
        let times: Vec<_> = (0..DENSE_SAMPLES)
            .map(|i| shift(a, step * i as f64))
            .collect();
        let batch = self.sampler.sample(&times)?;

        let best = batch
            .elevation_deg
            .iter()
            .enumerate()
            .filter(|(_, el)| el.is_finite())
            .max_by(|x, y| x.1.total_cmp(y.1))
            .map(|(i, _)| i)
            .unwrap_or(0);

        let lo = times[best.saturating_sub(1)];
        let hi = times[(best + 1).min(DENSE_SAMPLES - 1)];
        let (time, elevation) = self.golden_section(lo, hi)?;

        if elevation >= batch.elevation_deg[best] || !batch.elevation_deg[best].is_finite() {
            Ok((time, elevation))
        } else {
            Ok((times[best], batch.elevation_deg[best]))
        }
    }
}

/// Iterations needed to shrink `width` below `tolerance` when each step
/// divides the bracket by `ratio`, plus one.
fn iteration_limit(width: f64, tolerance: f64, ratio: f64) -> u32 {
    if !(width > tolerance) || !(tolerance > 0.0) {
        return 1;
    }
    let n = ((width / tolerance).ln() / ratio.ln()).ceil() + 1.0;
    n.min(MAX_ITERATIONS as f64) as u32
}

fn seconds(d: Duration) -> f64 {
    match d.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        None => d.num_milliseconds() as f64 / 1e3,
    }
}

fn shift(time: DateTime<Utc>, seconds: f64) -> DateTime<Utc> {
    time + Duration::microseconds((seconds * 1e6).round() as i64)
}

fn midpoint(a: DateTime<Utc>, b: DateTime<Utc>) -> DateTime<Utc> {
    a + (b - a) / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::scanner::{scan, DEFAULT_COARSE_STEP};
    use crate::predict::testing::SyntheticSky;

    fn refine_all(sky: &SyntheticSky, end_s: f64, step: Duration, min: f64) -> Vec<RefinedInterval> {
        let sampler = ElevationSampler::new(sky);
        let coarse = scan(&sampler, sky.at(0.0), sky.at(end_s), step, min).unwrap();
        let refiner = Refiner::new(&sampler, min, DEFAULT_FINE_TOLERANCE);
        coarse
            .candidates
            .iter()
            .map(|c| refiner.refine(&coarse.batch, c).unwrap())
            .collect()
    }

    #[test]
    fn iteration_limit_is_bounded() {
        assert_eq!(iteration_limit(300.0, 1.0, 2.0), 10);
        assert_eq!(iteration_limit(0.5, 1.0, 2.0), 1);
        assert_eq!(iteration_limit(1e300, 1e-300, 2.0), MAX_ITERATIONS);
        assert_eq!(iteration_limit(f64::NAN, 1.0, 2.0), 1);
    }

    #[test]
    fn crossings_and_peak_within_tolerance() {
        let sky = SyntheticSky::new().with_arc(3600.0, 400.0, 50.0);
        let (rise, set) = sky.arcs[0].crossings(10.0);

        let passes = refine_all(&sky, 7200.0, DEFAULT_COARSE_STEP, 10.0);
        assert_eq!(passes.len(), 1);
        let p = &passes[0];

        assert!((sky.offset(p.rise.time) - rise).abs() <= 0.5, "rise {}", sky.offset(p.rise.time));
        assert!((sky.offset(p.set.time) - set).abs() <= 0.5, "set {}", sky.offset(p.set.time));
        assert!((sky.offset(p.peak.time) - 3600.0).abs() <= 1.0);
        assert!((p.peak.elevation_deg - 50.0).abs() < 0.01);
        assert!((p.rise.elevation_deg - 10.0).abs() < 0.2);
        assert!(!p.low_confidence && !p.rise_truncated && !p.set_truncated);
        // Look angles come from the refined times.
        assert!((p.peak.azimuth_deg - (sky.offset(p.peak.time) / 10.0) % 360.0).abs() < 1e-9);
    }

    #[test]
    fn truncated_edges_report_window_bounds() {
        // Window opens mid-pass and closes mid-pass of a later one.
        let sky = SyntheticSky::new()
            .with_arc(100.0, 400.0, 40.0)
            .with_arc(5000.0, 400.0, 40.0);
        let passes = refine_all(&sky, 4900.0, DEFAULT_COARSE_STEP, 10.0);
        assert_eq!(passes.len(), 2);

        assert!(passes[0].rise_truncated);
        assert_eq!(passes[0].rise.time, sky.at(0.0));
        assert!(!passes[0].set_truncated);

        assert!(passes[1].set_truncated);
        assert_eq!(passes[1].set.time, sky.at(4900.0));
        assert!(!passes[1].rise_truncated);
        assert!(passes[1].peak.time < passes[1].set.time);
    }

    #[test]
    fn noisy_bracket_falls_back_to_coarse_boundary() {
        let sky = SyntheticSky::new()
            .with_arc(1000.0, 400.0, 40.0)
            .with_nan(680.0, 700.0);
        let passes = refine_all(&sky, 2000.0, Duration::seconds(60), 5.0);
        assert_eq!(passes.len(), 1);
        assert!(passes[0].low_confidence);
        assert_eq!(passes[0].rise.time, sky.at(720.0));
        let (_, set) = sky.arcs[0].crossings(5.0);
        assert!((sky.offset(passes[0].set.time) - set).abs() <= 0.5);
    }

    #[test]
    fn second_lobe_overrules_optimizer() {
        // A narrow high lobe beside a broad low one, inside one visible run.
        let sky = SyntheticSky::new()
            .with_arc(100.0, 60.0, 80.0)
            .with_arc(600.0, 600.0, 30.0);
        let passes = refine_all(&sky, 1500.0, Duration::seconds(60), 5.0);
        assert_eq!(passes.len(), 1);

        let p = &passes[0];
        assert!(p.low_confidence);
        assert!((sky.offset(p.peak.time) - 100.0).abs() <= 2.0, "peak at {}", sky.offset(p.peak.time));
        assert!(p.peak.elevation_deg > 79.9);
    }

    #[test]
    fn evaluations_stay_bounded() {
        let sky = SyntheticSky::new().with_arc(3600.0, 400.0, 50.0);
        let sampler = ElevationSampler::new(&sky);
        let coarse = scan(&sampler, sky.at(0.0), sky.at(86_400.0), DEFAULT_COARSE_STEP, 10.0).unwrap();
        let refiner = Refiner::new(&sampler, 10.0, DEFAULT_FINE_TOLERANCE);
        refiner.refine(&coarse.batch, &coarse.candidates[0]).unwrap();

        // 289 coarse points plus a few dozen refinement evaluations, versus
        // 86 401 for a 1 s scan of the day.
        assert!(sampler.evaluations() < 289 + 60, "{}", sampler.evaluations());
    }
}
