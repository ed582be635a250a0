use crate::predict::types::{Pass, RefinedInterval};

/// Turn refined intervals into the final pass list: time-ordered,
/// non-overlapping, every peak at or above `min_elevation_deg`.
pub fn assemble(intervals: Vec<RefinedInterval>, min_elevation_deg: f64) -> Vec<Pass> {
    let mut passes: Vec<Pass> = intervals
        .into_iter()
        .filter(|interval| {
            let keep = interval.peak.elevation_deg >= min_elevation_deg;
            if !keep {
                log::debug!(
                    "Dropping near-miss at {}: peak {:.2} deg below {:.2} deg",
                    interval.peak.time,
                    interval.peak.elevation_deg,
                    min_elevation_deg
                );
            }
            keep
        })
        .filter(|interval| {
            let ordered = interval.rise.time < interval.peak.time && interval.peak.time < interval.set.time;
            if !ordered {
                log::warn!(
                    "Dropping degenerate interval rise {} peak {} set {}",
                    interval.rise.time,
                    interval.peak.time,
                    interval.set.time
                );
            }
            ordered
        })
        .map(to_pass)
        .collect();

    if !passes.windows(2).all(|w| w[0].rise_time <= w[1].rise_time) {
        log::warn!("Refined passes arrived out of order; sorting");
        passes.sort_by_key(|p| p.rise_time);
    }

    let mut assembled: Vec<Pass> = Vec::with_capacity(passes.len());
    for pass in passes {
        if let Some(prev) = assembled.last() {
            if pass.rise_time < prev.set_time {
                log::warn!(
                    "Dropping pass rising at {} that overlaps the pass setting at {}",
                    pass.rise_time,
                    prev.set_time
                );
                continue;
            }
        }
        assembled.push(pass);
    }

    assembled
}

fn to_pass(interval: RefinedInterval) -> Pass {
    let duration = interval.set.time - interval.rise.time;
    let duration_seconds = match duration.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        None => duration.num_seconds() as f64,
    };

    Pass {
        rise_time: interval.rise.time,
        rise_azimuth_deg: interval.rise.azimuth_deg,
        peak_time: interval.peak.time,
        peak_elevation_deg: interval.peak.elevation_deg,
        peak_azimuth_deg: interval.peak.azimuth_deg,
        peak_range_km: interval.peak.range_km,
        set_time: interval.set.time,
        set_azimuth_deg: interval.set.azimuth_deg,
        duration_seconds,
        rise_truncated: interval.rise_truncated,
        set_truncated: interval.set_truncated,
        low_confidence: interval.low_confidence,
    }
}
