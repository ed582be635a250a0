use chrono::{DateTime, Duration, Utc};

use overhead::elements::OrbitalElementSet;
use overhead::predict::{
    find_passes, ObserverLocation, Pass, Propagator, SearchParams, Sgp4Propagator,
};

const ISS_TLE: &str = "ISS (ZARYA)
1 25544U 98067A   25278.49802050  .00011384  00000+0  20935-3 0  9990
2 25544  51.6327 120.3420 0000884 206.2421 153.8523 15.49697304532279
";

const MIN_ELEVATION_DEG: f64 = 5.0;

/// Rise, peak, peak elevation and set for the Delhi day above 5 degrees,
/// from an independent SGP4 evaluation at 0.1 s resolution.
const RECORDED: [(&str, &str, f64, &str); 6] = [
    ("2025-10-05T12:30:34Z", "2025-10-05T12:34:42Z", 44.080, "2025-10-05T12:38:49Z"),
    ("2025-10-06T01:57:38Z", "2025-10-06T01:59:39Z", 7.659, "2025-10-06T02:01:40Z"),
    ("2025-10-06T03:31:47Z", "2025-10-06T03:35:59Z", 56.904, "2025-10-06T03:40:12Z"),
    ("2025-10-06T05:12:00Z", "2025-10-06T05:13:20Z", 5.997, "2025-10-06T05:14:39Z"),
    ("2025-10-06T10:07:19Z", "2025-10-06T10:09:27Z", 7.879, "2025-10-06T10:11:35Z"),
    ("2025-10-06T11:42:24Z", "2025-10-06T11:46:39Z", 82.752, "2025-10-06T11:50:53Z"),
];

/// The 2.6 minute pass peaking at 6 degrees falls between 5 minute samples.
const MISSED_BY_DEFAULT_STEP: usize = 3;

fn window() -> (DateTime<Utc>, DateTime<Utc>) {
    let start: DateTime<Utc> = "2025-10-05T12:00:00Z".parse().unwrap();
    (start, start + Duration::hours(24))
}

fn propagator() -> Sgp4Propagator {
    let set = OrbitalElementSet::parse(25544, ISS_TLE, window().0).unwrap();
    let delhi = ObserverLocation::new(28.6139, 77.2090, 216.0).unwrap();
    Sgp4Propagator::new(&set, &delhi).unwrap()
}

fn delhi_passes(params: &SearchParams) -> Vec<Pass> {
    let (start, end) = window();
    find_passes(&propagator(), start, end, params).unwrap()
}

fn one_minute_step() -> SearchParams {
    SearchParams {
        coarse_step: Duration::seconds(60),
        ..SearchParams::with_min_elevation(MIN_ELEVATION_DEG)
    }
}

fn time(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn assert_matches_recorded(pass: &Pass, recorded: &(&str, &str, f64, &str)) {
    let (rise, peak, peak_el, set) = *recorded;
    let within = |a: DateTime<Utc>, b: &str| (a - time(b)).num_seconds().abs() <= 120;

    assert!(within(pass.rise_time, rise), "rise {} vs {}", pass.rise_time, rise);
    assert!(within(pass.peak_time, peak), "peak {} vs {}", pass.peak_time, peak);
    assert!(within(pass.set_time, set), "set {} vs {}", pass.set_time, set);
    assert!(
        (pass.peak_elevation_deg - peak_el).abs() <= 0.5,
        "peak elevation {} vs {}",
        pass.peak_elevation_deg,
        peak_el
    );
}

fn assert_well_formed(passes: &[Pass]) {
    let (start, end) = window();
    for pass in passes {
        assert!(pass.rise_time >= start && pass.set_time <= end);
        assert!(pass.rise_time < pass.peak_time && pass.peak_time < pass.set_time);
        assert!(pass.peak_elevation_deg >= MIN_ELEVATION_DEG);
        assert!(pass.duration_seconds > 60.0 && pass.duration_seconds < 600.0);
        assert!(pass.peak_range_km > 400.0 && pass.peak_range_km < 2_500.0);
        for az in [pass.rise_azimuth_deg, pass.peak_azimuth_deg, pass.set_azimuth_deg] {
            assert!((0.0..360.0).contains(&az));
        }
        assert!(!pass.low_confidence);
        assert!(!pass.rise_truncated && !pass.set_truncated);
    }
    for pair in passes.windows(2) {
        assert!(pair[0].set_time <= pair[1].rise_time);
    }
}

#[test]
fn default_step_matches_recorded_passes() {
    let passes = delhi_passes(&SearchParams::with_min_elevation(MIN_ELEVATION_DEG));
    assert!((4..=6).contains(&passes.len()), "{} passes", passes.len());
    assert_eq!(passes.len(), RECORDED.len() - 1);
    assert_well_formed(&passes);

    let expected = RECORDED
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != MISSED_BY_DEFAULT_STEP)
        .map(|(_, r)| r);
    for (pass, recorded) in passes.iter().zip(expected) {
        assert_matches_recorded(pass, recorded);
    }
}

#[test]
fn one_minute_step_matches_every_recorded_pass() {
    let passes = delhi_passes(&one_minute_step());
    assert_eq!(passes.len(), RECORDED.len());
    assert_well_formed(&passes);
    for (pass, recorded) in passes.iter().zip(RECORDED.iter()) {
        assert_matches_recorded(pass, recorded);
    }
}

#[test]
fn agrees_with_one_second_scan() {
    let propagator = propagator();
    let (start, _) = window();

    // (rise, set, peak elevation) of every run at or above the threshold.
    let mut runs: Vec<(DateTime<Utc>, DateTime<Utc>, f64)> = Vec::new();
    let mut open: Option<(DateTime<Utc>, DateTime<Utc>, f64)> = None;
    for i in 0..=86_400 {
        let t = start + Duration::seconds(i);
        let el = propagator.look_angles(t).unwrap().elevation_deg;
        open = match (el >= MIN_ELEVATION_DEG, open) {
            (true, None) => Some((t, t, el)),
            (true, Some((rise, _, best))) => Some((rise, t, best.max(el))),
            (false, Some(run)) => {
                runs.push(run);
                None
            }
            (false, None) => None,
        };
    }
    assert!(open.is_none());

    let passes = delhi_passes(&one_minute_step());
    assert_eq!(passes.len(), runs.len());
    for (pass, (rise, set, best)) in passes.iter().zip(runs) {
        // The scan reports the first and last visible whole second.
        assert!((pass.rise_time - rise).num_milliseconds().abs() <= 2_000);
        assert!((pass.set_time - set).num_milliseconds().abs() <= 2_000);
        assert!((pass.peak_elevation_deg - best).abs() < 0.05);
    }
}

#[test]
fn finer_step_agrees_with_default() {
    let coarse = delhi_passes(&SearchParams::with_min_elevation(MIN_ELEVATION_DEG));
    let fine = delhi_passes(&one_minute_step());

    assert!(fine.len() >= coarse.len());
    for pass in &coarse {
        let twin = fine
            .iter()
            .find(|f| (f.peak_time - pass.peak_time).num_seconds().abs() < 60)
            .expect("pass lost with a finer step");
        assert!((twin.rise_time - pass.rise_time).num_milliseconds().abs() <= 2_000);
        assert!((twin.set_time - pass.set_time).num_milliseconds().abs() <= 2_000);
        assert!((twin.peak_elevation_deg - pass.peak_elevation_deg).abs() < 0.1);
    }
}

#[test]
fn higher_threshold_keeps_a_subset() {
    let low = delhi_passes(&one_minute_step());
    let high = delhi_passes(&SearchParams {
        min_elevation_deg: 30.0,
        ..one_minute_step()
    });

    assert_eq!(high.len(), 3);
    for pass in &high {
        assert!(pass.peak_elevation_deg >= 30.0);
        let outer = low
            .iter()
            .find(|l| l.rise_time <= pass.rise_time && pass.set_time <= l.set_time)
            .expect("high pass not inside a low pass");
        assert!((outer.peak_elevation_deg - pass.peak_elevation_deg).abs() < 0.1);
    }
}

#[test]
fn identical_requests_give_identical_results() {
    let params = SearchParams::with_min_elevation(MIN_ELEVATION_DEG);
    assert_eq!(delhi_passes(&params), delhi_passes(&params));
}
