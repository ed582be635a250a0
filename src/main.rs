use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;

use overhead::config::{parse_duration, Config};
use overhead::elements::ElementCache;
use overhead::predict::{ObserverLocation, SearchParams, MAX_WINDOW};
use overhead::predictor::{Prediction, Predictor};
use overhead::web::run_server;

#[derive(Parser)]
#[command(name = "overhead")]
#[command(about = "Satellite pass prediction")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict passes of one satellite
    Predict(PredictArgs),
    /// Serve the HTTP API
    Serve,
}

#[derive(Args)]
struct PredictArgs {
    /// NORAD catalog number
    #[arg(long)]
    norad: u32,
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,
    /// Observer altitude in metres
    #[arg(long, allow_hyphen_values = true)]
    alt: Option<f64>,
    /// Window start (RFC3339, default now)
    #[arg(long)]
    start: Option<String>,
    /// Window length in hours
    #[arg(long, conflicts_with = "end")]
    hours: Option<f64>,
    /// Window end (RFC3339)
    #[arg(long)]
    end: Option<String>,
    #[arg(long)]
    min_elev: Option<f64>,
    /// Coarse scan step, e.g. "5m"
    #[arg(long)]
    coarse_step: Option<String>,
    /// Crossing tolerance, e.g. "1s"
    #[arg(long)]
    tolerance: Option<String>,
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    match cli.command {
        Commands::Predict(args) => predict(&config, args).await,
        Commands::Serve => serve(config).await,
    }
}

async fn predict(config: &Config, args: PredictArgs) -> ExitCode {
    let request = match build_request(config, &args) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Invalid arguments: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let source = match config.element_source() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Invalid element source: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let policy = match config.cache_policy() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Invalid cache settings: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let predictor = Predictor::new(ElementCache::new(source, policy));

    let result = predictor
        .predict_passes(
            args.norad,
            &request.observer,
            request.start,
            request.end,
            &request.params,
        )
        .await;

    match result {
        Ok(prediction) => {
            if args.json {
                match serde_json::to_string_pretty(&prediction) {
                    Ok(s) => println!("{}", s),
                    Err(e) => {
                        eprintln!("Error encoding JSON: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                print_table(&prediction);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Prediction failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Config) -> ExitCode {
    match run_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

struct Request {
    observer: ObserverLocation,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    params: SearchParams,
}

fn build_request(config: &Config, args: &PredictArgs) -> Result<Request, String> {
    let observer = match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => {
            ObserverLocation::new(lat, lon, args.alt.unwrap_or(config.observer.altitude_m))
                .map_err(|e| e.to_string())?
        }
        (None, None) => config.observer().map_err(|e| e.to_string())?,
        _ => return Err("--lat and --lon must be given together".into()),
    };

    let start = match &args.start {
        Some(s) => parse_time(s)?,
        None => Utc::now(),
    };
    let end = match (&args.end, args.hours) {
        (Some(s), _) => parse_time(s)?,
        (None, Some(h)) => window_end(start, h)?,
        (None, None) => window_end(start, 24.0)?,
    };

    let mut params = config.search_params().map_err(|e| e.to_string())?;
    if let Some(min) = args.min_elev {
        params.min_elevation_deg = min;
    }
    if let Some(step) = &args.coarse_step {
        params.coarse_step = parse_chrono_duration(step)?;
    }
    if let Some(tol) = &args.tolerance {
        params.fine_tolerance = parse_chrono_duration(tol)?;
    }

    Ok(Request {
        observer,
        start,
        end,
        params,
    })
}

/// End of a window `hours` long, at most [`MAX_WINDOW`].
fn window_end(start: DateTime<Utc>, hours: f64) -> Result<DateTime<Utc>, String> {
    let max_hours = MAX_WINDOW.num_hours() as f64;
    if !hours.is_finite() || hours <= 0.0 || hours > max_hours {
        return Err(format!(
            "--hours must be greater than 0 and at most {}, got {}",
            max_hours, hours
        ));
    }
    Duration::try_milliseconds((hours * 3_600_000.0).round() as i64)
        .and_then(|length| start.checked_add_signed(length))
        .ok_or_else(|| format!("{} hours from {} is out of range", hours, start))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("{}: {}", s, e))
}

fn parse_chrono_duration(s: &str) -> Result<Duration, String> {
    let d = parse_duration(s).map_err(|e| format!("{}: {}", s, e))?;
    Duration::from_std(d).map_err(|e| format!("{}: {}", s, e))
}

fn print_table(prediction: &Prediction) {
    println!(
        "{} (NORAD {}), elements epoch {}{}",
        prediction.satellite,
        prediction.catalog_id,
        prediction.elements_epoch.format("%Y-%m-%d %H:%M:%S"),
        if prediction.freshness.is_stale() {
            " [stale]"
        } else {
            ""
        }
    );

    if prediction.passes.is_empty() {
        println!("No passes in window");
        return;
    }

    println!(
        "{:<20} {:>6}  {:<20} {:>6} {:>6}  {:<20} {:>6}  {:>6}",
        "Rise (UTC)", "Az", "Peak (UTC)", "El", "Az", "Set (UTC)", "Az", "Dur"
    );
    for pass in &prediction.passes {
        let mut flags = String::new();
        if pass.rise_truncated {
            flags.push_str(" <");
        }
        if pass.set_truncated {
            flags.push_str(" >");
        }
        if pass.low_confidence {
            flags.push_str(" ?");
        }
        println!(
            "{:<20} {:>6.1}  {:<20} {:>6.1} {:>6.1}  {:<20} {:>6.1}  {:>5}s{}",
            pass.rise_time.format("%Y-%m-%d %H:%M:%S"),
            pass.rise_azimuth_deg,
            pass.peak_time.format("%Y-%m-%d %H:%M:%S"),
            pass.peak_elevation_deg,
            pass.peak_azimuth_deg,
            pass.set_time.format("%Y-%m-%d %H:%M:%S"),
            pass.set_azimuth_deg,
            pass.duration_seconds.round() as i64,
            flags
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        "2025-10-05T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn window_end_accepts_fractional_hours() {
        assert_eq!(window_end(t0(), 1.5).unwrap(), t0() + Duration::minutes(90));
        assert_eq!(window_end(t0(), 168.0).unwrap(), t0() + MAX_WINDOW);
    }

    #[test]
    fn window_end_rejects_unusable_hours() {
        for hours in [f64::NAN, f64::INFINITY, -1.0, 0.0, 168.5, 1e300] {
            assert!(window_end(t0(), hours).is_err(), "{hours}");
        }
        assert!(window_end(DateTime::<Utc>::MAX_UTC, 1.0).is_err());
    }
}
