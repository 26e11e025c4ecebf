use chrono::{DateTime, Duration, Local, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use track_o_mat::catalog::ElementCatalog;
use track_o_mat::predict::{build_time_series, filter_and_sort, window_stop, PassFinder, PredictError};
use track_o_mat::tracker::DryRunMount;
use track_o_mat::web::{self, Config};

#[derive(Parser)]
#[command(name = "track-o-mat")]
#[command(about = "Satellite pass prediction and tracking mount scheduling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an element file and list rejected groups
    Validate { file: PathBuf },
    /// Print upcoming passes for the configured station
    Passes {
        #[arg(long)]
        config: String,
        /// Comma-separated name filters
        #[arg(long)]
        search: Option<String>,
        /// Window start (RFC 3339), defaults to now
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// Window length in hours, defaults to the configured window
        #[arg(long)]
        hours: Option<f64>,
        /// Sample step in minutes
        #[arg(long)]
        step: Option<f64>,
        /// Minimum peak altitude in degrees
        #[arg(long)]
        min_alt: Option<f64>,
        /// Print times in the local time zone instead of UTC
        #[arg(long)]
        local: bool,
    },
    /// Run the HTTP API against a dry-run mount
    Serve {
        #[arg(long)]
        config: String,
    },
}

struct PassesArgs {
    search: Option<String>,
    start: Option<DateTime<Utc>>,
    hours: Option<f64>,
    step: Option<f64>,
    min_alt: Option<f64>,
    local: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file } => validate(&file),
        Commands::Passes {
            config,
            search,
            start,
            hours,
            step,
            min_alt,
            local,
        } => passes(
            &config,
            PassesArgs {
                search,
                start,
                hours,
                step,
                min_alt,
                local,
            },
        ),
        Commands::Serve { config } => serve(&config),
    }
}

fn load_config(path: &str) -> Option<Config> {
    match Config::from_file(path) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Config error: {}", e);
            None
        }
    }
}

fn validate(path: &Path) -> ExitCode {
    let mut catalog = ElementCatalog::new();
    let report = match catalog.load_file(path, false) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "{} element sets accepted ({} overwritten), {} groups rejected",
        report.added,
        report.replaced,
        report.errors.len()
    );
    for error in &report.errors {
        println!("  group {} (line {}): {}", error.group, error.line, error.error);
    }
    if report.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn passes(config_path: &str, args: PassesArgs) -> ExitCode {
    let Some(config) = load_config(config_path) else {
        return ExitCode::FAILURE;
    };

    let mut catalog = ElementCatalog::new();
    for (i, path) in config.predict.tle_files.iter().enumerate() {
        if let Err(e) = catalog.load_file(path, i > 0) {
            eprintln!("Error reading {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    }
    let terms: Vec<&str> = args
        .search
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    let records = if terms.is_empty() {
        catalog.search("")
    } else {
        catalog.search_any(&terms)
    };

    let start = args.start.unwrap_or_else(Utc::now);
    let stop = match window_length(args.hours, config.predict.window)
        .and_then(|window| window_stop(start, window))
    {
        Ok(stop) => stop,
        Err(e) => {
            eprintln!("Invalid window: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let step = args.step.unwrap_or_else(|| config.predict.step_minutes());
    let min_alt = args.min_alt.unwrap_or(config.predict.default_min_elevation);

    let mut finder = PassFinder::new();
    let report = config
        .station
        .site()
        .and_then(|site| finder.set_site(site.latitude_deg, site.longitude_deg, site.height_m))
        .and_then(|_| build_time_series(start, stop, step))
        .and_then(|series| finder.compute_passes(&records, &series, min_alt));
    let report = match report {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Prediction error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for failure in &report.failures {
        eprintln!("  skipped: {}", failure);
    }
    let passes = filter_and_sort(report.passes, min_alt);
    println!("Times in {}", if args.local { "local time" } else { "UTC" });
    println!(
        "{:<24} {:>6}  {:<20} {:<20} {:>6} {:>6}  {:<20}",
        "NAME", "NORAD", "RISE", "PEAK", "ALT", "AZ", "SET"
    );
    for pass in &passes {
        println!(
            "{:<24} {:>6}  {:<20} {:<20} {:>6.1} {:>6.1}  {:<20}",
            pass.record.display_name(),
            pass.record.catalog_number(),
            format_time(pass.rise().timestamp, args.local),
            format_time(pass.peak.timestamp, args.local),
            pass.peak.altitude_deg,
            pass.peak.azimuth_deg,
            format_time(pass.set().timestamp, args.local),
        );
    }
    println!("{} passes", passes.len());
    ExitCode::SUCCESS
}

/// Search window length: `hours` when given, else the configured window.
fn window_length(
    hours: Option<f64>,
    configured: std::time::Duration,
) -> Result<Duration, PredictError> {
    let length = match hours {
        Some(hours) => std::time::Duration::try_from_secs_f64(hours * 3600.0)
            .map_err(|e| PredictError::InvalidRange(format!("{hours} hours: {e}")))?,
        None => configured,
    };
    Duration::from_std(length).map_err(|e| PredictError::InvalidRange(e.to_string()))
}

fn format_time(t: DateTime<Utc>, local: bool) -> String {
    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";
    if local {
        t.with_timezone(&Local).format(FORMAT).to_string()
    } else {
        t.format(FORMAT).to_string()
    }
}

fn serve(config_path: &str) -> ExitCode {
    let Some(config) = load_config(config_path) else {
        return ExitCode::FAILURE;
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(web::run_server(config, Arc::new(DryRunMount::new()))) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_length() {
        let configured = std::time::Duration::from_secs(8 * 3600);
        assert_eq!(window_length(None, configured).unwrap(), Duration::hours(8));
        assert_eq!(window_length(Some(1.5), configured).unwrap(), Duration::minutes(90));
        for bad in [-1.0, f64::NAN, f64::INFINITY, 1e300] {
            assert!(matches!(
                window_length(Some(bad), configured),
                Err(PredictError::InvalidRange(_))
            ));
        }
    }

    #[test]
    fn test_format_time() {
        let t: DateTime<Utc> = "2021-05-07T12:34:56Z".parse().unwrap();
        assert_eq!(format_time(t, false), "2021-05-07 12:34:56");
        assert_eq!(
            format_time(t, true),
            t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
        );
    }
}
