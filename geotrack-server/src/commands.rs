//! Subcommand implementations
//!
//! Each command builds a [`SharedSource`] from the settings, runs the core
//! operation and renders the result.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use geotrack_core::{
    GeolocationPlatform, LocationError, PositionOptions, PositionSource, TrackingSession,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::cli::{AverageArgs, Cli, Command, FormatArgs, LocateArgs, ServeArgs, WatchArgs};
use crate::config::Settings;
use crate::gpsd::GpsdPlatform;
use crate::output::{self, AverageReport, Availability, FixReport, OutputFormat};
use crate::simulated::SimulatedPlatform;
use crate::web::{self, AppState, SharedSource};

/// Fold command line overrides into the loaded settings.
pub fn apply_overrides(cli: &Cli, settings: &mut Settings) -> anyhow::Result<()> {
    if let Some(address) = &cli.gpsd {
        let (host, port) = address
            .rsplit_once(':')
            .with_context(|| format!("--gpsd expects HOST:PORT, got '{}'", address))?;
        settings.gpsd.host = host.trim_start_matches('[').trim_end_matches(']').to_string();
        settings.gpsd.port = port
            .parse()
            .with_context(|| format!("Invalid gpsd port '{}'", port))?;
    }
    if let Some(fix) = cli.simulate {
        settings.simulation = Some(fix);
    }
    if cli.secure {
        settings.gpsd.assume_secure = Some(true);
    }
    Ok(())
}

/// Pick the platform the settings ask for.
pub fn build_source(settings: &Settings, runtime: Handle) -> SharedSource {
    let platform: Arc<dyn GeolocationPlatform> = match settings.simulation {
        Some(fix) => {
            log::info!(
                "Simulating position {:.6}, {:.6} ±{:.1}m",
                fix.latitude,
                fix.longitude,
                fix.accuracy_meters
            );
            Arc::new(SimulatedPlatform::new(fix, runtime))
        }
        None => {
            let gpsd = GpsdPlatform::new(&settings.gpsd, runtime);
            log::info!("Using gpsd at {}", gpsd.address());
            Arc::new(gpsd)
        }
    };
    PositionSource::from_shared(platform)
}

/// Error for a failed location operation, carrying the user-facing message.
fn location_failure(error: LocationError) -> anyhow::Error {
    anyhow::Error::new(error).context(format!("Location failed ({})", error.kind()))
}

pub fn check(source: &SharedSource, args: &FormatArgs) -> String {
    let result = source.check_availability();
    let availability = Availability {
        available: result.is_ok(),
        secure_context: source.is_secure_context(),
        error: result.err(),
    };
    output::render_availability(&availability, args.format())
}

pub async fn locate(source: &SharedSource, args: &LocateArgs) -> anyhow::Result<String> {
    let options = PositionOptions {
        enable_high_accuracy: !args.low_accuracy,
        timeout_ms: args.timeout_ms,
        maximum_age_ms: args.max_age_ms,
    };
    let sample = source
        .request_once(&options)
        .await
        .map_err(location_failure)?;
    let assessment = source.assess(&sample);

    Ok(output::render_fix(
        &FixReport { sample, assessment },
        args.output.format(),
    ))
}

pub async fn average(
    source: &SharedSource,
    settings: &Settings,
    args: &AverageArgs,
) -> anyhow::Result<String> {
    let count = args.count.unwrap_or(settings.averaging.count);
    let interval = args
        .interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| settings.averaging.interval());
    log::info!(
        "Taking {} readings {}ms apart",
        count.max(1),
        interval.as_millis()
    );

    let reading = source
        .get_multiple_readings(count, interval)
        .await
        .map_err(location_failure)?;
    let assessment = source.assess(&reading.to_sample());

    Ok(output::render_average(
        &AverageReport {
            reading,
            assessment,
        },
        args.output.format(),
    ))
}

enum WatchEvent {
    Sample(FixReport),
    Error(LocationError),
}

/// Print tracked samples until Ctrl-C or the sample limit.
pub async fn watch(source: &SharedSource, args: &WatchArgs) -> anyhow::Result<()> {
    let format: OutputFormat = args.output.format();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let error_tx = tx.clone();
    let assessor = source.clone();

    let mut session = TrackingSession::new(source.clone());
    let started = session.start(
        move |sample| {
            let assessment = assessor.assess(&sample);
            let _ = tx.send(WatchEvent::Sample(FixReport { sample, assessment }));
        },
        move |error| {
            let _ = error_tx.send(WatchEvent::Error(error));
        },
    );
    if started.is_none() {
        return Err(location_failure(LocationError::Unavailable));
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut printed = 0u64;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                log::info!("Interrupted");
                break;
            }
            event = rx.recv() => match event {
                Some(WatchEvent::Sample(report)) => {
                    println!("{}", output::render_watch_line(&report, format));
                    printed += 1;
                    if args.limit.is_some_and(|limit| printed >= limit) {
                        break;
                    }
                }
                Some(WatchEvent::Error(error)) => log::warn!("{}", error.user_message()),
                None => break,
            },
        }
    }

    session.stop();
    log::info!(
        "Tracking stopped: {} samples, {} errors",
        session.samples_received(),
        session.errors_received()
    );
    Ok(())
}

pub async fn serve(source: SharedSource, settings: &Settings, args: &ServeArgs) -> anyhow::Result<()> {
    let bind = args.bind.unwrap_or(settings.http.bind);
    web::serve(bind, AppState::new(source, settings.averaging)).await
}

/// Run the parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    apply_overrides(&cli, &mut settings)?;
    let source = build_source(&settings, Handle::current());

    match &cli.command {
        Command::Check(args) => println!("{}", check(&source, args)),
        Command::Locate(args) => println!("{}", locate(&source, args).await?),
        Command::Average(args) => println!("{}", average(&source, &settings, args).await?),
        Command::Watch(args) => watch(&source, args).await?,
        Command::Serve(args) => serve(source, &settings, args).await?,
    }
    Ok(())
}
