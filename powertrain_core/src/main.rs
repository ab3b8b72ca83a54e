//! # Powertrain Scenario Runner
//!
//! Drives the powertrain core with a scripted driver against the point-mass
//! body from [`powertrain_core::sim`] and logs what happens.
//!
//! Loads an optional vehicle TOML (see [`powertrain_core::config`]); without
//! one the built-in defaults are used. With `--telemetry` one JSON
//! [`Telemetry`](powertrain_core::Telemetry) line per summary interval is
//! written to stdout.

use std::io::Write;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use powertrain_common::config::{ConfigError, LogLevel};
use powertrain_common::powertrain::events::PowertrainEvent;
use powertrain_common::powertrain::io::DriverInput;
use powertrain_common::powertrain::state::{DriveMode, ShiftMode};
use powertrain_core::Powertrain;
use powertrain_core::config::{LoadedConfig, load_config};
use powertrain_core::sim::LongitudinalBody;

/// Scripted driver behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Full throttle from a standstill in automatic mode.
    Launch,
    /// Top gear at 30 m/s in manual mode, part throttle, then pedal lift.
    CruiseLift,
    /// Brake pedal held from a standstill (automatic reverse), then throttle.
    Reverse,
    /// Engine switched off mid-run and restarted.
    EngineOff,
}

/// Powertrain scenario runner
#[derive(Parser, Debug)]
#[command(name = "powertrain_core")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Run a scripted driver against the powertrain simulation core")]
struct Args {
    /// Path to a vehicle configuration TOML. Defaults are used if omitted.
    #[arg(long, short, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Scenario to run.
    #[arg(long, value_enum, default_value_t = Scenario::Launch)]
    scenario: Scenario,

    /// Simulated duration [s].
    #[arg(long, default_value_t = 10.0)]
    duration: f64,

    /// Override the simulation rate [Hz].
    #[arg(long)]
    step_hz: Option<u32>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,

    /// Write JSON telemetry lines to stdout.
    #[arg(long)]
    telemetry: bool,
}

fn main() {
    let args = Args::parse();
    let loaded = match &args.config {
        Some(path) => load_config(path),
        None => Ok(LoadedConfig::default()),
    };
    let log_level = loaded
        .as_ref()
        .map(|l| l.runner.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);

    info!("Powertrain runner v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|loaded| run(&args, loaded));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }
}

fn run(args: &Args, mut loaded: LoadedConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(hz) = args.step_hz {
        if hz == 0 {
            return Err(Box::new(ConfigError::ValidationError("--step-hz must be positive".into())));
        }
        loaded.runner.step_hz = hz;
    }
    if !(args.duration.is_finite() && args.duration > 0.0) {
        return Err(Box::new(ConfigError::ValidationError("--duration must be positive".into())));
    }
    let runner = loaded.runner;
    let dt = runner.step_s();
    let ticks = (args.duration / dt).ceil() as u64;

    let mut powertrain = Powertrain::new(loaded.powertrain);
    if !powertrain.config_repairs().is_empty() {
        warn!(repairs = ?powertrain.config_repairs(), "running with repaired tunables");
    }
    let mut body = LongitudinalBody::new(runner.body.clone());

    if args.scenario == Scenario::CruiseLift {
        body = body.with_speed(30.0);
        powertrain.set_shift_mode(ShiftMode::Manual);
        let top = powertrain.table().top_gear();
        powertrain.engage_gear_immediate(top);
    }
    info!(
        scenario = ?args.scenario,
        step_hz = runner.step_hz,
        ticks,
        gear = %powertrain.gear_label(),
        "scenario start"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let interval = u64::from(runner.summary_interval.max(1));

    for tick in 0..ticks {
        let input = script(args.scenario, tick, dt);
        let cmd = powertrain.tick(dt, &input, &body.feedback());
        body.step(&cmd, dt);

        for event in powertrain.drain_events() {
            log_event(&powertrain, event);
        }

        if tick % interval == 0 {
            let t = powertrain.telemetry();
            info!(
                time = t.time,
                gear = %t.gear_label,
                rpm = t.engine_rpm,
                speed = body.speed(),
                torque = t.motor_torque,
                mode = ?t.mode,
                "tick"
            );
            if args.telemetry {
                writeln!(out, "{}", serde_json::to_string(&t)?)?;
            }
        }
    }

    let stats = powertrain.stats();
    info!(
        ticks = stats.tick_count,
        distance = body.distance(),
        final_speed = body.speed(),
        max_wheel_torque = stats.max_motor_torque,
        coupled_share = stats.mode_share(DriveMode::Coupled),
        shifting_share = stats.mode_share(DriveMode::ActiveShift),
        dropped_events = powertrain.events_dropped(),
        "scenario complete"
    );
    Ok(())
}

/// Driver input for `tick` of `scenario`.
fn script(scenario: Scenario, tick: u64, dt: f64) -> DriverInput {
    let t = tick as f64 * dt;
    let at = |seconds: f64| tick == (seconds / dt).round() as u64;
    match scenario {
        Scenario::Launch => DriverInput {
            throttle: 1.0,
            ..DriverInput::default()
        },
        Scenario::CruiseLift => DriverInput {
            throttle: if t < 3.0 { 0.3 } else { 0.0 },
            ..DriverInput::default()
        },
        Scenario::Reverse => {
            if t < 4.0 {
                DriverInput {
                    brake: 0.8,
                    ..DriverInput::default()
                }
            } else {
                DriverInput {
                    throttle: 0.6,
                    ..DriverInput::default()
                }
            }
        }
        Scenario::EngineOff => DriverInput {
            throttle: if (2.0..5.0).contains(&t) { 0.0 } else { 0.5 },
            engine_toggle: at(2.0) || at(5.0),
            ..DriverInput::default()
        },
    }
}

fn log_event(powertrain: &Powertrain, event: PowertrainEvent) {
    match event {
        PowertrainEvent::GearChanged { from, to } => info!(
            from = %powertrain.table().label(from),
            to = %powertrain.table().label(to),
            "gear changed"
        ),
        PowertrainEvent::EngineStarted => info!("engine started"),
        PowertrainEvent::EngineStopped => info!("engine stopped"),
        PowertrainEvent::LaunchStateChanged { from, to } => info!(?from, ?to, "launch control"),
    }
}

fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        match configured {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Logs go to stderr so telemetry lines on stdout stay machine-readable.
    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}
