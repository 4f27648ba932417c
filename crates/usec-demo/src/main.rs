// Desktop tooling crate; the binary is its own documentation.
#![allow(missing_docs)]

mod commands;
mod frames;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use usec::mocks::MockBus;
use usec::{PassThrough, Session, SessionConfig, UpdateMode, PANEL_COUNT};

#[derive(Parser)]
#[command(name = "usec-demo")]
#[command(about = "Drive a four-panel usec e-ink controller", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON session config; missing keys keep their defaults
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Device node per panel, in panel order (repeat four times)
    #[arg(long = "device", value_name = "PATH", global = true)]
    devices: Vec<PathBuf>,
    /// Use the plain write-memory opcode instead of the fast one
    #[arg(long, global = true)]
    no_fast_write: bool,
    /// Run against an in-memory bus instead of the device nodes
    #[arg(long, global = true)]
    dry_run: bool,
    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print panel geometry, temperature and VCOM
    Info,
    /// Full-screen INIT update
    Clear,
    /// Upload an image and refresh the screen
    Show {
        /// Image covering the whole screen (any format; converted to 8-bit gray)
        image: PathBuf,
        /// Waveform mode: init, du, gc16, gl16, a2, du4
        #[arg(long, default_value_t = UpdateMode::Gc16)]
        mode: UpdateMode,
    },
    /// Status, clear, every image in a directory, clear
    Demo {
        /// Directory of .png/.bmp images
        #[arg(long, default_value = "images")]
        images: PathBuf,
        /// Pause before the final clear, in milliseconds
        #[arg(long, default_value_t = 2000)]
        pause_ms: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = session_config(&cli)?;
    if cli.dry_run {
        let bus = MockBus::new();
        let mut session = Session::open_with(&mut bus.opener(), config)
            .context("cannot initialize in-memory controller")?;
        run(&mut session, &cli.command)
    } else {
        run_device(config, &cli.command)
    }
}

#[cfg(target_os = "linux")]
fn run_device(config: SessionConfig, command: &Command) -> Result<()> {
    let mut session =
        Session::open_config(config).context("cannot initialize e-ink controller")?;
    run(&mut session, command)
}

#[cfg(not(target_os = "linux"))]
fn run_device(_config: SessionConfig, _command: &Command) -> Result<()> {
    Err(anyhow!(
        "SG_IO pass-through needs Linux; use --dry-run on this platform"
    ))
}

fn run<D: PassThrough>(session: &mut Session<D>, command: &Command) -> Result<()> {
    match command {
        Command::Info => commands::info(session),
        Command::Clear => commands::clear(session),
        Command::Show { image, mode } => commands::show(session, image, *mode),
        Command::Demo { images, pause_ms } => {
            commands::demo(session, images, Duration::from_millis(*pause_ms))
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Defaults, then the config file, then command-line overrides.
fn session_config(cli: &Cli) -> Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SessionConfig::default(),
    };
    if !cli.devices.is_empty() {
        config.device_paths = <[PathBuf; PANEL_COUNT]>::try_from(cli.devices.clone())
            .map_err(|given| {
                anyhow!(
                    "--device must be given {PANEL_COUNT} times (once per panel), got {}",
                    given.len()
                )
            })?;
    }
    if cli.no_fast_write {
        config.fast_write = false;
    }
    config.validate()?;
    Ok(config)
}

fn load_config(path: &Path) -> Result<SessionConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config '{}'", path.display()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
