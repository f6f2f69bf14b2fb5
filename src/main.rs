//! Drone autopilot: patrol and face tracking driven from a command console.

use anyhow::{Context, Result};
use clap::Parser;
use drone_autopilot::{
    app::DroneController,
    command::ControlCommand,
    config::{Config, EXAMPLE_CONFIG},
    face_detection::CascadeFaceDetector,
    flight::DryRunDriver,
    video::{CaptureInput, CaptureSource, RawPipeSource, VideoSource},
};
use log::{info, warn};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Patrol and face-tracking autopilot for a quadcopter", long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Camera index to use
    #[arg(long, default_value = "0")]
    camera: i32,

    /// Video file to process instead of a camera
    #[arg(short, long, conflicts_with = "raw_stdin")]
    video: Option<String>,

    /// Read raw BGR24 frames of the configured size from stdin
    #[arg(long)]
    raw_stdin: bool,

    /// Start with face tracking enabled
    #[arg(short, long)]
    track: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Write an example configuration file and exit
    #[arg(long, value_name = "PATH")]
    write_example_config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.write_example_config {
        std::fs::write(path, EXAMPLE_CONFIG)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Example configuration written to {}", path.display());
        return Ok(());
    }

    // Configuration is read before the logger exists so it can pick the log file.
    let loaded = args.config.as_ref().map(|path| (path, Config::from_file(path)));
    let config = match &loaded {
        Some((_, Ok(cfg))) => cfg.clone(),
        _ => Config::default(),
    };

    init_logging(&config, args.debug)?;
    info!("Drone autopilot starting");

    if let Some((path, Err(e))) = &loaded {
        warn!("Failed to load config file {}: {}. Using defaults.", path.display(), e);
    } else if let Some((path, Ok(_))) = &loaded {
        info!("Loaded configuration from: {}", path.display());
    }
    config.validate().context("Invalid configuration")?;

    let source: Box<dyn VideoSource> = if args.raw_stdin {
        info!("Reading raw frames from stdin");
        Box::new(RawPipeSource::new(io::stdin()))
    } else {
        let input = match args.video {
            Some(path) => CaptureInput::File(path),
            None => CaptureInput::Camera(args.camera),
        };
        Box::new(CaptureSource::open(input, config.video.width, config.video.height)?)
    };

    let detector = CascadeFaceDetector::new(&config.detector).context("Failed to load face detector")?;

    // No aircraft link is compiled in; commands are logged by the dry-run driver.
    let driver = Arc::new(DryRunDriver::new());
    let drone = DroneController::start(&config, driver, source, Box::new(detector))?;

    if args.track {
        drone.enable_tracking();
    }

    if args.raw_stdin {
        info!("Stdin carries video; running until the stream ends");
    } else {
        run_console(&drone)?;
    }

    drone.shutdown();
    Ok(())
}

/// Read one command per line from stdin until EOF or `quit`
fn run_console(drone: &DroneController) -> Result<()> {
    info!("Ready for commands (one per line, `quit` to exit)");
    for line in io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        match line.parse::<ControlCommand>() {
            Ok(command) => drone.dispatch(command),
            Err(e) => warn!("{}", e),
        }
    }
    Ok(())
}

fn init_logging(config: &Config, debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { config.logging.level.as_str() };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::new().default_filter_or(level));

    if let Some(path) = &config.logging.file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(TeeWriter {
            file,
            console: io::stderr(),
        })));
    }

    builder.init();
    Ok(())
}

/// Log sink writing every record to both the log file and stderr
struct TeeWriter {
    file: File,
    console: io::Stderr,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        self.console.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.console.flush()
    }
}
