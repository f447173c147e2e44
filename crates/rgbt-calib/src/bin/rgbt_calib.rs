//! End-to-end demo: runs a full calibration session against the synthetic
//! rig and prints the per-device results as JSON.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use rgbt_calib::chessboard::ChessboardDetector;
use rgbt_calib::core::{init_with_level, PatternSpec};
use rgbt_calib::synthetic::SyntheticRig;
use rgbt_calib::{SessionConfig, SessionController};

#[derive(Debug, Parser)]
#[command(version, about = "RGB-thermal calibration demo on a synthetic rig")]
struct Args {
    /// Directory receiving session metadata and result files.
    #[arg(long, default_value = "calib-out")]
    out: PathBuf,

    /// Session name (default: calibration_<unix timestamp>).
    #[arg(long)]
    name: Option<String>,

    /// Capture cycles to run.
    #[arg(long, default_value_t = 12)]
    frames: usize,

    /// Minimum valid correspondences before solving.
    #[arg(long, default_value_t = 10)]
    min_frames: usize,

    /// Internal corner columns of the board.
    #[arg(long, default_value_t = 9)]
    cols: usize,

    /// Internal corner rows of the board.
    #[arg(long, default_value_t = 6)]
    rows: usize,

    /// Square edge length in millimeters.
    #[arg(long, default_value_t = 25.0)]
    square_size: f64,

    /// Verbose logging.
    #[arg(long)]
    verbose: bool,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    init_with_level(level)?;

    let pattern = PatternSpec::new(args.cols, args.rows, args.square_size);
    let mut config = SessionConfig::new(&args.out);
    config.pattern = pattern;
    config.min_valid_frames = args.min_frames;

    let mut engine = SessionController::new(config, ChessboardDetector::default());
    let mut rig = SyntheticRig::new(pattern, args.frames);

    let info = engine.start(&["cam0".to_string()], args.name.as_deref())?;
    for _ in 0..args.frames {
        engine.capture_cycle(&mut rig)?;
    }

    let report = engine.compute(None)?;
    for (device, outcome) in &report.devices {
        match (&outcome.failure, &outcome.result) {
            (None, Some(result)) => println!("{}", serde_json::to_string_pretty(result)?),
            (Some(failure), _) => eprintln!("{device}: {failure}"),
            (None, None) => {}
        }
    }

    let end = engine.end()?;
    eprintln!(
        "session {} finished, files in {}",
        info.name,
        args.out.join(&info.name).display()
    );
    if !(report.success && end.success) {
        std::process::exit(2);
    }
    Ok(())
}
