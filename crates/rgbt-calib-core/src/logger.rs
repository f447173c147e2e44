//! Stderr logger for the calibration engine.
//!
//! One line per record, prefixed with the level and milliseconds since
//! initialization: `INFO  +01234ms session started ...`. Debug records
//! also carry the module path, since solver internals log at that level.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

struct EngineLogger {
    started: Instant,
}

impl Log for EngineLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let ms = self.started.elapsed().as_millis();
        let mut stderr = std::io::stderr().lock();
        let _ = if record.level() >= Level::Debug {
            writeln!(
                stderr,
                "{:<5} +{ms:05}ms {} {}",
                record.level(),
                record.target(),
                record.args()
            )
        } else {
            writeln!(stderr, "{:<5} +{ms:05}ms {}", record.level(), record.args())
        };
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<EngineLogger> = OnceLock::new();

/// Install the stderr logger at the given level.
///
/// Idempotent: the first call installs, later calls only adjust the level.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let (logger, first) = match LOGGER.get() {
        Some(logger) => (logger, false),
        None => (
            LOGGER.get_or_init(|| EngineLogger {
                started: Instant::now(),
            }),
            true,
        ),
    };
    if first {
        log::set_logger(logger)?;
    }
    log::set_max_level(level);
    Ok(())
}

/// Install a `tracing` subscriber instead of the plain logger, filtered by
/// `RUST_LOG` (default `info`).
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_timer(fmt::time::Uptime::default())
        .with_target(false)
        .try_init();
}
