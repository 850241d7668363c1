//! Stderr sink for the `log` facade.
//!
//! The level comes from `-v` flags when given, otherwise from `RUST_LOG`
//! (a bare level name such as `debug`), otherwise warnings only.

use log::{LevelFilter, Log, Metadata, Record};

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:>5}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

/// Map a `-v` count onto a level filter. Zero means "not given".
pub const fn level_for_verbosity(verbosity: u8) -> Option<LevelFilter> {
    match verbosity {
        0 => None,
        1 => Some(LevelFilter::Info),
        2 => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    }
}

fn level_from_env() -> Option<LevelFilter> {
    std::env::var("RUST_LOG").ok()?.trim().parse().ok()
}

/// Install the logger. Only the first call has any effect.
pub fn init(verbosity: u8) {
    let level = level_for_verbosity(verbosity)
        .or_else(level_from_env)
        .unwrap_or(LevelFilter::Warn);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
    log::debug!("logging at {level}");
}
