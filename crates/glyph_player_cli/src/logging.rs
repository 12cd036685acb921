use std::env;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{LevelFilter, Log, Metadata, Record};

/// Crates whose records are written; everything else is dropped.
const LOG_TARGETS: [&str; 2] = ["glyph_player", "glyph_player_cli"];

/// Log level for the `-q`/`-v` counts, `Warn` when neither is given.
pub fn level_filter(quiet: u8, verbose: u8) -> LevelFilter {
    match (quiet, verbose) {
        (2.., _) => LevelFilter::Off,
        (1, _) => LevelFilter::Error,
        (0, 0) => LevelFilter::Warn,
        (0, 1) => LevelFilter::Info,
        (0, 2) => LevelFilter::Debug,
        (0, _) => LevelFilter::Trace,
    }
}

/// Writes records to a file, since the terminal is busy drawing frames.
pub struct FileLogger {
    level: LevelFilter,
    file: Mutex<File>,
    start: Instant,
}

impl FileLogger {
    pub fn new(path: &Path, level: LevelFilter) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {:?}", path))?;
        Ok(Self { level, file: Mutex::new(file), start: Instant::now() })
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level && is_own_target(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.start.elapsed().as_secs_f64();
        let line = format!(
            "[{:>10.6}s] [{:<5}] [{}] {}\n",
            elapsed,
            record.level(),
            record.target(),
            record.args()
        );
        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(line.as_bytes());
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

fn is_own_target(target: &str) -> bool {
    let crate_name = target.split("::").next().unwrap_or(target);
    LOG_TARGETS.contains(&crate_name)
}

/// Installs the file logger and returns the file it writes to.
pub fn initialize(path: Option<PathBuf>, level: LevelFilter) -> Result<PathBuf> {
    let path = path
        .unwrap_or_else(|| env::temp_dir().join(format!("glyph-player-{}.log", process::id())));
    let logger = FileLogger::new(&path, level)?;

    log::set_boxed_logger(Box::new(logger)).context("logger already installed")?;
    log::set_max_level(level);

    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use log::Level;

    use super::*;

    #[test]
    fn verbosity_counts() {
        assert_eq!(level_filter(0, 0), LevelFilter::Warn);
        assert_eq!(level_filter(0, 1), LevelFilter::Info);
        assert_eq!(level_filter(0, 5), LevelFilter::Trace);
        assert_eq!(level_filter(1, 3), LevelFilter::Error);
        assert_eq!(level_filter(2, 0), LevelFilter::Off);
    }

    #[test]
    fn only_own_records_are_written() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let logger = FileLogger::new(file.path(), LevelFilter::Info).unwrap();

        let record = |target: &'static str, level: Level, message: &'static str| {
            logger.log(
                &Record::builder()
                    .target(target)
                    .level(level)
                    .args(format_args!("{message}"))
                    .build(),
            );
        };
        record("glyph_player::playback::controller", Level::Info, "kept");
        record("glyph_player_cli", Level::Warn, "also kept");
        record("glyph_player", Level::Debug, "too verbose");
        record("cpal::host", Level::Error, "foreign");
        logger.flush();

        let text = fs::read_to_string(file.path()).unwrap();
        assert!(text.contains("[INFO ] [glyph_player::playback::controller] kept"));
        assert!(text.contains("also kept"));
        assert!(!text.contains("too verbose"));
        assert!(!text.contains("foreign"));
    }
}
