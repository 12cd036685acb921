use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use walkdir::WalkDir;

use crate::backend::lowercase_extension;

/// File extensions picked up as tracks.
pub const TRACK_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "gif"];

pub fn is_track(path: &Path) -> bool {
    TRACK_EXTENSIONS.contains(&lowercase_extension(path).as_str())
}

/// Tracks in `dir`, sorted by path. The directory is created if missing.
pub fn scan(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {:?}", dir))?;
        info!("created source directory {}", dir.display());
    }

    let mut walker = WalkDir::new(dir).min_depth(1);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut tracks: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_track(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    tracks.sort();

    Ok(tracks)
}

/// Blocks with a spinner until `dir` holds at least one track.
pub fn wait_for_tracks(dir: &Path, recursive: bool, interval: Duration) -> Result<Vec<PathBuf>> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")?);
    spinner.set_message(format!("No video files found in {:?}. Waiting for files...", dir));
    spinner.enable_steady_tick(Duration::from_millis(120));

    loop {
        let tracks = scan(dir, recursive)?;
        if !tracks.is_empty() {
            spinner.finish_and_clear();
            return Ok(tracks);
        }
        thread::sleep(interval);
    }
}
