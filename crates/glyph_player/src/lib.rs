mod ascii;
mod config;
mod image_pipeline;
mod playback;

use std::fmt::Display;
use std::path::{Path, PathBuf};

pub use ascii::{
    drip::{step_with as drip_step_with, DripEffect, DEFAULT_DRIP_PROBABILITY},
    grid::{GlyphGrid, BLANK},
    mapping::GlyphConverter,
    overlay::{progress_line, title_for, to_morse, TitleStyle},
    palette::{Palette, Rgb, HIGHLIGHT, WHITE},
    ramp::GlyphRamp,
};
pub use config::PlayerConfig;
pub use image_pipeline::{
    frame::LuminanceFrame,
    loader::{FrameDecoder, GifFrames, StaticFrame},
};
pub use playback::{
    clock::{FramePacer, PlaybackClock},
    collaborators::{AudioArtifact, AudioOutput, FrameView, GlyphPresenter, MediaBackend, NullAudio},
    controller::{PlaybackController, PlaybackState, TickOutcome},
    event::InputEvent,
    sequencer::TrackSequencer,
    session::PlaybackSession,
};

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("failed to load track {}: {reason}", track.display())]
    TrackLoad { track: PathBuf, reason: String },
    #[error("frame is empty or has a zero dimension")]
    InvalidFrame,
    #[error("invalid target grid {columns}x{rows}")]
    InvalidTarget { columns: u16, rows: u16 },
    #[error("playlist is empty")]
    NoTracks,
    #[error("glyph ramp must contain at least one glyph")]
    EmptyRamp,
    #[error("glyph ramp repeats {0:?}")]
    DuplicateGlyph(char),
    #[error("could not remove {}: {source}", path.display())]
    ResourceRelease { path: PathBuf, source: std::io::Error },
    #[error("decoder failed: {0}")]
    Decode(String),
    #[error("audio failed: {0}")]
    Audio(String),
    #[error("failed to load image: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PlayerError {
    pub fn track_load(track: &Path, reason: impl Display) -> Self {
        Self::TrackLoad { track: track.to_path_buf(), reason: reason.to_string() }
    }
}
