use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info};

use super::clock::PlaybackClock;
use super::collaborators::{AudioArtifact, AudioOutput, MediaBackend};
use crate::image_pipeline::frame::LuminanceFrame;
use crate::image_pipeline::loader::FrameDecoder;
use crate::PlayerError;

/// Resources held while one track plays.
pub struct PlaybackSession {
    source: PathBuf,
    decoder: Box<dyn FrameDecoder>,
    audio: Option<AudioArtifact>,
    frame_rate: f64,
    clock: PlaybackClock,
}

impl PlaybackSession {
    /// Opens the decoder and loads the audio track of `source` into `output`.
    ///
    /// Nothing is started yet; every failure is reported as a track load error
    /// and whatever was acquired is dropped again.
    pub fn open(
        media: &mut dyn MediaBackend,
        output: &mut dyn AudioOutput,
        source: &Path,
        now: Instant,
    ) -> Result<Self, PlayerError> {
        let decoder = media.open(source).map_err(|err| PlayerError::track_load(source, err))?;
        let frame_rate = decoder.frame_rate();
        let frame_count = decoder.frame_count();
        let clock = PlaybackClock::from_frames(frame_count, frame_rate, now).ok_or_else(|| {
            PlayerError::track_load(source, format!("unusable frame rate {frame_rate}"))
        })?;

        let audio =
            media.extract_audio(source).map_err(|err| PlayerError::track_load(source, err))?;
        if let Some(artifact) = &audio {
            output.load(artifact.path()).map_err(|err| PlayerError::track_load(source, err))?;
        }

        info!(
            "loaded {} ({} frames at {:.2} fps, {})",
            source.display(),
            frame_count,
            frame_rate,
            if audio.is_some() { "with audio" } else { "silent" }
        );

        Ok(Self { source: source.to_path_buf(), decoder, audio, frame_rate, clock })
    }

    /// Starts audio and the clock together so both begin on the same tick.
    pub fn start(&mut self, output: &mut dyn AudioOutput, now: Instant) {
        self.clock = PlaybackClock::start(self.clock.total(), now);
        if self.has_audio() {
            output.play();
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn next_frame(&mut self) -> Result<Option<LuminanceFrame>, PlayerError> {
        self.decoder.next_frame()
    }

    pub fn pause(&mut self, output: &mut dyn AudioOutput, now: Instant) {
        if self.has_audio() {
            output.pause();
        }
        self.clock.pause(now);
    }

    pub fn resume(&mut self, output: &mut dyn AudioOutput, now: Instant) {
        if self.has_audio() {
            output.unpause();
        }
        self.clock.resume(now);
    }

    /// Stops audio, then closes the decoder and deletes the audio artifact.
    pub fn release(self, output: &mut dyn AudioOutput) {
        output.stop();

        let Self { source, decoder, audio, .. } = self;
        drop(decoder);
        if let Some(artifact) = audio {
            artifact.release();
        }

        debug!("released session for {}", source.display());
    }
}
