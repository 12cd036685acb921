use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::TempPath;

use crate::ascii::grid::GlyphGrid;
use crate::ascii::palette::Palette;
use crate::image_pipeline::loader::FrameDecoder;
use crate::PlayerError;

/// Opens sources for decoding and pulls their audio out into a playable file.
pub trait MediaBackend {
    fn open(&mut self, source: &Path) -> Result<Box<dyn FrameDecoder>, PlayerError>;

    /// Audio track of `source`, `None` when it has none.
    fn extract_audio(&mut self, source: &Path) -> Result<Option<AudioArtifact>, PlayerError>;
}

/// Audio device driven by the controller. Playback itself runs on the
/// device's own thread.
pub trait AudioOutput {
    fn load(&mut self, path: &Path) -> Result<(), PlayerError>;
    fn play(&mut self);
    fn pause(&mut self);
    fn unpause(&mut self);

    /// Stops playback. Returns once the device no longer reads the loaded
    /// stream, so its backing file may be removed right after.
    fn stop(&mut self);
}

/// Silent output used when no device is available or audio is muted.
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioOutput for NullAudio {
    fn load(&mut self, _path: &Path) -> Result<(), PlayerError> {
        Ok(())
    }

    fn play(&mut self) {}

    fn pause(&mut self) {}

    fn unpause(&mut self) {}

    fn stop(&mut self) {}
}

/// Everything needed to draw one tick.
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    pub grid: &'a GlyphGrid,
    /// Glyph cell size in pixels.
    pub cell_size: (u16, u16),
    pub palette: &'a Palette,
    pub title: Option<&'a str>,
    pub progress: Option<&'a str>,
}

pub trait GlyphPresenter {
    fn present(&mut self, view: &FrameView<'_>) -> io::Result<()>;

    /// Shown while the playlist is empty.
    fn present_waiting(&mut self, message: &str) -> io::Result<()>;
}

/// Audio extracted for one session. Temporary files are deleted on release,
/// or on drop if the session unwinds before releasing.
#[derive(Debug)]
pub struct AudioArtifact {
    path: PathBuf,
    temp: Option<TempPath>,
}

impl AudioArtifact {
    /// Artifact owned by the session and removed afterwards.
    pub fn temporary(temp: TempPath) -> Self {
        Self { path: temp.to_path_buf(), temp: Some(temp) }
    }

    /// Existing file that outlives the session.
    pub fn persistent(path: PathBuf) -> Self {
        Self { path, temp: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes a temporary artifact. A file still locked by another process
    /// is left behind with a warning.
    pub fn release(mut self) {
        let Some(temp) = self.temp.take() else {
            return;
        };

        match temp.close() {
            Ok(()) => debug!("removed audio artifact {}", self.path.display()),
            Err(err) => {
                let warning = PlayerError::ResourceRelease { path: self.path.clone(), source: err };
                warn!("{warning}");
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn release_removes_temporary_file() {
        let temp = tempfile::Builder::new().suffix(".wav").tempfile().unwrap().into_temp_path();
        let artifact = AudioArtifact::temporary(temp);
        let path = artifact.path().to_path_buf();
        assert!(path.exists());

        artifact.release();
        assert!(!path.exists());
    }

    #[test]
    fn dropping_unreleased_artifact_still_cleans_up() {
        let temp = tempfile::Builder::new().suffix(".wav").tempfile().unwrap().into_temp_path();
        let artifact = AudioArtifact::temporary(temp);
        let path = artifact.path().to_path_buf();
        drop(artifact);
        assert!(!path.exists());
    }

    #[test]
    fn release_tolerates_missing_file() {
        let temp = tempfile::Builder::new().suffix(".wav").tempfile().unwrap().into_temp_path();
        fs::remove_file(&temp).unwrap();
        AudioArtifact::temporary(temp).release();
    }

    #[test]
    fn persistent_artifact_is_kept() {
        let file = tempfile::NamedTempFile::new().unwrap();
        AudioArtifact::persistent(file.path().to_path_buf()).release();
        assert!(file.path().exists());
    }
}
