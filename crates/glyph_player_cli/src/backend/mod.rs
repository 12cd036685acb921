use std::path::Path;

use glyph_player::{AudioArtifact, FrameDecoder, GifFrames, MediaBackend, PlayerError, StaticFrame};

pub mod audio;
pub mod ffmpeg;

/// Extensions decoded in-process by the `image` crate.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

/// Media backend used by the binary: GIFs and stills go through `image`,
/// everything else through an `ffmpeg` child process.
#[derive(Debug, Default)]
pub struct FfmpegBackend {
    mute: bool,
}

impl FfmpegBackend {
    pub fn new(mute: bool) -> Self {
        Self { mute }
    }
}

impl MediaBackend for FfmpegBackend {
    fn open(&mut self, source: &Path) -> Result<Box<dyn FrameDecoder>, PlayerError> {
        let extension = lowercase_extension(source);
        if extension == "gif" {
            Ok(Box::new(GifFrames::open(source)?))
        } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            Ok(Box::new(StaticFrame::open(source)?))
        } else {
            Ok(Box::new(ffmpeg::FfmpegDecoder::spawn(source)?))
        }
    }

    fn extract_audio(&mut self, source: &Path) -> Result<Option<AudioArtifact>, PlayerError> {
        let extension = lowercase_extension(source);
        if self.mute || extension == "gif" || IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return Ok(None);
        }

        ffmpeg::extract_audio(source)
    }
}

pub fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}
