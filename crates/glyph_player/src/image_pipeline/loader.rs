use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage};
use log::debug;

use super::frame::LuminanceFrame;
use crate::PlayerError;

/// Frame rate assumed for animations without usable timing.
const FALLBACK_FRAME_RATE: f64 = 10.0;

/// Open decoder for one source. Resources are released when dropped.
pub trait FrameDecoder {
    /// Native frames per second of the source.
    fn frame_rate(&self) -> f64;

    /// Total number of frames, as reported by the container.
    fn frame_count(&self) -> u64;

    /// Next frame in presentation order, `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<LuminanceFrame>, PlayerError>;
}

/// A single still image presented once.
pub struct StaticFrame {
    frame: Option<LuminanceFrame>,
}

impl StaticFrame {
    pub fn new(image: &DynamicImage) -> Result<Self, PlayerError> {
        let frame = LuminanceFrame::from_image(image, false)?;
        Ok(Self { frame: Some(frame) })
    }

    pub fn open(path: &Path) -> Result<Self, PlayerError> {
        let image = image::open(path)?;
        Self::new(&image)
    }
}

impl FrameDecoder for StaticFrame {
    fn frame_rate(&self) -> f64 {
        1.0
    }

    fn frame_count(&self) -> u64 {
        1
    }

    fn next_frame(&mut self) -> Result<Option<LuminanceFrame>, PlayerError> {
        Ok(self.frame.take())
    }
}

/// Animated GIF decoded up front and replayed at its average frame delay.
pub struct GifFrames {
    frames: VecDeque<LuminanceFrame>,
    frame_count: u64,
    frame_rate: f64,
}

impl GifFrames {
    pub fn open(path: &Path) -> Result<Self, PlayerError> {
        let file = BufReader::new(File::open(path)?);
        let decoder = GifDecoder::new(file)?;
        let frames = decoder.into_frames().collect_frames()?;

        let mut total_delay = Duration::ZERO;
        let mut luminance = VecDeque::with_capacity(frames.len());
        for frame in frames {
            total_delay += Duration::from(frame.delay());
            let image = DynamicImage::ImageRgba8(frame.into_buffer());
            luminance.push_back(LuminanceFrame::from_image(&image, false)?);
        }

        let frame_count = luminance.len() as u64;
        let frame_rate = average_frame_rate(frame_count, total_delay);
        debug!(
            "loaded {} gif frames at {:.2} fps from {}",
            frame_count,
            frame_rate,
            path.display()
        );

        Ok(Self { frames: luminance, frame_count, frame_rate })
    }
}

impl FrameDecoder for GifFrames {
    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn next_frame(&mut self) -> Result<Option<LuminanceFrame>, PlayerError> {
        Ok(self.frames.pop_front())
    }
}

fn average_frame_rate(frame_count: u64, total_delay: Duration) -> f64 {
    if frame_count == 0 || total_delay.is_zero() {
        return FALLBACK_FRAME_RATE;
    }

    frame_count as f64 / total_delay.as_secs_f64()
}
