use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use glyph_player::{AudioArtifact, FrameDecoder, LuminanceFrame, PlayerError};
use log::{debug, warn};

/// Decoded frames buffered ahead of presentation.
const FRAME_QUEUE_DEPTH: usize = 4;

/// Audio extraction target: 16-bit PCM, stereo.
const AUDIO_SAMPLE_RATE: u32 = 48_000;

/// Stream metadata, with `width` and `height` as displayed. ffmpeg applies
/// the rotation on decode, so a quarter turn swaps the coded dimensions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProbeInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub frame_count: u64,
    /// Clockwise display rotation in degrees, normalized to `0..360`.
    pub rotation: i64,
}

/// Reads stream metadata with `ffprobe`.
pub fn probe(path: &Path) -> Result<ProbeInfo, PlayerError> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-select_streams", "v:0", "-show_entries"])
        .arg(concat!(
            "stream=width,height,r_frame_rate,avg_frame_rate,nb_frames,duration",
            ":stream_tags=rotate:stream_side_data=rotation:format=duration"
        ))
        .args(["-of", "default=noprint_wrappers=1"])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|err| PlayerError::Decode(format!("failed to run ffprobe: {err}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PlayerError::Decode(format!("ffprobe failed: {}", stderr.trim())));
    }

    parse_probe(&String::from_utf8_lossy(&output.stdout))
}

/// Whether the source carries at least one audio stream.
pub fn has_audio(path: &Path) -> Result<bool, PlayerError> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-select_streams", "a", "-show_entries", "stream=index"])
        .args(["-of", "csv=p=0"])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|err| PlayerError::Audio(format!("failed to run ffprobe: {err}")))?;

    Ok(output.status.success() && !output.stdout.iter().all(u8::is_ascii_whitespace))
}

fn parse_probe(text: &str) -> Result<ProbeInfo, PlayerError> {
    let mut width = None;
    let mut height = None;
    let mut frame_rate = None;
    let mut frame_count = None;
    let mut duration = None;
    let mut rotate_tag = None;
    let mut display_rotation = None;

    for line in text.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };

        match key {
            "width" => width = value.parse::<u32>().ok(),
            "height" => height = value.parse::<u32>().ok(),
            "r_frame_rate" => frame_rate = parse_rate(value).or(frame_rate),
            "avg_frame_rate" if frame_rate.is_none() => frame_rate = parse_rate(value),
            "nb_frames" => frame_count = value.parse::<u64>().ok(),
            // Stream duration comes first; the container's only fills gaps.
            "duration" if duration.is_none() => duration = value.parse::<f64>().ok(),
            "TAG:rotate" => rotate_tag = parse_degrees(value),
            // The display matrix turns counter-clockwise, the legacy tag clockwise.
            "rotation" => display_rotation = parse_degrees(value).map(|degrees| -degrees),
            _ => (),
        }
    }

    let (Some(mut width), Some(mut height)) = (width, height) else {
        return Err(PlayerError::Decode("no video stream".into()));
    };
    let rotation = display_rotation.or(rotate_tag).unwrap_or(0).rem_euclid(360);
    if rotation % 180 == 90 {
        std::mem::swap(&mut width, &mut height);
    }

    let frame_rate = frame_rate.ok_or_else(|| PlayerError::Decode("unknown frame rate".into()))?;
    let frame_count = frame_count
        .or_else(|| duration.map(|seconds| (seconds * frame_rate).round() as u64))
        .ok_or_else(|| PlayerError::Decode("unknown frame count".into()))?;

    Ok(ProbeInfo { width, height, frame_rate, frame_count, rotation })
}

fn parse_degrees(value: &str) -> Option<i64> {
    let degrees = value.trim().parse::<f64>().ok()?;
    degrees.is_finite().then(|| degrees.round() as i64)
}

fn parse_rate(value: &str) -> Option<f64> {
    let rate = match value.split_once('/') {
        Some((numerator, denominator)) => {
            let numerator: f64 = numerator.parse().ok()?;
            let denominator: f64 = denominator.parse().ok()?;
            numerator / denominator
        },
        None => value.parse().ok()?,
    };

    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// `ffmpeg` child process piping grayscale frames at native resolution.
pub struct FfmpegDecoder {
    info: ProbeInfo,
    receiver: Option<mpsc::Receiver<Vec<u8>>>,
    worker: Option<JoinHandle<Result<(), String>>>,
    child: Child,
}

impl FfmpegDecoder {
    pub fn spawn(path: &Path) -> Result<Self, PlayerError> {
        let info = probe(path)?;
        let frame_size = (info.width as usize) * (info.height as usize);
        if frame_size == 0 {
            return Err(PlayerError::InvalidFrame);
        }

        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "gray", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| PlayerError::Decode(format!("failed to spawn ffmpeg: {err}")))?;

        let Some(mut stdout) = child.stdout.take() else {
            let _ = child.kill();
            return Err(PlayerError::Decode("failed to capture ffmpeg stdout".into()));
        };

        let (sender, receiver) = mpsc::sync_channel::<Vec<u8>>(FRAME_QUEUE_DEPTH);
        let worker = thread::Builder::new()
            .name("glyph-player-decoder".to_owned())
            .spawn(move || loop {
                let mut buffer = vec![0u8; frame_size];
                match stdout.read_exact(&mut buffer) {
                    Ok(()) => {
                        if sender.send(buffer).is_err() {
                            return Ok(());
                        }
                    },
                    Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
                    Err(err) => return Err(format!("failed to read from ffmpeg: {err}")),
                }
            });

        let worker = match worker {
            Ok(worker) => worker,
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PlayerError::Decode(format!("failed to spawn reader thread: {err}")));
            },
        };

        debug!(
            "decoding {} at {}x{} (rotated {}), {:.3} fps, {} frames",
            path.display(),
            info.width,
            info.height,
            info.rotation,
            info.frame_rate,
            info.frame_count
        );

        Ok(Self { info, receiver: Some(receiver), worker: Some(worker), child })
    }

    fn finish_worker(&mut self) -> Result<(), PlayerError> {
        let Some(handle) = self.worker.take() else {
            return Ok(());
        };

        match handle.join() {
            Ok(result) => result.map_err(PlayerError::Decode),
            Err(_) => Err(PlayerError::Decode("decoder thread panicked".into())),
        }
    }
}

impl FrameDecoder for FfmpegDecoder {
    fn frame_rate(&self) -> f64 {
        self.info.frame_rate
    }

    fn frame_count(&self) -> u64 {
        self.info.frame_count
    }

    fn next_frame(&mut self) -> Result<Option<LuminanceFrame>, PlayerError> {
        let Some(receiver) = &self.receiver else {
            return Ok(None);
        };

        match receiver.recv() {
            Ok(buffer) => {
                let (width, height) = (self.info.width, self.info.height);
                LuminanceFrame::from_raw(width, height, buffer).map(Some)
            },
            Err(_) => {
                self.receiver = None;
                self.finish_worker()?;
                Ok(None)
            },
        }
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        // Unblock the reader before killing the process it reads from.
        self.receiver = None;
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Err(err) = self.finish_worker() {
            debug!("decoder closed with error: {err}");
        }
    }
}

/// Extracts the audio track of `path` into a temporary PCM WAV file.
pub fn extract_audio(path: &Path) -> Result<Option<AudioArtifact>, PlayerError> {
    if !has_audio(path)? {
        debug!("{} has no audio stream", path.display());
        return Ok(None);
    }

    let temp = tempfile::Builder::new().prefix("glyph-player-").suffix(".wav").tempfile()?;
    let temp = temp.into_temp_path();
    let target: PathBuf = temp.to_path_buf();

    let status = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
        .arg(path)
        .args(["-vn", "-acodec", "pcm_s16le", "-ac", "2", "-ar"])
        .arg(AUDIO_SAMPLE_RATE.to_string())
        .arg(&target)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|err| PlayerError::Audio(format!("failed to run ffmpeg: {err}")))?;

    if !status.success() {
        warn!("audio extraction for {} exited with {status}", path.display());
        return Err(PlayerError::Audio(format!("ffmpeg exited with {status}")));
    }

    Ok(Some(AudioArtifact::temporary(temp)))
}
