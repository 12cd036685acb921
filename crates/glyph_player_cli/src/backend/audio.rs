use std::fs::File;
use std::io::BufReader;
use std::mem;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use glyph_player::{AudioOutput, PlayerError};
use log::{debug, error, info, warn};

/// Frames per chunk handed from the reader thread to the device callback.
const CHUNK_FRAMES: usize = 2048;

/// Chunks buffered ahead of the device, roughly a third of a second at 48 kHz.
const CHUNK_QUEUE_DEPTH: usize = 8;

/// Reader back-off while the queue is full.
const FEED_BACKOFF: Duration = Duration::from_millis(5);

type WavFile = hound::WavReader<BufReader<File>>;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct StereoFrame {
    left: f32,
    right: f32,
}

impl StereoFrame {
    fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            left: self.left + (other.left - self.left) * t,
            right: self.right + (other.right - self.right) * t,
        }
    }
}

/// Linear interpolation between neighbouring frames, one input frame at a time.
struct LinearResampler {
    /// Source frames advanced per output frame.
    step: f64,
    position: f64,
    previous: Option<StereoFrame>,
}

impl LinearResampler {
    fn new(source_rate: u32, target_rate: u32) -> Self {
        let step = if source_rate == 0 || target_rate == 0 {
            1.0
        } else {
            f64::from(source_rate) / f64::from(target_rate)
        };
        Self { step, position: 0.0, previous: None }
    }

    fn push(&mut self, frame: StereoFrame, out: &mut Vec<StereoFrame>) {
        let Some(previous) = self.previous.replace(frame) else {
            return;
        };

        while self.position < 1.0 {
            out.push(previous.lerp(frame, self.position as f32));
            self.position += self.step;
        }
        self.position -= 1.0;
    }

    /// Holds the last frame for the remainder of its period.
    fn finish(&mut self, out: &mut Vec<StereoFrame>) {
        let Some(last) = self.previous.take() else {
            return;
        };

        while self.position < 1.0 {
            out.push(last);
            self.position += self.step;
        }
    }
}

/// Samples of `reader` scaled to `-1.0..=1.0`.
fn normalized_samples(reader: WavFile) -> Box<dyn Iterator<Item = hound::Result<f32>> + Send> {
    let spec = reader.spec();
    match spec.sample_format {
        hound::SampleFormat::Float => Box::new(reader.into_samples::<f32>()),
        hound::SampleFormat::Int => {
            let max = (1i64 << spec.bits_per_sample.saturating_sub(1)) as f32;
            Box::new(reader.into_samples::<i32>().map(move |sample| sample.map(|v| v as f32 / max)))
        },
    }
}

/// Reads `reader` to the end, sending stereo chunks at `target_rate`.
///
/// Returns early once the receiving side is gone, or once `cancel` is set
/// while the queue is full.
fn stream_wav(
    reader: WavFile,
    target_rate: u32,
    sender: &SyncSender<Vec<StereoFrame>>,
    cancel: &AtomicBool,
) -> hound::Result<()> {
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));
    let mut resampler = LinearResampler::new(spec.sample_rate, target_rate);

    let mut chunk = Vec::with_capacity(CHUNK_FRAMES * 2);
    let mut frame = Vec::with_capacity(channels);
    for sample in normalized_samples(reader) {
        frame.push(sample?);
        if frame.len() < channels {
            continue;
        }

        // Mono is duplicated, channels past the first two are dropped.
        let left = frame[0];
        let right = frame.get(1).copied().unwrap_or(left);
        frame.clear();

        resampler.push(StereoFrame { left, right }, &mut chunk);
        if chunk.len() >= CHUNK_FRAMES && !send_chunk(sender, mem::take(&mut chunk), cancel) {
            return Ok(());
        }
    }

    resampler.finish(&mut chunk);
    if !chunk.is_empty() {
        send_chunk(sender, chunk, cancel);
    }

    Ok(())
}

/// Whether the chunk was queued; `false` means the reader should stop.
fn send_chunk(
    sender: &SyncSender<Vec<StereoFrame>>,
    mut chunk: Vec<StereoFrame>,
    cancel: &AtomicBool,
) -> bool {
    loop {
        match sender.try_send(chunk) {
            Ok(()) => return true,
            Err(TrySendError::Disconnected(_)) => return false,
            Err(TrySendError::Full(rejected)) => {
                if cancel.load(Ordering::Acquire) {
                    return false;
                }
                chunk = rejected;
                thread::sleep(FEED_BACKOFF);
            },
        }
    }
}

/// Device side of a stream, owned by the output callback.
struct Feed {
    receiver: Receiver<Vec<StereoFrame>>,
    chunk: Vec<StereoFrame>,
    position: usize,
    paused: Arc<AtomicBool>,
}

impl Feed {
    fn new(receiver: Receiver<Vec<StereoFrame>>, paused: Arc<AtomicBool>) -> Self {
        Self { receiver, chunk: Vec::new(), position: 0, paused }
    }

    /// Fills one interleaved output block. Paused, underrun and exhausted
    /// feeds all render silence.
    fn render(&mut self, data: &mut [f32], channels: usize) {
        if self.paused.load(Ordering::Acquire) {
            data.fill(0.0);
            return;
        }

        for out in data.chunks_mut(channels) {
            let frame = self.next_frame().unwrap_or_default();
            match out {
                [mono] => *mono = (frame.left + frame.right) * 0.5,
                [left, right, rest @ ..] => {
                    *left = frame.left;
                    *right = frame.right;
                    rest.fill(0.0);
                },
                [] => (),
            }
        }
    }

    fn next_frame(&mut self) -> Option<StereoFrame> {
        while self.position >= self.chunk.len() {
            self.chunk = self.receiver.try_recv().ok()?;
            self.position = 0;
        }

        let frame = self.chunk[self.position];
        self.position += 1;
        Some(frame)
    }
}

/// A playing stream and the thread reading its file.
struct Playback {
    stream: cpal::Stream,
    paused: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    worker: JoinHandle<hound::Result<()>>,
}

impl Playback {
    /// Stops the device and waits until the file is closed.
    fn finish(self) {
        let Playback { stream, cancel, worker, .. } = self;
        cancel.store(true, Ordering::Release);
        drop(stream);

        match worker.join() {
            Ok(Ok(())) => (),
            Ok(Err(err)) => warn!("audio reader stopped early: {err}"),
            Err(_) => error!("audio reader thread panicked"),
        }
    }
}

/// Output device driven through `cpal`, streaming WAV files from disk.
pub struct CpalAudio {
    device: cpal::Device,
    config: cpal::StreamConfig,
    pending: Option<WavFile>,
    playback: Option<Playback>,
}

impl CpalAudio {
    /// Opens the output device matching `wanted` by name, or the default one.
    pub fn open(wanted: Option<&str>) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = match wanted.and_then(|wanted| find_output_device(&host, wanted)) {
            Some(device) => device,
            None => {
                if let Some(wanted) = wanted {
                    warn!("no audio output matches {wanted:?}, using the default device");
                }
                host.default_output_device().context("no default output device")?
            },
        };
        let supported = device.default_output_config().context("no default output config")?;

        match supported.sample_format() {
            cpal::SampleFormat::F32 => (),
            format => anyhow::bail!("unsupported sample format {format:?} (only f32 supported)"),
        }

        let config: cpal::StreamConfig = supported.into();
        info!(
            "audio output {} at {} Hz, {} channels",
            device_name(&device),
            config.sample_rate,
            config.channels
        );

        Ok(Self { device, config, pending: None, playback: None })
    }

    fn start(&self, reader: WavFile) -> anyhow::Result<Playback> {
        let (sender, receiver) = mpsc::sync_channel(CHUNK_QUEUE_DEPTH);
        let paused = Arc::new(AtomicBool::new(false));
        let mut feed = Feed::new(receiver, paused.clone());

        let channels = usize::from(self.config.channels);
        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| feed.render(data, channels),
                |err| error!("audio output stream error: {err}"),
                None,
            )
            .context("failed to build audio stream")?;

        let cancel = Arc::new(AtomicBool::new(false));
        let target_rate = self.config.sample_rate;
        let worker = {
            let cancel = cancel.clone();
            thread::Builder::new()
                .name("glyph-player-audio".to_owned())
                .spawn(move || stream_wav(reader, target_rate, &sender, &cancel))
                .context("failed to spawn audio reader")?
        };

        let playback = Playback { stream, paused, cancel, worker };
        if let Err(err) = playback.stream.play() {
            playback.finish();
            anyhow::bail!("failed to start audio stream: {err}");
        }

        Ok(playback)
    }
}

impl AudioOutput for CpalAudio {
    fn load(&mut self, path: &Path) -> Result<(), PlayerError> {
        self.stop();

        let reader = hound::WavReader::open(path).map_err(|err| {
            PlayerError::Audio(format!("failed to open {}: {err}", path.display()))
        })?;
        let spec = reader.spec();
        if spec.channels == 0 {
            return Err(PlayerError::Audio("WAV file declares zero channels".into()));
        }

        debug!(
            "streaming {} ({} Hz, {} channels, {} frames)",
            path.display(),
            spec.sample_rate,
            spec.channels,
            reader.duration()
        );
        self.pending = Some(reader);

        Ok(())
    }

    fn play(&mut self) {
        let Some(reader) = self.pending.take() else {
            warn!("play requested without a loaded track");
            return;
        };

        match self.start(reader) {
            Ok(playback) => self.playback = Some(playback),
            Err(err) => error!("{err:#}"),
        }
    }

    fn pause(&mut self) {
        if let Some(playback) = &self.playback {
            playback.paused.store(true, Ordering::Release);
        }
    }

    fn unpause(&mut self) {
        if let Some(playback) = &self.playback {
            playback.paused.store(false, Ordering::Release);
        }
    }

    fn stop(&mut self) {
        // The file is closed once this returns.
        self.pending = None;
        if let Some(playback) = self.playback.take() {
            playback.finish();
        }
    }
}

impl Drop for CpalAudio {
    fn drop(&mut self) {
        self.stop();
    }
}

#[allow(deprecated)]
fn device_name(device: &cpal::Device) -> String {
    device.name().unwrap_or_else(|_| "unknown device".to_owned())
}

fn find_output_device(host: &cpal::Host, wanted: &str) -> Option<cpal::Device> {
    let devices = match host.output_devices() {
        Ok(devices) => devices,
        Err(err) => {
            warn!("failed to list audio outputs: {err}");
            return None;
        },
    };

    pick_device(devices.map(|device| (device_name(&device), device)), wanted)
}

/// Case-insensitive lookup by name; an exact match wins over the first
/// name containing `wanted`.
fn pick_device<D>(devices: impl IntoIterator<Item = (String, D)>, wanted: &str) -> Option<D> {
    let wanted = wanted.trim().to_lowercase();
    let mut partial = None;
    for (name, device) in devices {
        let name = name.to_lowercase();
        if name == wanted {
            return Some(device);
        }
        if partial.is_none() && name.contains(&wanted) {
            partial = Some(device);
        }
    }

    partial
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: f32) -> StereoFrame {
        StereoFrame { left: value, right: -value }
    }

    fn write_wav(channels: u16, samples: &[i16]) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        let spec = hound::WavSpec {
            channels,
            sample_rate: 48_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(file.path(), spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
        file
    }

    fn stream_all(file: &tempfile::NamedTempFile) -> Vec<StereoFrame> {
        let reader = hound::WavReader::open(file.path()).unwrap();
        let (sender, receiver) = mpsc::sync_channel(CHUNK_QUEUE_DEPTH);
        stream_wav(reader, 48_000, &sender, &AtomicBool::new(false)).unwrap();
        drop(sender);
        receiver.iter().flatten().collect()
    }

    fn resample(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
        let mut resampler = LinearResampler::new(source_rate, target_rate);
        let mut out = Vec::new();
        for &frame in frames {
            resampler.push(frame, &mut out);
        }
        resampler.finish(&mut out);
        out
    }

    #[test]
    fn streams_sixteen_bit_wav() {
        let file = write_wav(2, &[16384, -16384, 0, 32767]);
        let frames = stream_all(&file);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], StereoFrame { left: 0.5, right: -0.5 });
        assert_eq!(frames[1].left, 0.0);
    }

    #[test]
    fn mono_is_duplicated() {
        let file = write_wav(1, &[8192, -32768]);
        let frames = stream_all(&file);
        assert_eq!(frames, [
            StereoFrame { left: 0.25, right: 0.25 },
            StereoFrame { left: -1.0, right: -1.0 }
        ]);
    }

    #[test]
    fn long_files_arrive_in_chunks() {
        let samples = vec![0i16; CHUNK_FRAMES * 5 / 2 * 2];
        let file = write_wav(2, &samples);
        let reader = hound::WavReader::open(file.path()).unwrap();
        let (sender, receiver) = mpsc::sync_channel(CHUNK_QUEUE_DEPTH);
        stream_wav(reader, 48_000, &sender, &AtomicBool::new(false)).unwrap();
        drop(sender);

        let sizes: Vec<usize> = receiver.iter().map(|chunk| chunk.len()).collect();
        assert_eq!(sizes, [CHUNK_FRAMES, CHUNK_FRAMES, CHUNK_FRAMES / 2]);
    }

    #[test]
    fn cancelled_reader_stops_on_full_queue() {
        let samples = vec![0i16; CHUNK_FRAMES * (CHUNK_QUEUE_DEPTH + 4) * 2];
        let file = write_wav(2, &samples);
        let reader = hound::WavReader::open(file.path()).unwrap();
        let (sender, receiver) = mpsc::sync_channel(CHUNK_QUEUE_DEPTH);

        stream_wav(reader, 48_000, &sender, &AtomicBool::new(true)).unwrap();
        drop(sender);
        assert_eq!(receiver.iter().count(), CHUNK_QUEUE_DEPTH);
    }

    #[test]
    fn upsampling_interpolates() {
        let frames = resample(&[frame(0.0), frame(1.0)], 1, 2);
        assert_eq!(frames, [frame(0.0), frame(0.5), frame(1.0), frame(1.0)]);
    }

    #[test]
    fn matching_rates_pass_through() {
        let input = [frame(0.1), frame(0.2), frame(0.3)];
        assert_eq!(resample(&input, 44_100, 44_100), input);
    }

    #[test]
    fn downsampling_drops_frames() {
        let input = [frame(0.0), frame(0.25), frame(0.5), frame(0.75)];
        assert_eq!(resample(&input, 2, 1), [frame(0.0), frame(0.5)]);
    }

    #[test]
    fn paused_feed_renders_silence_and_holds_position() {
        let (sender, receiver) = mpsc::sync_channel(CHUNK_QUEUE_DEPTH);
        let paused = Arc::new(AtomicBool::new(true));
        let mut feed = Feed::new(receiver, paused.clone());
        sender.send(vec![frame(1.0); 4]).unwrap();

        let mut block = [0.3; 4];
        feed.render(&mut block, 2);
        assert_eq!(block, [0.0; 4]);

        paused.store(false, Ordering::Release);
        feed.render(&mut block, 2);
        assert_eq!(block, [1.0, -1.0, 1.0, -1.0]);
        assert_eq!(feed.position, 2);
    }

    #[test]
    fn underrun_and_exhaustion_render_silence() {
        let (sender, receiver) = mpsc::sync_channel(CHUNK_QUEUE_DEPTH);
        let mut feed = Feed::new(receiver, Arc::new(AtomicBool::new(false)));

        let mut block = [0.7; 6];
        feed.render(&mut block, 3);
        assert_eq!(block, [0.0; 6]);

        sender.send(vec![frame(1.0)]).unwrap();
        feed.render(&mut block, 3);
        assert_eq!(block, [1.0, -1.0, 0.0, 0.0, 0.0, 0.0]);

        drop(sender);
        feed.render(&mut block, 3);
        assert_eq!(block, [0.0; 6]);
    }

    #[test]
    fn device_lookup_prefers_exact_names() {
        let devices = || {
            vec![
                ("HDMI Output (USB Dock)".to_owned(), 1),
                ("USB Dock".to_owned(), 2),
                ("Speakers".to_owned(), 3),
            ]
        };
        assert_eq!(pick_device(devices(), "usb dock"), Some(2));
        assert_eq!(pick_device(devices(), "USB"), Some(1));
        assert_eq!(pick_device(devices(), " speak "), Some(3));
        assert_eq!(pick_device(devices(), "headphones"), None);
    }
}
