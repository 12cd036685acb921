use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use glyph_player::{
    AudioOutput, GlyphConverter, GlyphRamp, InputEvent, MediaBackend, NullAudio, PlaybackController,
    PlaybackState, PlayerConfig, TickOutcome, TitleStyle,
};
use log::{info, warn};

mod backend;
mod logging;
mod playlist;
mod terminal;

use backend::audio::CpalAudio;
use backend::FfmpegBackend;
use terminal::{TerminalGuard, TerminalPresenter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Play videos as colored glyph mosaics in the terminal")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    #[command(flatten)]
    play: PlayArgs,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Reduce log verbosity (-q errors only, -qq off)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    quiet: u8,
    /// Log file, defaults to a file in the system temp directory
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play every video in a directory, looping over the playlist (default)
    Play(PlayArgs),
    /// Print one frame of a source to stdout
    Preview(PreviewArgs),
}

#[derive(Args, Debug)]
struct PlayArgs {
    /// Directory scanned for videos
    #[arg(env = "GLYPH_PLAYER_DIR", default_value = "stream")]
    dir: PathBuf,
    /// Pin the output surface to WIDTHxHEIGHT pixels instead of following the terminal
    #[arg(long, value_parser = parse_dimensions)]
    size: Option<(u32, u32)>,
    /// Glyph cell size in pixels
    #[arg(long, value_parser = parse_dimensions, default_value = "7x14")]
    cell: (u32, u32),
    /// Show the track name above the grid
    #[arg(long, default_value_t = false)]
    title: bool,
    /// Show the track name in Morse code (implies --title)
    #[arg(long, default_value_t = false)]
    morse_title: bool,
    /// Show a progress line below the grid
    #[arg(long, default_value_t = false)]
    progress: bool,
    /// Include videos in subdirectories
    #[arg(long, default_value_t = false)]
    recursive: bool,
    /// Never open an audio device
    #[arg(long, default_value_t = false)]
    mute: bool,
    /// Output device to play audio on, matched against device names
    #[arg(long, env = "GLYPH_PLAYER_AUDIO_DEVICE", value_name = "NAME")]
    audio_device: Option<String>,
    /// Seconds between directory scans while no videos are found
    #[arg(long, value_parser = parse_seconds, default_value = "5")]
    rescan: Duration,
    #[command(flatten)]
    settings: RenderSettings,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    /// Input video, GIF or image path
    input: PathBuf,
    /// Target column width
    #[arg(long, default_value_t = 100)]
    width: u16,
    /// Position of the frame to print, in seconds
    #[arg(long, default_value_t = 0.0)]
    at: f64,
    /// Font aspect ratio (width / height) used to derive the row count
    #[arg(long, default_value_t = 0.5)]
    font_aspect: f32,
    #[command(flatten)]
    settings: RenderSettings,
}

#[derive(Args, Debug, Clone)]
struct RenderSettings {
    /// Ramp preset used to map luminance to glyphs
    #[arg(long, value_enum, default_value = "player")]
    ramp: RampPreset,
    /// Custom ramp, darkest glyph first; overrides --ramp
    #[arg(long)]
    glyphs: Option<String>,
    /// Map bright pixels to the start of the ramp
    #[arg(long, default_value_t = false)]
    invert: bool,
    /// Chance per cell and tick that a glyph drips while paused
    #[arg(long, default_value_t = glyph_player::DEFAULT_DRIP_PROBABILITY)]
    drip: f64,
    /// Seed for a reproducible pause effect
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RampPreset {
    Player,
    Standard,
    Blocks,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = logging::level_filter(cli.quiet, cli.verbose);
    let log_path = logging::initialize(cli.log_file, level)?;
    info!("logging to {}", log_path.display());

    match cli.command.unwrap_or(Commands::Play(cli.play)) {
        Commands::Play(args) => play(args),
        Commands::Preview(args) => preview(args),
    }
}

fn play(args: PlayArgs) -> Result<()> {
    let mut config = args.to_config()?;
    let rescan_interval = args.rescan;

    let mut tracks = playlist::scan(&args.dir, args.recursive)?;
    if tracks.is_empty() {
        tracks = playlist::wait_for_tracks(&args.dir, args.recursive, rescan_interval)?;
    }
    info!("found {} tracks in {}", tracks.len(), args.dir.display());

    let audio: Box<dyn AudioOutput> = if args.mute {
        Box::new(NullAudio)
    } else {
        match CpalAudio::open(args.audio_device.as_deref()) {
            Ok(audio) => Box::new(audio),
            Err(err) => {
                warn!("audio disabled: {err:#}");
                Box::new(NullAudio)
            },
        }
    };
    let media: Box<dyn MediaBackend> = Box::new(FfmpegBackend::new(args.mute));

    let _guard = TerminalGuard::enter().context("failed to set up the terminal")?;
    let cell_size = config.cell_size;
    match args.size {
        Some(size) => config.output_size = size,
        None => config.output_size = terminal::current_surface(cell_size)?,
    }

    let mut controller = PlaybackController::new(config, media, audio, tracks);
    let mut presenter = TerminalPresenter::new(io::stdout());
    let mut last_scan = Instant::now();
    let mut previous_state = controller.state();

    loop {
        let wait = controller.time_until_tick(Instant::now());
        for event in terminal::poll_input(wait, cell_size)? {
            if args.size.is_some() && matches!(event, InputEvent::Resize(..)) {
                continue;
            }
            controller.handle_event(event, Instant::now());
        }

        match controller.tick(Instant::now()) {
            TickOutcome::Terminated => break,
            TickOutcome::Frame | TickOutcome::Waiting => controller.present(&mut presenter)?,
            TickOutcome::NotDue | TickOutcome::Nothing => (),
        }

        // Scan once per track boundary, and periodically while waiting.
        let state = controller.state();
        let rescan = match state {
            PlaybackState::Waiting => last_scan.elapsed() >= rescan_interval,
            PlaybackState::Finished | PlaybackState::Skipped => state != previous_state,
            _ => false,
        };
        previous_state = state;
        if rescan {
            last_scan = Instant::now();
            match playlist::scan(&args.dir, args.recursive) {
                Ok(tracks) => controller.refresh_playlist(tracks),
                Err(err) => warn!("failed to rescan {}: {err:#}", args.dir.display()),
            }
        }
    }

    info!("player terminated");
    Ok(())
}

fn preview(args: PreviewArgs) -> Result<()> {
    let config = args.settings.to_config()?;
    let mut backend = FfmpegBackend::new(true);
    let mut decoder =
        backend.open(&args.input).with_context(|| format!("failed to open {:?}", args.input))?;

    let skip = (args.at.max(0.0) * decoder.frame_rate()).floor() as u64;
    let mut frame = None;
    for _ in 0..=skip {
        match decoder.next_frame()? {
            Some(next) => frame = Some(next),
            None => break,
        }
    }
    let frame = frame.with_context(|| format!("no frames decoded from {:?}", args.input))?;

    let columns = args.width.max(1);
    let aspect = frame.height() as f32 / frame.width() as f32;
    let rows = (f32::from(columns) * aspect * args.font_aspect.max(0.1)).round().max(1.0) as u16;

    let converter = GlyphConverter::new(config.effective_ramp());
    let grid = converter
        .convert(&frame, columns, rows)
        .with_context(|| format!("failed to render {:?}", args.input))?;

    for row in grid.rows() {
        println!("{}", row);
    }

    Ok(())
}

/// Shortest accepted rescan interval.
const MIN_RESCAN: Duration = Duration::from_millis(100);

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds = value.trim().parse::<f64>().map_err(|err| format!("{value:?}: {err}"))?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!("expected a positive number of seconds, got {value:?}"));
    }

    let interval = Duration::try_from_secs_f64(seconds).map_err(|err| err.to_string())?;
    Ok(interval.max(MIN_RESCAN))
}

fn parse_dimensions(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;
    let parse = |part: &str| part.trim().parse::<u32>().map_err(|err| format!("{part:?}: {err}"));
    match (parse(width)?, parse(height)?) {
        (0, _) | (_, 0) => Err("dimensions must be non-zero".into()),
        dimensions => Ok(dimensions),
    }
}

impl PlayArgs {
    fn to_config(&self) -> Result<PlayerConfig> {
        let mut config = self.settings.to_config()?;
        let clamp = |pixels: u32| u16::try_from(pixels).unwrap_or(u16::MAX);
        config.cell_size = (clamp(self.cell.0), clamp(self.cell.1));
        config.show_title = self.title || self.morse_title;
        config.title_style = if self.morse_title { TitleStyle::Morse } else { TitleStyle::Plain };
        config.show_progress = self.progress;
        Ok(config)
    }
}

impl RenderSettings {
    fn to_config(&self) -> Result<PlayerConfig> {
        let mut config = PlayerConfig::default();
        config.ramp = match &self.glyphs {
            Some(glyphs) => GlyphRamp::new(glyphs).context("invalid --glyphs ramp")?,
            None => self.ramp.to_ramp(),
        };
        config.invert_ramp = self.invert;
        config.drip_probability = self.drip;
        config.drip_seed = self.seed;
        Ok(config)
    }
}

impl RampPreset {
    fn to_ramp(self) -> GlyphRamp {
        match self {
            RampPreset::Player => GlyphRamp::player(),
            RampPreset::Standard => GlyphRamp::standard(),
            RampPreset::Blocks => GlyphRamp::blocks(),
        }
    }
}
