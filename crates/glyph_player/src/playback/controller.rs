use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::clock::FramePacer;
use super::collaborators::{AudioOutput, FrameView, GlyphPresenter, MediaBackend};
use super::event::InputEvent;
use super::sequencer::TrackSequencer;
use super::session::PlaybackSession;
use crate::ascii::drip::DripEffect;
use crate::ascii::grid::GlyphGrid;
use crate::ascii::mapping::GlyphConverter;
use crate::ascii::overlay::{progress_line, title_for};
use crate::config::PlayerConfig;

const WAITING_MESSAGE: &str = "No video files found. Waiting for files...";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Paused,
    Finished,
    Skipped,
    /// No playable track; waiting for the playlist to be refreshed.
    Waiting,
    Terminated,
}

/// Result of a single tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The previous tick was too recent for the current frame rate.
    NotDue,
    /// A grid is ready to be presented.
    Frame,
    /// Nothing new to draw.
    Nothing,
    Waiting,
    Terminated,
}

#[derive(Clone, Copy, Debug)]
enum Cursor {
    Advance,
    Rewind,
}

/// Drives one track at a time from load to release and keeps glyph output,
/// audio and wall clock in step.
pub struct PlaybackController {
    config: PlayerConfig,
    media: Box<dyn MediaBackend>,
    audio: Box<dyn AudioOutput>,
    sequencer: TrackSequencer,
    pending_playlist: Option<Vec<PathBuf>>,
    session: Option<PlaybackSession>,
    state: PlaybackState,
    converter: GlyphConverter,
    drip: DripEffect,
    rng: StdRng,
    pacer: FramePacer,
    surface: (u32, u32),
    grid: Option<GlyphGrid>,
    title: Option<String>,
    progress: Option<String>,
    /// Consecutive tracks that failed to load or ended without a frame.
    failed_loads: usize,
    frames_decoded: u64,
}

impl PlaybackController {
    pub fn new(
        config: PlayerConfig,
        media: Box<dyn MediaBackend>,
        audio: Box<dyn AudioOutput>,
        playlist: Vec<PathBuf>,
    ) -> Self {
        let rng = match config.drip_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            converter: GlyphConverter::new(config.effective_ramp()),
            drip: DripEffect::new(config.drip_probability),
            pacer: FramePacer::new(config.idle_interval),
            surface: config.output_size,
            sequencer: TrackSequencer::new(playlist),
            pending_playlist: None,
            session: None,
            state: PlaybackState::Idle,
            grid: None,
            title: None,
            progress: None,
            failed_loads: 0,
            frames_decoded: 0,
            media,
            audio,
            rng,
            config,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn sequencer(&self) -> &TrackSequencer {
        &self.sequencer
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn grid(&self) -> Option<&GlyphGrid> {
        self.grid.as_ref()
    }

    pub fn surface(&self) -> (u32, u32) {
        self.surface
    }

    pub fn is_terminated(&self) -> bool {
        self.state == PlaybackState::Terminated
    }

    /// Time until the next tick is due.
    pub fn time_until_tick(&self, now: Instant) -> Duration {
        self.pacer.remaining(now)
    }

    /// Replaces the playlist. While a track plays the new list is held back
    /// until that session has ended.
    pub fn refresh_playlist(&mut self, tracks: Vec<PathBuf>) {
        if self.session.is_some() {
            self.pending_playlist = Some(tracks);
            return;
        }

        self.apply_playlist(tracks);
    }

    fn apply_playlist(&mut self, tracks: Vec<PathBuf>) {
        self.sequencer.refresh(tracks);
        self.failed_loads = 0;
        if self.state == PlaybackState::Waiting && !self.sequencer.is_empty() {
            info!("playlist now has {} tracks", self.sequencer.len());
            self.state = PlaybackState::Idle;
        }
    }

    pub fn handle_event(&mut self, event: InputEvent, now: Instant) {
        if self.is_terminated() {
            return;
        }

        match event {
            InputEvent::Quit => self.terminate(),
            InputEvent::Resize(width, height) => {
                debug!("surface resized to {width}x{height}");
                self.surface = (width, height);
            },
            InputEvent::PauseToggle => self.toggle_pause(now),
            InputEvent::SkipForward => self.skip(Cursor::Advance),
            InputEvent::SkipBackward => self.skip(Cursor::Rewind),
        }
    }

    fn toggle_pause(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match self.state {
            PlaybackState::Playing => {
                session.pause(self.audio.as_mut(), now);
                self.state = PlaybackState::Paused;
                debug!("paused {}", session.source().display());
            },
            PlaybackState::Paused => {
                session.resume(self.audio.as_mut(), now);
                self.state = PlaybackState::Playing;
                debug!("resumed {}", session.source().display());
            },
            _ => (),
        }
    }

    fn skip(&mut self, cursor: Cursor) {
        match self.state {
            PlaybackState::Playing | PlaybackState::Paused => {
                self.end_session(PlaybackState::Skipped, cursor);
            },
            PlaybackState::Idle | PlaybackState::Finished | PlaybackState::Skipped => {
                self.move_cursor(cursor);
                self.state = PlaybackState::Skipped;
            },
            PlaybackState::Loading | PlaybackState::Waiting | PlaybackState::Terminated => (),
        }
    }

    fn terminate(&mut self) {
        if let Some(session) = self.session.take() {
            session.release(self.audio.as_mut());
        } else {
            self.audio.stop();
        }

        info!("playback terminated");
        self.state = PlaybackState::Terminated;
    }

    /// Runs one iteration of the playback loop if it is due.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if self.is_terminated() {
            return TickOutcome::Terminated;
        }

        if !self.pacer.try_tick(now) {
            return TickOutcome::NotDue;
        }

        match self.state {
            PlaybackState::Playing => self.play_tick(now),
            PlaybackState::Paused => self.pause_tick(),
            PlaybackState::Waiting => TickOutcome::Waiting,
            PlaybackState::Terminated => TickOutcome::Terminated,
            PlaybackState::Idle
            | PlaybackState::Loading
            | PlaybackState::Finished
            | PlaybackState::Skipped => {
                self.state = PlaybackState::Idle;
                self.start_next(now)
            },
        }
    }

    fn start_next(&mut self, now: Instant) -> TickOutcome {
        if let Some(tracks) = self.pending_playlist.take() {
            self.apply_playlist(tracks);
        }

        let source = match self.sequencer.current() {
            Ok(source) => source.to_path_buf(),
            Err(err) => {
                info!("{err}, waiting for tracks");
                self.state = PlaybackState::Waiting;
                return TickOutcome::Waiting;
            },
        };

        self.state = PlaybackState::Loading;
        let mut session =
            match PlaybackSession::open(self.media.as_mut(), self.audio.as_mut(), &source, now) {
                Ok(session) => session,
                Err(err) => return self.load_failed(err),
            };

        self.frames_decoded = 0;
        self.grid = None;
        self.progress = None;
        self.title = self.config.show_title.then(|| title_for(&source, self.config.title_style));

        match FramePacer::from_rate(session.frame_rate()) {
            Some(pacer) => self.pacer.set_interval(pacer.interval()),
            None => self.pacer.set_interval(self.config.idle_interval),
        }

        session.start(self.audio.as_mut(), now);
        self.session = Some(session);
        self.state = PlaybackState::Playing;
        self.play_tick(now)
    }

    fn load_failed(&mut self, err: crate::PlayerError) -> TickOutcome {
        warn!("{err}");
        if self.count_failure() {
            return TickOutcome::Waiting;
        }

        self.move_cursor(Cursor::Advance);
        self.state = PlaybackState::Idle;
        TickOutcome::Nothing
    }

    /// Ends a session that stopped decoding. One that never produced a frame
    /// counts as a failed load.
    fn decoding_ended(&mut self) -> TickOutcome {
        let empty = self.frames_decoded == 0;
        self.end_session(PlaybackState::Finished, Cursor::Advance);
        if empty && self.count_failure() {
            return TickOutcome::Waiting;
        }

        TickOutcome::Nothing
    }

    /// Records a failed track and switches to `Waiting` once every track in
    /// the playlist has failed in a row.
    fn count_failure(&mut self) -> bool {
        self.failed_loads += 1;
        if self.failed_loads < self.sequencer.len() {
            return false;
        }

        warn!("none of the {} tracks could be played", self.sequencer.len());
        self.state = PlaybackState::Waiting;
        true
    }

    fn play_tick(&mut self, now: Instant) -> TickOutcome {
        let target = self.grid_size();
        let Some(session) = self.session.as_mut() else {
            self.state = PlaybackState::Idle;
            return TickOutcome::Nothing;
        };

        let frame = match session.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!(
                    "decoder exhausted for {} after {} frames",
                    session.source().display(),
                    self.frames_decoded
                );
                return self.decoding_ended();
            },
            Err(err) => {
                warn!("decoding {} failed: {err}", session.source().display());
                return self.decoding_ended();
            },
        };

        self.frames_decoded += 1;
        self.failed_loads = 0;

        match target {
            Some((columns, rows)) => match self.converter.convert(&frame, columns, rows) {
                Ok(grid) => self.grid = Some(grid),
                Err(err) => {
                    error!("dropping {}: {err}", session.source().display());
                    self.end_session(PlaybackState::Finished, Cursor::Advance);
                    return TickOutcome::Nothing;
                },
            },
            None => self.grid = None,
        }

        let clock = *session.clock();
        if self.config.show_progress {
            let width = self.grid.as_ref().map_or(0, |grid| grid.width);
            self.progress = Some(progress_line(clock.progress_fraction(now), width));
        }

        if clock.is_finished(now) {
            self.end_session(PlaybackState::Finished, Cursor::Advance);
        }

        if self.grid.is_some() {
            TickOutcome::Frame
        } else {
            TickOutcome::Nothing
        }
    }

    fn pause_tick(&mut self) -> TickOutcome {
        match self.grid.as_mut() {
            Some(grid) => {
                self.drip.step(grid, &mut self.rng);
                TickOutcome::Frame
            },
            None => TickOutcome::Nothing,
        }
    }

    /// Releases the live session and moves the playlist cursor exactly once.
    fn end_session(&mut self, state: PlaybackState, cursor: Cursor) {
        if let Some(session) = self.session.take() {
            session.release(self.audio.as_mut());
        }

        self.move_cursor(cursor);
        self.pacer.set_interval(self.config.idle_interval);
        self.state = state;
    }

    fn move_cursor(&mut self, cursor: Cursor) {
        let moved = match cursor {
            Cursor::Advance => self.sequencer.advance(),
            Cursor::Rewind => self.sequencer.rewind(),
        };

        if let Ok(source) = moved {
            debug!("next track {}", source.display());
        }
    }

    /// Grid dimensions for the current surface, `None` when not even one row
    /// of cells fits below the overlays.
    fn grid_size(&self) -> Option<(u16, u16)> {
        let (cell_width, cell_height) = self.config.cell_size;
        let cell_width = u32::from(cell_width.max(1));
        let cell_height = u32::from(cell_height.max(1));
        let reserved = u32::from(self.config.show_title) + u32::from(self.config.show_progress);

        let columns = self.surface.0 / cell_width;
        let rows = (self.surface.1 / cell_height).saturating_sub(reserved);
        if columns == 0 || rows == 0 {
            return None;
        }

        let clamp = |cells: u32| u16::try_from(cells).unwrap_or(u16::MAX);
        Some((clamp(columns), clamp(rows)))
    }

    pub fn present(&self, presenter: &mut dyn GlyphPresenter) -> io::Result<()> {
        if self.state == PlaybackState::Waiting {
            return presenter.present_waiting(WAITING_MESSAGE);
        }

        let Some(grid) = &self.grid else {
            return Ok(());
        };

        presenter.present(&FrameView {
            grid,
            cell_size: self.config.cell_size,
            palette: &self.config.palette,
            title: self.title.as_deref(),
            progress: self.progress.as_deref(),
        })
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.release(self.audio.as_mut());
        }
    }
}
