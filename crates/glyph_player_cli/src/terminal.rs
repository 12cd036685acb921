use std::io::{self, Write};
use std::time::Duration;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use glyph_player::{FrameView, GlyphPresenter, InputEvent, Rgb};

/// Raw mode and alternate screen for the lifetime of the player.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        if let Err(err) = execute!(io::stdout(), EnterAlternateScreen, Hide) {
            let _ = terminal::disable_raw_mode();
            return Err(err);
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), ResetColor, Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Surface size in pixels for a terminal of `columns` x `rows` cells.
pub fn surface_from_cells(columns: u16, rows: u16, cell_size: (u16, u16)) -> (u32, u32) {
    (
        u32::from(columns) * u32::from(cell_size.0.max(1)),
        u32::from(rows) * u32::from(cell_size.1.max(1)),
    )
}

/// Surface size in pixels of the terminal as it is now.
pub fn current_surface(cell_size: (u16, u16)) -> io::Result<(u32, u32)> {
    let (columns, rows) = terminal::size()?;
    Ok(surface_from_cells(columns, rows, cell_size))
}

/// Waits up to `timeout` for input and drains everything already queued.
pub fn poll_input(timeout: Duration, cell_size: (u16, u16)) -> io::Result<Vec<InputEvent>> {
    let mut events = Vec::new();
    if !event::poll(timeout)? {
        return Ok(events);
    }

    loop {
        if let Some(input) = map_event(event::read()?, cell_size) {
            events.push(input);
        }
        if !event::poll(Duration::ZERO)? {
            return Ok(events);
        }
    }
}

pub fn map_event(event: Event, cell_size: (u16, u16)) -> Option<InputEvent> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => map_key(key),
        Event::Resize(columns, rows) => {
            let (width, height) = surface_from_cells(columns, rows, cell_size);
            Some(InputEvent::Resize(width, height))
        },
        _ => None,
    }
}

fn map_key(key: KeyEvent) -> Option<InputEvent> {
    let control = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if control => Some(InputEvent::Quit),
        KeyCode::Esc | KeyCode::Char('q') => Some(InputEvent::Quit),
        KeyCode::Char(' ') => Some(InputEvent::PauseToggle),
        KeyCode::Right => Some(InputEvent::SkipForward),
        KeyCode::Left => Some(InputEvent::SkipBackward),
        _ => None,
    }
}

/// Draws glyph grids as colored text, one glyph per terminal cell.
pub struct TerminalPresenter<W: Write> {
    out: W,
    /// Lines drawn by the previous frame, cleared when the layout changes.
    last_layout: Option<(u16, usize)>,
    waiting: bool,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out, last_layout: None, waiting: false }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn print_line(&mut self, row: u16, text: &str, color: Rgb) -> io::Result<()> {
        queue!(self.out, MoveTo(0, row), SetForegroundColor(to_color(color)), Print(text))
    }
}

impl<W: Write> GlyphPresenter for TerminalPresenter<W> {
    fn present(&mut self, view: &FrameView<'_>) -> io::Result<()> {
        let grid = view.grid;
        let lines = usize::from(grid.height)
            + usize::from(view.title.is_some())
            + usize::from(view.progress.is_some());
        let layout = (grid.width, lines);
        if self.waiting || self.last_layout != Some(layout) {
            queue!(self.out, Clear(ClearType::All))?;
            self.last_layout = Some(layout);
            self.waiting = false;
        }

        let mut row = 0u16;
        if let Some(title) = view.title {
            self.print_line(row, title, view.palette.highlight())?;
            row += 1;
        }

        let width = usize::from(grid.width).max(1);
        for cells in grid.cells().chunks(width) {
            queue!(self.out, MoveTo(0, row))?;

            // Runs of equal color share one escape sequence.
            let mut run = String::with_capacity(width);
            let mut run_color = None;
            for &glyph in cells {
                let color = view.palette.color_of(glyph);
                if run_color != Some(color) && !run.is_empty() {
                    let previous = run_color.unwrap_or(color);
                    queue!(self.out, SetForegroundColor(to_color(previous)), Print(&run))?;
                    run.clear();
                }
                run_color = Some(color);
                run.push(glyph);
            }
            if let Some(color) = run_color {
                queue!(self.out, SetForegroundColor(to_color(color)), Print(&run))?;
            }

            row = row.saturating_add(1);
        }

        if let Some(progress) = view.progress {
            self.print_line(row, progress, view.palette.highlight())?;
        }

        queue!(self.out, ResetColor)?;
        self.out.flush()
    }

    fn present_waiting(&mut self, message: &str) -> io::Result<()> {
        if self.waiting {
            return Ok(());
        }

        queue!(self.out, ResetColor, Clear(ClearType::All), MoveTo(0, 0), Print(message))?;
        self.out.flush()?;
        self.waiting = true;
        self.last_layout = None;
        Ok(())
    }
}

fn to_color([r, g, b]: Rgb) -> Color {
    Color::Rgb { r, g, b }
}

#[cfg(test)]
mod tests {
    use glyph_player::{GlyphGrid, Palette, HIGHLIGHT, WHITE};

    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn keys_map_to_player_events() {
        let cell = (8, 16);
        let none = KeyModifiers::NONE;
        assert_eq!(map_event(key(KeyCode::Esc, none), cell), Some(InputEvent::Quit));
        assert_eq!(map_event(key(KeyCode::Char('q'), none), cell), Some(InputEvent::Quit));
        assert_eq!(
            map_event(key(KeyCode::Char('c'), KeyModifiers::CONTROL), cell),
            Some(InputEvent::Quit)
        );
        assert_eq!(map_event(key(KeyCode::Char('c'), none), cell), None);
        assert_eq!(map_event(key(KeyCode::Char(' '), none), cell), Some(InputEvent::PauseToggle));
        assert_eq!(map_event(key(KeyCode::Right, none), cell), Some(InputEvent::SkipForward));
        assert_eq!(map_event(key(KeyCode::Left, none), cell), Some(InputEvent::SkipBackward));
    }

    #[test]
    fn resize_reports_pixels() {
        assert_eq!(map_event(Event::Resize(100, 30), (8, 16)), Some(InputEvent::Resize(800, 480)));
    }

    #[test]
    fn frame_draws_rows_with_highlight() {
        let grid = GlyphGrid::from_rows("a#\n..").unwrap();
        let palette = Palette::default();
        let view = FrameView {
            grid: &grid,
            cell_size: (8, 16),
            palette: &palette,
            title: Some("clip"),
            progress: Some("-- "),
        };

        let mut presenter = TerminalPresenter::new(Vec::new());
        presenter.present(&view).unwrap();
        let output = String::from_utf8(presenter.into_inner()).unwrap();

        let [hr, hg, hb] = HIGHLIGHT;
        let [wr, wg, wb] = WHITE;
        assert!(output.contains(&format!("38;2;{hr};{hg};{hb}m#")));
        assert!(output.contains(&format!("38;2;{wr};{wg};{wb}ma")));
        assert!(output.contains("clip"));
        assert!(output.contains(".."));
        assert!(output.contains("-- "));
    }

    #[test]
    fn waiting_message_is_drawn_once() {
        let mut presenter = TerminalPresenter::new(Vec::new());
        presenter.present_waiting("waiting").unwrap();
        presenter.present_waiting("waiting").unwrap();
        let output = String::from_utf8(presenter.into_inner()).unwrap();
        assert_eq!(output.matches("waiting").count(), 1);
    }
}
