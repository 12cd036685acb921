use std::time::Duration;

use crate::ascii::drip::DEFAULT_DRIP_PROBABILITY;
use crate::ascii::overlay::TitleStyle;
use crate::ascii::palette::Palette;
use crate::ascii::ramp::GlyphRamp;

/// Playback options, read once when a session starts.
#[derive(Clone, Debug)]
pub struct PlayerConfig {
    /// Output surface size in pixels.
    pub output_size: (u32, u32),
    /// Glyph cell size in pixels.
    pub cell_size: (u16, u16),
    pub show_title: bool,
    pub title_style: TitleStyle,
    pub show_progress: bool,
    pub ramp: GlyphRamp,
    /// Map bright luminance to the start of the ramp instead of the end.
    pub invert_ramp: bool,
    pub palette: Palette,
    /// Per cell, per tick chance of a glyph dripping while paused.
    pub drip_probability: f64,
    /// Fixed seed for a reproducible pause effect.
    pub drip_seed: Option<u64>,
    /// Tick interval while no track is playing.
    pub idle_interval: Duration,
}

impl PlayerConfig {
    pub fn effective_ramp(&self) -> GlyphRamp {
        if self.invert_ramp {
            self.ramp.reversed()
        } else {
            self.ramp.clone()
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            output_size: (1920, 1080),
            cell_size: (7, 14),
            show_title: false,
            title_style: TitleStyle::Plain,
            show_progress: false,
            ramp: GlyphRamp::player(),
            invert_ramp: false,
            palette: Palette::default(),
            drip_probability: DEFAULT_DRIP_PROBABILITY,
            drip_seed: None,
            idle_interval: Duration::from_millis(100),
        }
    }
}
