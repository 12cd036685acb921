use std::collections::HashMap;

/// Foreground color encoded as RGB bytes.
pub type Rgb = [u8; 3];

pub const WHITE: Rgb = [255, 255, 255];
pub const HIGHLIGHT: Rgb = [245, 5, 183];

/// Glyph color lookup: one default color plus per-glyph overrides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    default: Rgb,
    highlight: Rgb,
    overrides: HashMap<char, Rgb>,
}

impl Palette {
    pub fn new(default: Rgb, highlight: Rgb) -> Self {
        Self { default, highlight, overrides: HashMap::new() }
    }

    pub fn with_override(mut self, glyph: char, color: Rgb) -> Self {
        self.overrides.insert(glyph, color);
        self
    }

    pub fn color_of(&self, glyph: char) -> Rgb {
        self.overrides.get(&glyph).copied().unwrap_or(self.default)
    }

    /// Color used for the title and progress lines.
    pub fn highlight(&self) -> Rgb {
        self.highlight
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(WHITE, HIGHLIGHT).with_override('#', HIGHLIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bright_glyph_uses_highlight() {
        let palette = Palette::default();
        assert_eq!(palette.color_of('#'), HIGHLIGHT);
        assert_eq!(palette.color_of('@'), WHITE);
        assert_eq!(palette.color_of(' '), WHITE);
    }

    #[test]
    fn overrides_replace_defaults() {
        let palette = Palette::new([0, 255, 0], HIGHLIGHT).with_override('#', [1, 2, 3]);
        assert_eq!(palette.color_of('#'), [1, 2, 3]);
        assert_eq!(palette.color_of('x'), [0, 255, 0]);
    }
}
