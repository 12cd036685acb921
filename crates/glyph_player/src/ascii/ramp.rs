use crate::PlayerError;

/// Glyphs ordered from darkest to lightest intent.
const PLAYER_RAMP: &str =
    " .'`^,:;Il!i><~+_-?][}{1)(|/tfjrxnuvczXYUJCLQ0OZmwqpdbkhao*#MW&8%B@░";

/// Ordered glyph palette used to map 8-bit luminance onto glyphs.
///
/// Each glyph covers a bucket of `ceil(256 / len)` luminance levels, so the
/// mapping is monotonic and the last bucket absorbs any remainder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphRamp {
    glyphs: Vec<char>,
    buckets: [u8; 256],
}

impl GlyphRamp {
    /// Builds a ramp from distinct glyphs, darkest first. With more than 256
    /// glyphs every bucket is a single level and the tail is never selected.
    pub fn new(glyphs: impl AsRef<str>) -> Result<Self, PlayerError> {
        let glyphs: Vec<char> = glyphs.as_ref().chars().collect();
        if glyphs.is_empty() {
            return Err(PlayerError::EmptyRamp);
        }

        for (index, glyph) in glyphs.iter().enumerate() {
            if glyphs[..index].contains(glyph) {
                return Err(PlayerError::DuplicateGlyph(*glyph));
            }
        }

        let buckets = bucket_table(glyphs.len());
        Ok(Self { glyphs, buckets })
    }

    /// The 68 glyph ramp the player ships with, space first.
    pub fn player() -> Self {
        Self::from_static(PLAYER_RAMP)
    }

    pub fn standard() -> Self {
        Self::from_static(" .:-=+*#%@")
    }

    pub fn blocks() -> Self {
        Self::from_static(" ░▒▓█")
    }

    fn from_static(glyphs: &str) -> Self {
        let glyphs: Vec<char> = glyphs.chars().collect();
        let buckets = bucket_table(glyphs.len());
        Self { glyphs, buckets }
    }

    /// Same glyphs with the opposite light/dark orientation.
    pub fn reversed(&self) -> Self {
        let glyphs: Vec<char> = self.glyphs.iter().rev().copied().collect();
        Self { glyphs, buckets: self.buckets }
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    pub fn contains(&self, glyph: char) -> bool {
        self.glyphs.contains(&glyph)
    }

    pub fn bucket(&self, luminance: u8) -> usize {
        usize::from(self.buckets[usize::from(luminance)])
    }

    pub fn glyph_for(&self, luminance: u8) -> char {
        self.glyphs[self.bucket(luminance)]
    }
}

impl Default for GlyphRamp {
    fn default() -> Self {
        Self::player()
    }
}

fn bucket_table(levels: usize) -> [u8; 256] {
    let width = 256usize.div_ceil(levels);
    let max_index = levels - 1;
    let mut table = [0u8; 256];
    for (luminance, slot) in table.iter_mut().enumerate() {
        *slot = (luminance / width).min(max_index) as u8;
    }
    table
}
