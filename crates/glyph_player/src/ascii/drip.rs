use rand::Rng;

use super::grid::{GlyphGrid, BLANK};

pub const DEFAULT_DRIP_PROBABILITY: f64 = 0.1;

/// Decays a frozen grid by letting glyphs fall one row per tick.
#[derive(Clone, Copy, Debug)]
pub struct DripEffect {
    probability: f64,
}

impl DripEffect {
    pub fn new(probability: f64) -> Self {
        let probability = if probability.is_nan() { 0.0 } else { probability.clamp(0.0, 1.0) };
        Self { probability }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Applies one tick, each cell dripping with the configured probability.
    pub fn step<R: Rng + ?Sized>(&self, grid: &mut GlyphGrid, rng: &mut R) {
        let probability = self.probability;
        step_with(grid, |_, _| rng.gen_bool(probability));
    }
}

impl Default for DripEffect {
    fn default() -> Self {
        Self::new(DEFAULT_DRIP_PROBABILITY)
    }
}

/// Applies one tick, asking `drips(row, column)` whether each cell falls.
///
/// Cells are visited top to bottom, left to right, reading the grid as it is
/// being mutated: a glyph that fell into the next row may fall again when that
/// row is scanned in the same tick. On the bottom row the glyph lands on its own
/// cell and is then blanked.
pub fn step_with<F>(grid: &mut GlyphGrid, mut drips: F)
where
    F: FnMut(usize, usize) -> bool,
{
    let width = usize::from(grid.width);
    let height = usize::from(grid.height);
    if height == 0 {
        return;
    }

    let bottom = height - 1;
    for row in 0..height {
        for column in 0..width {
            if !drips(row, column) {
                continue;
            }

            let glyph = grid.get(row, column);
            let target = (row + 1).min(bottom);
            grid.set(target, column, glyph);
            grid.set(row, column, BLANK);
        }
    }
}
