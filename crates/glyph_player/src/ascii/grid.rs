/// Glyph written into cells vacated by the pause effect.
pub const BLANK: char = ' ';

/// Row-major rectangle of glyphs, one per output cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphGrid {
    pub width: u16,
    pub height: u16,
    cells: Vec<char>,
}

impl GlyphGrid {
    pub fn new(width: u16, height: u16, cells: Vec<char>) -> Self {
        assert_eq!(usize::from(width) * usize::from(height), cells.len());
        Self { width, height, cells }
    }

    /// Builds a grid from newline separated rows of equal width.
    pub fn from_rows(text: &str) -> Option<Self> {
        let rows: Vec<Vec<char>> = text.lines().map(|line| line.chars().collect()).collect();
        let width = rows.first()?.len();
        if rows.iter().any(|row| row.len() != width) {
            return None;
        }

        let width = u16::try_from(width).ok()?;
        let height = u16::try_from(rows.len()).ok()?;
        Some(Self::new(width, height, rows.into_iter().flatten().collect()))
    }

    pub fn cells(&self) -> &[char] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn index(&self, row: usize, column: usize) -> usize {
        debug_assert!(row < usize::from(self.height) && column < usize::from(self.width));
        row * usize::from(self.width) + column
    }

    pub fn get(&self, row: usize, column: usize) -> char {
        self.cells[self.index(row, column)]
    }

    pub fn set(&mut self, row: usize, column: usize, glyph: char) {
        let index = self.index(row, column);
        self.cells[index] = glyph;
    }

    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        let width = usize::from(self.width).max(1);
        self.cells.chunks(width).map(|row| row.iter().collect::<String>())
    }

    pub fn to_text(&self) -> String {
        self.rows().collect::<Vec<_>>().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_is_row_major() {
        let grid = GlyphGrid::from_rows("ab\ncd").unwrap();
        assert_eq!((grid.width, grid.height), (2, 2));
        assert_eq!(grid.cells(), &['a', 'b', 'c', 'd']);
        assert_eq!(grid.get(1, 0), 'c');
        assert_eq!(grid.to_text(), "ab\ncd");
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        assert!(GlyphGrid::from_rows("abc\nd").is_none());
        assert!(GlyphGrid::from_rows("").is_none());
    }

    #[test]
    fn set_addresses_single_cell() {
        let mut grid = GlyphGrid::new(3, 2, vec!['.'; 6]);
        grid.set(1, 2, '#');
        assert_eq!(grid.to_text(), "...\n..#");
    }
}
