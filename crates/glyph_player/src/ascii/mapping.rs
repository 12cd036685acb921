use crate::image_pipeline::frame::LuminanceFrame;
use crate::PlayerError;

use super::{grid::GlyphGrid, ramp::GlyphRamp};

/// Turns luminance frames into glyph grids of a requested size.
#[derive(Clone, Debug, Default)]
pub struct GlyphConverter {
    ramp: GlyphRamp,
}

impl GlyphConverter {
    pub fn new(ramp: GlyphRamp) -> Self {
        Self { ramp }
    }

    pub fn ramp(&self) -> &GlyphRamp {
        &self.ramp
    }

    pub fn convert(
        &self,
        frame: &LuminanceFrame,
        columns: u16,
        rows: u16,
    ) -> Result<GlyphGrid, PlayerError> {
        if frame.width() == 0 || frame.height() == 0 || frame.pixels().is_empty() {
            return Err(PlayerError::InvalidFrame);
        }

        if columns == 0 || rows == 0 {
            return Err(PlayerError::InvalidTarget { columns, rows });
        }

        let sampled = frame.resample(columns, rows);
        let cells =
            sampled.as_raw().iter().map(|&luminance| self.ramp.glyph_for(luminance)).collect();

        Ok(GlyphGrid::new(columns, rows, cells))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: u32, height: u32) -> LuminanceFrame {
        let pixels = width * height;
        let data = (0..pixels).map(|index| (index * 255 / pixels) as u8).collect();
        LuminanceFrame::from_raw(width, height, data).unwrap()
    }

    #[test]
    fn output_matches_target_size() {
        let converter = GlyphConverter::default();
        let frame = gradient_frame(320, 180);
        for (columns, rows) in [(1, 1), (80, 24), (13, 7), (400, 300)] {
            let grid = converter.convert(&frame, columns, rows).unwrap();
            assert_eq!((grid.width, grid.height), (columns, rows));
            assert_eq!(grid.len(), usize::from(columns) * usize::from(rows));
            assert!(grid.cells().iter().all(|&glyph| converter.ramp().contains(glyph)));
        }
    }

    #[test]
    fn one_sample_per_cell_at_native_size() {
        let converter = GlyphConverter::new(GlyphRamp::new(" .#").unwrap());
        let frame = LuminanceFrame::from_raw(3, 1, vec![0, 130, 255]).unwrap();
        let grid = converter.convert(&frame, 3, 1).unwrap();
        assert_eq!(grid.to_text(), " .#");
    }

    #[test]
    fn dark_and_light_halves_keep_their_glyphs() {
        let converter = GlyphConverter::new(GlyphRamp::new(" #").unwrap());
        let mut data = vec![0u8; 40 * 20];
        for row in data.chunks_mut(40) {
            row[20..].fill(255);
        }
        let frame = LuminanceFrame::from_raw(40, 20, data).unwrap();
        let grid = converter.convert(&frame, 4, 2).unwrap();
        assert_eq!(grid.to_text(), "  ##\n  ##");
    }

    #[test]
    fn rejects_empty_target() {
        let converter = GlyphConverter::default();
        let frame = gradient_frame(8, 8);
        assert!(matches!(
            converter.convert(&frame, 0, 5),
            Err(PlayerError::InvalidTarget { columns: 0, rows: 5 })
        ));
        assert!(matches!(converter.convert(&frame, 5, 0), Err(PlayerError::InvalidTarget { .. })));
    }
}
