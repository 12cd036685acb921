use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};

use crate::PlayerError;

/// Single channel, 8 bits per pixel video frame.
#[derive(Clone, Debug)]
pub struct LuminanceFrame {
    image: GrayImage,
}

impl LuminanceFrame {
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PlayerError> {
        if width == 0 || height == 0 || data.is_empty() {
            return Err(PlayerError::InvalidFrame);
        }

        GrayImage::from_raw(width, height, data)
            .map(|image| Self { image })
            .ok_or(PlayerError::InvalidFrame)
    }

    /// Reduces any decoded image to luminance.
    pub fn from_image(image: &DynamicImage, invert: bool) -> Result<Self, PlayerError> {
        let mut gray = image.to_luma8();
        if invert {
            imageops::invert(&mut gray);
        }

        Self::from_gray(gray)
    }

    pub fn from_gray(image: GrayImage) -> Result<Self, PlayerError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PlayerError::InvalidFrame);
        }
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Resamples to exactly `columns x rows` samples, stretching to fit.
    pub(crate) fn resample(&self, columns: u16, rows: u16) -> GrayImage {
        let (columns, rows) = (u32::from(columns), u32::from(rows));
        if (columns, rows) == self.image.dimensions() {
            return self.image.clone();
        }

        imageops::resize(&self.image, columns, rows, FilterType::Triangle)
    }
}
