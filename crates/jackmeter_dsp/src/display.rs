//! Spectrum Display Mapping
//!
//! Maps the linear bins of a [`SpectralSnapshot`] onto display columns with
//! a fourth-power curve, so low frequencies get most of the width, and
//! classifies each column's magnitude into one of eight intensity buckets.

use crate::spectrum::SpectralSnapshot;

/// Number of intensity buckets
pub const BUCKET_COUNT: usize = 8;

/// Raw FFT magnitudes are divided by this before classification
pub const MAGNITUDE_SCALE: f64 = 100.0;

/// Width of one bucket on the normalized magnitude scale
const BUCKET_WIDTH: f64 = 1.0 / BUCKET_COUNT as f64;

/// Glyph tables for rendering buckets, quietest first
const ASCII_GLYPHS: [char; BUCKET_COUNT] = ['-', '+', '*', '/', '=', '#', '%', '@'];
const BLOCK_GLYPHS: [char; BUCKET_COUNT] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Character set used to draw a spectrum row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Glyphs {
    #[default]
    Ascii,
    Blocks,
}

impl Glyphs {
    fn table(self) -> &'static [char; BUCKET_COUNT] {
        match self {
            Glyphs::Ascii => &ASCII_GLYPHS,
            Glyphs::Blocks => &BLOCK_GLYPHS,
        }
    }
}

/// Intensity class of one display column (0 = quietest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Bucket(u8);

impl Bucket {
    /// Classify a normalized magnitude
    ///
    /// Buckets are 0.125 wide; the last one also takes everything at or
    /// above 0.875. Negative and NaN magnitudes fall into the first bucket.
    pub fn classify(magnitude: f64) -> Self {
        if !(magnitude >= 0.0) {
            return Bucket(0);
        }
        let index = (magnitude / BUCKET_WIDTH).floor().min((BUCKET_COUNT - 1) as f64);
        Bucket(index as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn glyph(self, glyphs: Glyphs) -> char {
        glyphs.table()[self.index()]
    }
}

/// Bin index sampled by display column `column` of `width`
pub fn column_bin(snapshot: &SpectralSnapshot, column: usize, width: usize) -> usize {
    if width == 0 {
        return snapshot.start_index;
    }
    let proportion = (column as f64 / width as f64).powi(4);
    snapshot.start_index + (proportion * snapshot.bin_count as f64).floor() as usize
}

/// Normalized magnitude shown in display column `column` of `width`
///
/// Bins outside the transform read as silence.
pub fn column_magnitude(snapshot: &SpectralSnapshot, column: usize, width: usize) -> f64 {
    snapshot
        .output
        .get(column_bin(snapshot, column, width))
        .map_or(0.0, |value| value.abs() / MAGNITUDE_SCALE)
}

/// Classify every column of a `width`-wide display
pub fn classify_columns(snapshot: &SpectralSnapshot, width: usize) -> Vec<Bucket> {
    (0..width)
        .map(|column| Bucket::classify(column_magnitude(snapshot, column, width)))
        .collect()
}

/// Render one spectrum row as text
pub fn render_row(snapshot: &SpectralSnapshot, width: usize, glyphs: Glyphs) -> String {
    classify_columns(snapshot, width)
        .into_iter()
        .map(|bucket| bucket.glyph(glyphs))
        .collect()
}
