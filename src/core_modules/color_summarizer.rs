// THEORY:
// The `ColorSummarizer` reduces a whole raster to its K most frequent colors. It
// is the only piece of real computation a worker performs, and it is a pure
// function of its input.
//
// Key architectural principles:
// 1.  **Single Pass Counting**: Every pixel is visited exactly once, row by row,
//     and its `QuantizedColor` is counted in a `ColorFrequencyTable` private to
//     this call.
// 2.  **Positional Insertion**: The top list has a fixed length of K. Each distinct
//     color walks the list from the front and takes the first slot whose occupant
//     is strictly less frequent, pushing everything behind it one step down. A
//     color is inserted at most once.
// 3.  **Deterministic Ties**: Empty slots are real placeholders with a count of
//     zero, and distinct colors are visited in ascending color order. Colors with
//     equal counts therefore always come out lowest value first.

use crate::core_modules::pixel::{QuantizedColor, Raster};
use std::collections::BTreeMap;

pub type Frequency = u64;

/// One slot of a top-K result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorCount {
    pub color: QuantizedColor,
    /// Zero only for padding slots when the raster has fewer than K colors.
    pub frequency: Frequency,
}

/// Occurrence count of every quantized color in one raster.
///
/// Backed by a `BTreeMap` so iteration is in ascending color order.
#[derive(Debug, Clone, Default)]
pub struct ColorFrequencyTable {
    counts: BTreeMap<QuantizedColor, Frequency>,
}

impl ColorFrequencyTable {
    /// Counts every pixel of `raster` in row-major order.
    pub fn from_raster<R: Raster + ?Sized>(raster: &R) -> Self {
        let mut counts = BTreeMap::new();
        for y in 0..raster.height() {
            for x in 0..raster.width() {
                let color = QuantizedColor::from_sample(&raster.sample(x, y));
                *counts.entry(color).or_insert(0) += 1;
            }
        }
        Self { counts }
    }

    pub fn frequency(&self, color: QuantizedColor) -> Frequency {
        self.counts.get(&color).copied().unwrap_or(0)
    }

    pub fn distinct_colors(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> Frequency {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuantizedColor, Frequency)> + '_ {
        self.counts.iter().map(|(color, count)| (*color, *count))
    }

    /// Extracts the `k` most frequent colors, padding with zero-count slots.
    pub fn top(&self, k: usize) -> TopColors {
        let mut slots = vec![ColorCount::default(); k];
        if k == 0 {
            return TopColors { slots };
        }

        for (color, frequency) in self.iter() {
            if let Some(index) = slots.iter().position(|slot| slot.frequency < frequency) {
                slots.pop();
                slots.insert(index, ColorCount { color, frequency });
            }
        }

        TopColors { slots }
    }
}

/// The ordered result of summarizing one raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopColors {
    slots: Vec<ColorCount>,
}

impl TopColors {
    pub fn slots(&self) -> &[ColorCount] {
        &self.slots
    }

    pub fn colors(&self) -> impl Iterator<Item = QuantizedColor> + '_ {
        self.slots.iter().map(|slot| slot.color)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Renders the colors as `0xRRGGBB;0xRRGGBB;...`.
    pub fn render(&self) -> String {
        self.colors()
            .map(|color| color.to_string())
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Computes the `top_colors` most frequent colors of each raster it is given.
#[derive(Debug, Clone, Copy)]
pub struct ColorSummarizer {
    top_colors: usize,
}

impl ColorSummarizer {
    pub fn new(top_colors: usize) -> Self {
        Self { top_colors }
    }

    pub fn top_colors(&self) -> usize {
        self.top_colors
    }

    pub fn summarize<R: Raster + ?Sized>(&self, raster: &R) -> TopColors {
        ColorFrequencyTable::from_raster(raster).top(self.top_colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn color(pixel: Rgba<u8>) -> QuantizedColor {
        QuantizedColor::from_rgb(pixel.0[0], pixel.0[1], pixel.0[2])
    }

    fn two_by_two(pixels: [Rgba<u8>; 4]) -> RgbaImage {
        let mut image = RgbaImage::new(2, 2);
        for (index, pixel) in pixels.into_iter().enumerate() {
            image.put_pixel(index as u32 % 2, index as u32 / 2, pixel);
        }
        image
    }

    #[test]
    fn solid_color_lands_in_first_slot() {
        for k in 1..=4 {
            let image = RgbaImage::from_pixel(7, 5, Rgba([12, 34, 56, 0]));
            let top = ColorSummarizer::new(k).summarize(&image);
            assert_eq!(top.slots()[0].color, QuantizedColor::from_rgb(12, 34, 56));
            assert_eq!(top.slots()[0].frequency, 35);
        }
    }

    #[test]
    fn frequencies_sum_to_pixel_count() {
        let mut image = RgbaImage::new(13, 9);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 19) as u8, (y * 23) as u8, ((x + y) % 3) as u8, 255]);
        }

        let table = ColorFrequencyTable::from_raster(&image);
        assert_eq!(table.total(), 13 * 9);
        assert!(table.distinct_colors() > 3);
    }

    #[test]
    fn result_always_has_k_entries() {
        let image = two_by_two([RED, RED, GREEN, BLUE]);
        for k in 1..=6 {
            assert_eq!(ColorSummarizer::new(k).summarize(&image).len(), k);
        }
    }

    #[test]
    fn padding_slots_have_zero_frequency() {
        let image = two_by_two([RED, RED, GREEN, BLUE]);
        let top = ColorSummarizer::new(5).summarize(&image);

        assert_eq!(&top.slots()[3..], &[ColorCount::default(); 2]);
        assert_eq!(top.render(), "0xff0000;0x0000ff;0x00ff00;0x000000;0x000000");
    }

    #[test]
    fn majority_color_wins_and_ties_go_to_lower_value() {
        let image = two_by_two([RED, RED, GREEN, BLUE]);
        let top = ColorSummarizer::new(2).summarize(&image);

        assert_eq!(top.colors().collect::<Vec<_>>(), vec![color(RED), color(BLUE)]);
        assert_eq!(top.slots()[0].frequency, 2);
        assert_eq!(top.slots()[1].frequency, 1);
    }

    #[test]
    fn black_pixels_are_counted_like_any_other_color() {
        let black = Rgba([0, 0, 0, 255]);
        let image = two_by_two([black, black, black, GREEN]);
        let top = ColorSummarizer::new(2).summarize(&image);

        assert_eq!(top.slots()[0], ColorCount { color: color(black), frequency: 3 });
        assert_eq!(top.slots()[1], ColorCount { color: color(GREEN), frequency: 1 });
    }

    #[test]
    fn summarizing_twice_is_identical() {
        let mut image = RgbaImage::new(16, 16);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = Rgba([(x % 4) as u8 * 60, (y % 3) as u8 * 80, 7, 255]);
        }

        let summarizer = ColorSummarizer::new(4);
        assert_eq!(summarizer.summarize(&image), summarizer.summarize(&image));
    }

    #[test]
    fn output_is_non_increasing() {
        let mut image = RgbaImage::new(10, 10);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = Rgba([(x.min(y) * 20) as u8, 0, 0, 255]);
        }

        let top = ColorSummarizer::new(6).summarize(&image);
        assert!(top.slots().windows(2).all(|pair| pair[0].frequency >= pair[1].frequency));
    }
}
