// THEORY:
// The `pixel` module defines the two "dumb" data types everything else is built
// on: the `Raster` a worker decodes, and the `QuantizedColor` a pixel is reduced
// to before it is counted.
//
// Key architectural principles:
// 1.  **Uniform Precision**: Decoders hand back 8-bit or 16-bit samples depending
//     on the container. A `Raster` always answers in 16-bit channels, so
//     quantization is a single right shift no matter where the pixel came from.
// 2.  **Alpha Blindness**: A `QuantizedColor` is only red, green and blue. Two
//     pixels that differ only in alpha are the same color.
// 3.  **Value Semantics**: `QuantizedColor` is a `Copy` newtype over `u32` whose
//     ordering is the numeric order of `0xRRGGBB`. The summarizer relies on that
//     ordering to make its output deterministic.

use image::{ImageBuffer, Rgba, RgbaImage};
use std::fmt;

pub type Channel = u16;
pub type Sample = Rgba<Channel>;
/// An RGBA raster with 16-bit channels, the widest layout the decoders produce.
pub type Rgba16Image = ImageBuffer<Sample, Vec<Channel>>;

/// Bits dropped from each 16-bit channel during quantization.
const CHANNEL_SHIFT: u32 = 8;

/// A decoded, pixel-addressable image.
pub trait Raster {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Returns the RGBA sample at `(x, y)` widened to 16 bits per channel.
    fn sample(&self, x: u32, y: u32) -> Sample;
}

impl Raster for Rgba16Image {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn sample(&self, x: u32, y: u32) -> Sample {
        *self.get_pixel(x, y)
    }
}

impl Raster for RgbaImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn sample(&self, x: u32, y: u32) -> Sample {
        // 0xAB widens to 0xABAB, the same expansion 16-bit decoders use.
        let [r, g, b, a] = self.get_pixel(x, y).0;
        Rgba([r, g, b, a].map(|c| c as Channel * 257))
    }
}

/// A 24-bit RGB color, each channel truncated to its top 8 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct QuantizedColor(u32);

impl QuantizedColor {
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self(((red as u32) << 16) | ((green as u32) << 8) | blue as u32)
    }

    pub fn from_sample(sample: &Sample) -> Self {
        let [r, g, b, _] = sample.0;
        Self::from_rgb(
            (r >> CHANNEL_SHIFT) as u8,
            (g >> CHANNEL_SHIFT) as u8,
            (b >> CHANNEL_SHIFT) as u8,
        )
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for QuantizedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06x}", self.0)
    }
}
