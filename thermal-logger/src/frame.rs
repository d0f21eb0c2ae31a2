// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! The 32×24 temperature grid and how to rebuild one from a record stream.
//!
//! A [`FrameImage`] is a complete thermal image in row-major order, matching
//! the order the logger emits pixels in (`row = index / 32`,
//! `col = index % 32`). Rebuilding an image from the wire is more forgiving
//! than emitting one: samples for the same pixel are averaged, coordinates
//! off the grid are discarded, and pixels that never arrive are left at
//! zero. A noisy serial link needs all three.

use crate::record::PixelRecord;

/// Pixel columns on an MLX90640.
pub const WIDTH: usize = 32;

/// Pixel rows on an MLX90640.
pub const HEIGHT: usize = 24;

/// Total pixel count for a full frame.
pub const NUM_PIXELS: usize = WIDTH * HEIGHT;

/// A full frame of temperatures, in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameImage {
    pixels: [f32; NUM_PIXELS],
}

impl FrameImage {
    /// An image with every pixel at zero.
    pub fn zeroed() -> Self {
        Self {
            pixels: [0f32; NUM_PIXELS],
        }
    }

    /// Build an image from a row-major slice of [`NUM_PIXELS`] temperatures.
    ///
    /// Returns [None] if the slice is the wrong length.
    pub fn from_pixels(pixels: &[f32]) -> Option<Self> {
        let pixels = pixels.try_into().ok()?;
        Some(Self { pixels })
    }

    /// The temperature at the given coordinates.
    ///
    /// Returns [None] when the coordinates are off the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row < HEIGHT && col < WIDTH {
            Some(self.pixels[row * WIDTH + col])
        } else {
            None
        }
    }

    /// The raw pixel data, row-major.
    pub fn as_pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// Iterate over the rows of the image, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.pixels.chunks_exact(WIDTH)
    }
}

impl From<[f32; NUM_PIXELS]> for FrameImage {
    fn from(pixels: [f32; NUM_PIXELS]) -> Self {
        Self { pixels }
    }
}

/// A [`FrameImage`] paired with the frame index it was reported under.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub index: u32,
    pub image: FrameImage,
}

impl Frame {
    /// Iterate over the frame as wire records, in emission order.
    pub fn records(&self) -> impl Iterator<Item = PixelRecord> + '_ {
        self.image
            .as_pixels()
            .iter()
            .enumerate()
            .map(move |(count, temperature)| PixelRecord {
                frame: self.index,
                row: (count / WIDTH) as u8,
                col: (count % WIDTH) as u8,
                temperature: *temperature,
            })
    }
}

/// Accumulates pixel samples into a single image.
///
/// The accumulator doesn't care which frame index a sample was reported
/// under; routing records to accumulators is the caller's job (see
/// [`FrameAssembler`] for the index-aware version). Duplicate samples for a
/// pixel are averaged when the image is finished.
#[derive(Clone, Debug)]
pub struct FrameAccumulator {
    sums: [f32; NUM_PIXELS],
    counts: [u16; NUM_PIXELS],
    covered: usize,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self {
            sums: [0f32; NUM_PIXELS],
            counts: [0u16; NUM_PIXELS],
            covered: 0,
        }
    }

    /// Fold one sample in.
    ///
    /// Returns false (and changes nothing) when the coordinates fall outside
    /// the grid.
    pub fn push(&mut self, record: &PixelRecord) -> bool {
        let row = record.row as usize;
        let col = record.col as usize;
        if row >= HEIGHT || col >= WIDTH {
            return false;
        }
        let index = row * WIDTH + col;
        if self.counts[index] == 0 {
            self.covered += 1;
        }
        self.sums[index] += record.temperature;
        self.counts[index] += 1;
        true
    }

    /// The number of distinct pixels seen so far.
    pub fn covered(&self) -> usize {
        self.covered
    }

    /// True once every pixel has at least one sample.
    pub fn is_complete(&self) -> bool {
        self.covered == NUM_PIXELS
    }

    /// Average the accumulated samples into an image.
    ///
    /// Pixels without any samples are left at zero.
    pub fn finish(self) -> FrameImage {
        let mut image = FrameImage::zeroed();
        for (index, (sum, count)) in self.sums.iter().zip(self.counts.iter()).enumerate() {
            if *count > 0 {
                image.pixels[index] = sum / f32::from(*count);
            }
        }
        image
    }
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits a record stream into frames on frame-index boundaries.
///
/// A record carrying a different frame index than the one currently being
/// accumulated completes the current frame, whether or not all of its pixels
/// arrived.
#[derive(Clone, Debug, Default)]
pub struct FrameAssembler {
    current: Option<(u32, FrameAccumulator)>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one record in, returning the previous frame if `record` starts a
    /// new one.
    pub fn push(&mut self, record: &PixelRecord) -> Option<Frame> {
        let completed = match self.current.take() {
            Some((index, accumulator)) if index != record.frame => Some(Frame {
                index,
                image: accumulator.finish(),
            }),
            Some(current) => {
                self.current = Some(current);
                None
            }
            None => None,
        };
        let (_, accumulator) = self
            .current
            .get_or_insert_with(|| (record.frame, FrameAccumulator::new()));
        accumulator.push(record);
        completed
    }

    /// Finish the frame currently being accumulated, if any records arrived.
    pub fn finish(self) -> Option<Frame> {
        self.current.map(|(index, accumulator)| Frame {
            index,
            image: accumulator.finish(),
        })
    }
}

/// The per-pixel mean across a set of frames.
///
/// Returns [None] for an empty set.
pub fn average_map<'a, I>(frames: I) -> Option<FrameImage>
where
    I: IntoIterator<Item = &'a Frame>,
{
    let mut sums = [0f64; NUM_PIXELS];
    let mut count = 0usize;
    for frame in frames {
        for (sum, pixel) in sums.iter_mut().zip(frame.image.as_pixels()) {
            *sum += f64::from(*pixel);
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let mut image = FrameImage::zeroed();
    for (pixel, sum) in image.pixels.iter_mut().zip(sums.iter()) {
        *pixel = (sum / count as f64) as f32;
    }
    Some(image)
}
