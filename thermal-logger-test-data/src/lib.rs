// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Shared fixtures for thermal-logger's tests.
//!
//! Real captures are awkward test inputs: they need hardware, and every run
//! is different. These fixtures fake both ends of the pipeline instead, with
//! synthetic images built from a known per-pixel formula, CSV transcripts as
//! the logger would emit them (optionally with the kind of junk a serial
//! port adds), and a scripted camera that replays subpage refreshes without
//! a sensor attached.

use std::collections::VecDeque;

use thermal_logger::error::StreamError;
use thermal_logger::stream::FrameSource;
use thermal_logger::{Frame, FrameImage, NUM_PIXELS, WIDTH};

/// A deterministic image: `base + row * 0.25 + col * 0.05`.
///
/// Every pixel is distinct, and the increments survive the wire format's two
/// decimal places unchanged.
pub fn gradient_image(base: f32) -> FrameImage {
    let mut pixels = [0f32; NUM_PIXELS];
    for (count, pixel) in pixels.iter_mut().enumerate() {
        let row = count / WIDTH;
        let col = count % WIDTH;
        *pixel = base + row as f32 * 0.25 + col as f32 * 0.05;
    }
    FrameImage::from(pixels)
}

/// A [`gradient_image`] wrapped in a frame with the given index.
pub fn gradient_frame(index: u32, base: f32) -> Frame {
    Frame {
        index,
        image: gradient_image(base),
    }
}

/// The CSV text the logger would emit for `frames`, nothing else.
pub fn transcript(frames: &[Frame]) -> String {
    let mut text = String::new();
    for frame in frames {
        for record in frame.records() {
            text.push_str(&record.to_string());
            text.push('\n');
        }
    }
    text
}

/// A transcript as a capture tool actually sees one.
///
/// Starts with a partial line (the tool attached mid-record), includes the
/// startup banner and some line noise, and sprinkles a malformed line
/// between frames.
pub fn noisy_transcript(frames: &[Frame]) -> String {
    let mut text = String::from(",31,24.5\nMLX90640 ready\n\u{0}\u{7f}\u{0}\n");
    for frame in frames {
        for record in frame.records() {
            text.push_str(&record.to_string());
            text.push('\n');
        }
        text.push_str("12,not,a,record\n");
    }
    text
}

/// A [`FrameSource`] that replays canned images, one subpage per refresh.
///
/// Pixels are split between subpages in the camera's chess pattern, so a
/// single refresh leaves half of the destination untouched, just like the
/// real driver. Optional idle polls between refreshes exercise the
/// acquisition loop's waiting path. Once the script runs out the source
/// reports no new data forever, which a streamer sees as a stall.
#[derive(Clone, Debug)]
pub struct ScriptedCamera {
    images: VecDeque<FrameImage>,
    subpage: usize,
    idle_between: usize,
    idle_left: usize,
}

impl ScriptedCamera {
    pub fn new<I>(images: I) -> Self
    where
        I: IntoIterator<Item = FrameImage>,
    {
        Self {
            images: images.into_iter().collect(),
            subpage: 0,
            idle_between: 0,
            idle_left: 0,
        }
    }

    /// Report no new data this many times between refreshes.
    pub fn with_idle_polls(mut self, polls: usize) -> Self {
        self.idle_between = polls;
        self
    }
}

impl FrameSource for ScriptedCamera {
    fn refresh(&mut self, destination: &mut [f32; NUM_PIXELS]) -> Result<bool, StreamError> {
        if self.idle_left > 0 {
            self.idle_left -= 1;
            return Ok(false);
        }
        let image = match self.images.front() {
            Some(image) => image,
            None => return Ok(false),
        };
        for (count, pixel) in destination.iter_mut().enumerate() {
            let row = count / WIDTH;
            let col = count % WIDTH;
            if (row + col) % 2 == self.subpage {
                *pixel = image.as_pixels()[count];
            }
        }
        if self.subpage == 1 {
            self.images.pop_front();
        }
        self.subpage = (self.subpage + 1) % 2;
        self.idle_left = self.idle_between;
        Ok(true)
    }
}
