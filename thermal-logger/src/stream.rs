// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! The acquisition loop.
//!
//! The MLX90640 never updates the whole image at once; each measurement
//! refreshes one *subpage* (half of the pixels, the other half on the next
//! measurement). A complete frame therefore takes two refreshes, and the
//! polling cadence has to come from the camera's configured frame rate. That
//! detail stays in here: consumers of [`FrameStreamer`] see whole frames
//! with a monotonically increasing index.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::StreamError;
use crate::frame::{Frame, FrameImage, NUM_PIXELS};

/// Subpage refreshes needed for every pixel to have fresh data.
const SUBPAGES_PER_FRAME: usize = 2;

/// The default emissivity correction factor, a reasonable value for human
/// skin.
pub const DEFAULT_EMISSIVITY_SCALE: f32 = 0.98;

/// A camera (or stand-in) that can refresh a temperature buffer.
///
/// This is the seam between the acquisition loop and `mlx9064x`: the real
/// implementation lives in [`crate::camera`], and tests drive the loop with a
/// scripted source instead of hardware.
pub trait FrameSource {
    /// Copy fresh pixel data into `destination` if the camera has any ready.
    ///
    /// The `Ok` value reports whether a refresh happened. A refresh only
    /// covers one subpage; `destination` keeps the previous values for the
    /// other pixels.
    fn refresh(&mut self, destination: &mut [f32; NUM_PIXELS]) -> Result<bool, StreamError>;
}

/// Turns subpage refreshes from a [`FrameSource`] into numbered frames.
#[derive(Debug)]
pub struct FrameStreamer<S> {
    source: S,
    buffer: [f32; NUM_PIXELS],
    next_index: u32,
    emissivity_scale: f32,
    poll_interval: Duration,
    stall_timeout: Duration,
}

impl<S> FrameStreamer<S>
where
    S: FrameSource,
{
    /// Create a streamer polling `source` at `poll_interval`.
    ///
    /// Half the camera's frame period is a good interval; the `mlx9064x`
    /// examples poll at 500ms against the default 2Hz rate. The stall
    /// timeout defaults to twenty poll intervals (but at least one second).
    pub fn new(source: S, poll_interval: Duration) -> Self {
        let stall_timeout = (poll_interval * 20).max(Duration::from_secs(1));
        Self {
            source,
            buffer: [0f32; NUM_PIXELS],
            next_index: 0,
            emissivity_scale: DEFAULT_EMISSIVITY_SCALE,
            poll_interval,
            stall_timeout,
        }
    }

    /// Replace the emissivity correction factor (default
    /// [`DEFAULT_EMISSIVITY_SCALE`]).
    pub fn with_emissivity_scale(mut self, scale: f32) -> Self {
        self.emissivity_scale = scale;
        self
    }

    /// Replace the stall timeout.
    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    /// The index the next acquired frame will carry.
    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    /// Acquire the next full frame.
    ///
    /// Blocks until both subpages have refreshed, sleeping for the poll
    /// interval between attempts. Returns [`StreamError::Stalled`] when the
    /// camera stops producing data entirely.
    pub fn next_frame(&mut self) -> Result<Frame, StreamError> {
        let mut refreshes = 0;
        let mut deadline = Instant::now() + self.stall_timeout;
        while refreshes < SUBPAGES_PER_FRAME {
            if self.source.refresh(&mut self.buffer)? {
                refreshes += 1;
                deadline = Instant::now() + self.stall_timeout;
                trace!(refreshes, "subpage refreshed");
                continue;
            }
            if Instant::now() >= deadline {
                return Err(StreamError::Stalled(self.stall_timeout));
            }
            thread::sleep(self.poll_interval);
        }
        let scale = self.emissivity_scale;
        let image = FrameImage::from(self.buffer.map(|temperature| temperature * scale));
        let index = self.next_index;
        self.next_index += 1;
        debug!(index, "frame acquired");
        Ok(Frame { index, image })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use float_cmp::assert_approx_eq;

    /// Refreshes alternating halves of a constant image, with a fixed number
    /// of not-ready polls in between.
    struct TickingSource {
        temperature: f32,
        idle_between: usize,
        idle_left: usize,
        refreshes_left: usize,
        next_subpage: usize,
    }

    impl TickingSource {
        fn new(temperature: f32, idle_between: usize, refreshes: usize) -> Self {
            Self {
                temperature,
                idle_between,
                idle_left: 0,
                refreshes_left: refreshes,
                next_subpage: 0,
            }
        }
    }

    impl FrameSource for TickingSource {
        fn refresh(&mut self, destination: &mut [f32; NUM_PIXELS]) -> Result<bool, StreamError> {
            if self.refreshes_left == 0 {
                return Ok(false);
            }
            if self.idle_left > 0 {
                self.idle_left -= 1;
                return Ok(false);
            }
            for (count, pixel) in destination.iter_mut().enumerate() {
                // Chess-pattern subpages, like the real camera's default mode.
                if (count / crate::frame::WIDTH + count % crate::frame::WIDTH) % 2
                    == self.next_subpage
                {
                    *pixel = self.temperature;
                }
            }
            self.next_subpage = (self.next_subpage + 1) % 2;
            self.refreshes_left -= 1;
            self.idle_left = self.idle_between;
            Ok(true)
        }
    }

    fn streamer(source: TickingSource) -> FrameStreamer<TickingSource> {
        FrameStreamer::new(source, Duration::from_micros(10))
            .with_stall_timeout(Duration::from_millis(50))
    }

    #[test]
    fn frame_needs_two_refreshes() {
        let mut streamer = streamer(TickingSource::new(30f32, 2, 4)).with_emissivity_scale(1f32);
        let frame = streamer.next_frame().unwrap();
        assert_eq!(frame.index, 0);
        // Both subpages landed, so every pixel carries the temperature.
        assert!(frame
            .image
            .as_pixels()
            .iter()
            .all(|temperature| *temperature == 30f32));
        let frame = streamer.next_frame().unwrap();
        assert_eq!(frame.index, 1);
        assert_eq!(streamer.next_index(), 2);
    }

    #[test]
    fn emissivity_scale_applied() {
        let mut streamer = streamer(TickingSource::new(100f32, 0, 2));
        let frame = streamer.next_frame().unwrap();
        assert_approx_eq!(f32, frame.image.get(0, 0).unwrap(), 98f32);
    }

    #[test]
    fn silent_camera_stalls() {
        let mut streamer = streamer(TickingSource::new(30f32, 0, 0));
        assert!(matches!(
            streamer.next_frame(),
            Err(StreamError::Stalled(_))
        ));
    }

    #[test]
    fn stall_after_partial_frame() {
        // One subpage arrives, the second never does.
        let mut streamer = streamer(TickingSource::new(30f32, 0, 1));
        assert!(matches!(
            streamer.next_frame(),
            Err(StreamError::Stalled(_))
        ));
    }
}
