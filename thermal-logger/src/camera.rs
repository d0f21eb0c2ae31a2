// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! The real camera, an MLX90640 behind `embedded-hal`'s I²C traits.
//!
//! Everything hard about the sensor (transaction framing, register access,
//! and the calibration math) lives in the `mlx9064x` driver. This module
//! opens the bus, maps the driver's generic error type into [`StreamError`],
//! and adapts the driver to [`FrameSource`] so the acquisition loop doesn't
//! have to know about subpages beyond counting refreshes.

use std::convert::TryFrom;
use std::error::Error as StdError;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use embedded_hal::blocking::i2c::{Write, WriteRead};
use linux_embedded_hal::I2cdev;
use mlx9064x::{FrameRate, Mlx90640Driver};
use tracing::{debug, info};

use crate::error::StreamError;
use crate::frame::NUM_PIXELS;
use crate::stream::FrameSource;

/// The factory-default I²C address for the MLX90640.
pub const DEFAULT_ADDRESS: u8 = 0x33;

/// An MLX90640 on any `embedded-hal` I²C bus.
pub struct Mlx90640Source<I2C>
where
    I2C: Write + WriteRead,
{
    driver: Mlx90640Driver<I2C>,
    frame_rate: FrameRate,
}

impl<I2C> Mlx90640Source<I2C>
where
    I2C: Write + WriteRead + 'static,
    <I2C as WriteRead>::Error: 'static + StdError + fmt::Debug + Sync + Send,
    <I2C as Write>::Error: 'static + StdError + fmt::Debug + Sync + Send,
{
    /// Create a source for the camera at `address` on an already-open bus.
    ///
    /// The driver loads the camera's calibration data over I²C during
    /// construction, so a missing or unresponsive camera fails here.
    pub fn new(bus: I2C, address: u8) -> Result<Self, StreamError> {
        let mut driver =
            Mlx90640Driver::new(bus, address).map_err(|error| StreamError::NotFound {
                address,
                source: Box::new(error),
            })?;
        let frame_rate = driver.frame_rate().map_err(StreamError::camera)?;
        info!(address, rate = f32::from(frame_rate), "MLX90640 initialized");
        Ok(Self { driver, frame_rate })
    }

    /// Program a new frame rate on the camera.
    pub fn set_frame_rate(&mut self, frame_rate: FrameRate) -> Result<(), StreamError> {
        self.driver
            .set_frame_rate(frame_rate)
            .map_err(StreamError::camera)?;
        self.frame_rate = frame_rate;
        debug!(rate = f32::from(frame_rate), "frame rate updated");
        Ok(())
    }

    /// The camera's frame rate as of the last read or write of it.
    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    /// A reasonable polling interval for this camera: half the frame period.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f32(f32::from(self.frame_rate).recip() / 2f32)
    }
}

impl Mlx90640Source<I2cdev> {
    /// Open the camera on a Linux I²C bus device (for example `/dev/i2c-1`).
    pub fn open<P>(bus: P, address: u8) -> Result<Self, StreamError>
    where
        P: AsRef<Path>,
    {
        let path = bus.as_ref();
        let bus = I2cdev::new(path).map_err(|error| StreamError::Bus {
            path: path.display().to_string(),
            source: Box::new(error),
        })?;
        Self::new(bus, address)
    }
}

impl<I2C> FrameSource for Mlx90640Source<I2C>
where
    I2C: Write + WriteRead + 'static,
    <I2C as WriteRead>::Error: 'static + StdError + fmt::Debug + Sync + Send,
    <I2C as Write>::Error: 'static + StdError + fmt::Debug + Sync + Send,
{
    fn refresh(&mut self, destination: &mut [f32; NUM_PIXELS]) -> Result<bool, StreamError> {
        self.driver
            .generate_image_if_ready(&mut destination[..])
            .map_err(StreamError::camera)
    }
}

/// Parse a frame rate argument (in Hz) into the driver's [`FrameRate`].
///
/// Only the rates the camera implements (0.5 through 64, in powers of two)
/// are accepted.
pub fn parse_frame_rate(arg: &str) -> Result<FrameRate, StreamError> {
    let hertz: f32 = arg
        .parse()
        .map_err(|_| StreamError::FrameRate(arg.to_string()))?;
    FrameRate::try_from(hertz).map_err(|_| StreamError::FrameRate(arg.to_string()))
}

#[cfg(test)]
mod test {
    use super::parse_frame_rate;
    use crate::error::StreamError;

    use mlx9064x::FrameRate;

    #[test]
    fn frame_rates_parse() {
        assert_eq!(parse_frame_rate("0.5").unwrap(), FrameRate::Half);
        assert_eq!(parse_frame_rate("2").unwrap(), FrameRate::Two);
        assert_eq!(parse_frame_rate("64").unwrap(), FrameRate::SixtyFour);
    }

    #[test]
    fn unsupported_frame_rates_rejected() {
        assert!(matches!(
            parse_frame_rate("3"),
            Err(StreamError::FrameRate(_))
        ));
        assert!(matches!(
            parse_frame_rate("fast"),
            Err(StreamError::FrameRate(_))
        ));
    }
}
