// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use std::io;
use std::time::Duration;

use thiserror::Error;

/// Boxed source for errors coming out of the camera driver.
///
/// The driver's error type is generic over the I²C implementation; boxing it
/// here keeps that generic from spreading through the rest of the crate.
pub type CameraErrorSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors while acquiring frames from the camera.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Opening the I²C bus device failed.
    #[error("failed to open I2C bus {path:?}")]
    Bus {
        path: String,
        #[source]
        source: CameraErrorSource,
    },

    /// The camera did not respond during initialization.
    #[error("MLX90640 not found at address {address:#04x}")]
    NotFound {
        address: u8,
        #[source]
        source: CameraErrorSource,
    },

    /// The camera reported an error after initialization.
    #[error("camera error")]
    Camera(#[source] CameraErrorSource),

    /// The requested frame rate isn't one the camera supports.
    #[error("unsupported frame rate {0:?}")]
    FrameRate(String),

    /// No new subpage arrived within the stall timeout.
    #[error("no new data from the camera within {0:?}")]
    Stalled(Duration),
}

impl StreamError {
    pub(crate) fn camera<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Camera(Box::new(error))
    }
}

/// Errors while capturing a CSV stream back into frames.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// A frame didn't fill up within its deadline.
    #[error("timed out after {timeout:?} with {covered} of {expected} pixels")]
    FrameTimeout {
        timeout: Duration,
        covered: usize,
        expected: usize,
    },

    /// The stream ended before a frame filled up.
    #[error("stream ended with {covered} of {expected} pixels")]
    Truncated { covered: usize, expected: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors while locating or opening the logger's serial port.
#[derive(Error, Debug)]
pub enum PortError {
    /// Port enumeration worked, but nothing looked like the logger.
    #[error("no serial port that looks like the logger was found")]
    NotFound,

    /// Discovery kept coming up empty until the deadline passed.
    #[error("gave up waiting for the logger's serial port after {0:?}")]
    WaitTimeout(Duration),

    #[error(transparent)]
    Serial(#[from] serialport::Error),
}
