// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Stream MLX90640 thermal camera frames as CSV text, and capture them back.
//!
//! This crate is the software around an MLX90640 thermal camera, not the
//! driver for it (that's [`mlx9064x`]). It has two halves, mirroring the two
//! programs built from it:
//!
//! * The *logger* (`thermal-logger`) polls a camera on a Linux I²C bus and
//!   writes one CSV line per pixel (`frame,row,col,temperature`) to stdout
//!   or a serial device, frame after frame.
//! * The *capture* side (`thermal-capture`) sits on the other end of the
//!   serial link, reassembles the CSV stream into 32×24 images, and renders
//!   them as temperature grids along with a per-pixel average across the
//!   session.
//!
//! The wire format is deliberately primitive. Each line stands alone, so a
//! listener can attach mid-frame, skip the startup banner and any line
//! noise, and still converge on complete images. [`capture`] leans on that:
//! a frame is done when every pixel has been seen, duplicate samples are
//! averaged, and anything unparseable is skipped.
//!
//! ```no_run
//! use thermal_logger::camera::Mlx90640Source;
//! use thermal_logger::{CsvSink, FrameStreamer};
//!
//! let camera = Mlx90640Source::open("/dev/i2c-1", 0x33)?;
//! let poll_interval = camera.poll_interval();
//! let mut streamer = FrameStreamer::new(camera, poll_interval);
//! let mut sink = CsvSink::new(std::io::stdout());
//! sink.write_banner()?;
//! let frame = streamer.next_frame()?;
//! sink.write_frame(&frame)?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! The camera updates one *subpage* (half the pixels) per measurement, so
//! [`FrameStreamer`] waits for two refreshes before emitting a frame; see
//! the `mlx9064x` documentation for the details of subpages and access
//! patterns.

pub mod camera;
pub mod capture;
pub mod error;
pub mod frame;
pub mod ports;
pub mod record;
pub mod render;
pub mod sink;
pub mod stream;
mod util;

pub use error::{CaptureError, PortError, StreamError};
pub use frame::{average_map, Frame, FrameAccumulator, FrameAssembler, FrameImage};
pub use frame::{HEIGHT, NUM_PIXELS, WIDTH};
pub use record::{ParseRecordError, PixelRecord};
pub use sink::{CsvSink, OutputTarget, BANNER};
pub use stream::{FrameSource, FrameStreamer, DEFAULT_EMISSIVITY_SCALE};
pub use util::{parse_address, parse_seconds, InvalidAddress, InvalidSeconds};
