// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! The outbound side of the serial link.
//!
//! The logger's output is plain text: one banner line once the camera is up,
//! then one CSV line per pixel. Writes are buffered and flushed once per
//! frame so a serial device sees a burst of whole lines instead of a syscall
//! per pixel.

use std::io::{self, Write};
use std::time::Duration;

use crate::error::PortError;
use crate::frame::Frame;
use crate::ports;

/// Printed once after the camera initializes, before any records.
pub const BANNER: &str = "MLX90640 ready";

/// Read/write timeout used for serial output targets.
const SERIAL_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Writes the logger's text protocol to any byte sink.
#[derive(Debug)]
pub struct CsvSink<W>
where
    W: Write,
{
    writer: io::BufWriter<W>,
}

impl<W> CsvSink<W>
where
    W: Write,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: io::BufWriter::new(writer),
        }
    }

    /// Write the startup banner.
    pub fn write_banner(&mut self) -> io::Result<()> {
        writeln!(self.writer, "{}", BANNER)?;
        self.writer.flush()
    }

    /// Write every record of `frame` followed by a single flush.
    pub fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        for record in frame.records() {
            writeln!(self.writer, "{}", record)?;
        }
        self.writer.flush()
    }
}

/// Where the CSV stream should go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputTarget {
    /// Standard output.
    Stdout,

    /// A serial device, opened at the logger's baud rate.
    Serial(String),
}

impl OutputTarget {
    /// `-` selects stdout; anything else is treated as a serial device path.
    pub fn parse(arg: &str) -> Self {
        if arg == "-" {
            Self::Stdout
        } else {
            Self::Serial(arg.to_string())
        }
    }

    /// Open the target for writing.
    pub fn open(&self) -> Result<Box<dyn Write + Send>, PortError> {
        match self {
            Self::Stdout => Ok(Box::new(io::stdout())),
            Self::Serial(path) => {
                let port = ports::open_port(path, SERIAL_WRITE_TIMEOUT)?;
                Ok(Box::new(port))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{CsvSink, OutputTarget, BANNER};
    use crate::frame::{Frame, FrameImage, NUM_PIXELS};

    #[test]
    fn banner_then_records() {
        let mut buffer = Vec::new();
        let mut sink = CsvSink::new(&mut buffer);
        sink.write_banner().unwrap();
        let frame = Frame {
            index: 4,
            image: FrameImage::zeroed(),
        };
        sink.write_frame(&frame).unwrap();
        drop(sink);

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + NUM_PIXELS);
        assert_eq!(lines[0], BANNER);
        assert_eq!(lines[1], "4,0,0,0.00");
        assert_eq!(lines[NUM_PIXELS], "4,23,31,0.00");
    }

    #[test]
    fn dash_is_stdout() {
        assert_eq!(OutputTarget::parse("-"), OutputTarget::Stdout);
        assert_eq!(
            OutputTarget::parse("/dev/ttyACM0"),
            OutputTarget::Serial("/dev/ttyACM0".to_string())
        );
    }
}
