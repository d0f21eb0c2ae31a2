// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! The inbound side: turning a CSV stream back into frames.
//!
//! The capture side has to deal with everything a serial link does to a text
//! stream: joining mid-frame, the startup banner, partial lines from read
//! timeouts, and occasional line noise. Anything that doesn't parse as a
//! record is skipped, and frames are considered done when every pixel has
//! been seen at least once, not when the frame index rolls over; a stream
//! joined mid-frame still converges on a full image this way.

use std::io::{self, BufRead, Write};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::error::CaptureError;
use crate::frame::{Frame, FrameAccumulator, NUM_PIXELS};
use crate::record::PixelRecord;

/// Default number of frames for a capture session.
pub const DEFAULT_FRAME_COUNT: usize = 10;

/// Default per-frame deadline.
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_secs(3);

/// Default duration for [`listen`].
pub const DEFAULT_LISTEN_DURATION: Duration = Duration::from_secs(10);

enum Poll {
    Line,
    Empty,
    Eof,
}

/// Read one line, treating read timeouts as "nothing arrived yet".
///
/// Serial reads with a timeout surface as [`io::ErrorKind::TimedOut`] (or
/// `WouldBlock` on some platforms); both just mean the logger hasn't sent
/// anything lately.
fn poll_line<R>(reader: &mut R, line: &mut String) -> Result<Poll, io::Error>
where
    R: BufRead,
{
    line.clear();
    match reader.read_line(line) {
        Ok(0) => Ok(Poll::Eof),
        Ok(_) => Ok(Poll::Line),
        Err(error)
            if matches!(
                error.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
            ) =>
        {
            Ok(Poll::Empty)
        }
        Err(error) => Err(error),
    }
}

/// Echo raw lines from the stream to `out` for a bounded duration.
pub fn listen<R, W>(mut reader: R, duration: Duration, out: &mut W) -> Result<(), CaptureError>
where
    R: BufRead,
    W: Write,
{
    let deadline = Instant::now() + duration;
    let mut line = String::new();
    while Instant::now() < deadline {
        match poll_line(&mut reader, &mut line)? {
            Poll::Line => writeln!(out, "{}", line.trim_end())?,
            Poll::Empty => continue,
            Poll::Eof => break,
        }
    }
    out.flush()?;
    Ok(())
}

/// Assemble one complete frame from the stream.
///
/// Completion means full pixel coverage. Samples are folded in no matter
/// which frame index they were reported under, so a capture straddling a
/// frame boundary averages the two frames rather than failing; the returned
/// frame carries the first index seen. Fails when the deadline passes or the
/// stream ends first.
pub fn capture_frame<R>(reader: &mut R, timeout: Duration) -> Result<Frame, CaptureError>
where
    R: BufRead,
{
    let deadline = Instant::now() + timeout;
    let mut accumulator = FrameAccumulator::new();
    let mut first_index = None;
    let mut line = String::new();
    while !accumulator.is_complete() {
        if Instant::now() > deadline {
            return Err(CaptureError::FrameTimeout {
                timeout,
                covered: accumulator.covered(),
                expected: NUM_PIXELS,
            });
        }
        match poll_line(reader, &mut line)? {
            Poll::Line => {
                let record: PixelRecord = match line.parse() {
                    Ok(record) => record,
                    Err(error) => {
                        trace!(%error, "skipping non-record line");
                        continue;
                    }
                };
                if !accumulator.push(&record) {
                    trace!(row = record.row, col = record.col, "pixel off the grid");
                    continue;
                }
                first_index.get_or_insert(record.frame);
            }
            Poll::Empty => continue,
            Poll::Eof => {
                return Err(CaptureError::Truncated {
                    covered: accumulator.covered(),
                    expected: NUM_PIXELS,
                })
            }
        }
    }
    Ok(Frame {
        index: first_index.unwrap_or(0),
        image: accumulator.finish(),
    })
}

/// Capture up to `count` frames in sequence.
///
/// A frame timing out (or the stream ending) stops the session early, but
/// the frames already assembled are still returned.
pub fn capture_frames<R>(
    mut reader: R,
    count: usize,
    frame_timeout: Duration,
) -> Result<Vec<Frame>, CaptureError>
where
    R: BufRead,
{
    let mut frames = Vec::with_capacity(count);
    while frames.len() < count {
        match capture_frame(&mut reader, frame_timeout) {
            Ok(frame) => {
                debug!(
                    captured = frames.len() + 1,
                    of = count,
                    index = frame.index,
                    "frame captured"
                );
                frames.push(frame);
            }
            Err(error @ (CaptureError::FrameTimeout { .. } | CaptureError::Truncated { .. })) => {
                warn!(%error, captured = frames.len(), "capture ended early");
                break;
            }
            Err(error) => return Err(error),
        }
    }
    Ok(frames)
}

#[cfg(test)]
mod test {
    use super::*;

    use std::io::Cursor;

    use float_cmp::assert_approx_eq;

    use crate::frame::{HEIGHT, WIDTH};

    fn full_frame_csv(index: u32, temperature: f32) -> String {
        let mut text = String::new();
        for row in 0..HEIGHT {
            for col in 0..WIDTH {
                text.push_str(&format!("{},{},{},{:.2}\n", index, row, col, temperature));
            }
        }
        text
    }

    #[test]
    fn noise_lines_are_skipped() {
        let mut text = String::from("MLX90640 ready\n\u{0}\u{0}garbage\n");
        text.push_str(&full_frame_csv(0, 21.5));
        let mut reader = Cursor::new(text);
        let frame = capture_frame(&mut reader, Duration::from_secs(3)).unwrap();
        assert_eq!(frame.index, 0);
        assert_approx_eq!(f32, frame.image.get(10, 10).unwrap(), 21.5);
    }

    #[test]
    fn truncated_stream_reports_coverage() {
        let text = "0,0,0,21.00\n0,0,1,21.00\n";
        let mut reader = Cursor::new(text);
        let error = capture_frame(&mut reader, Duration::from_secs(3)).unwrap_err();
        match error {
            CaptureError::Truncated { covered, expected } => {
                assert_eq!(covered, 2);
                assert_eq!(expected, NUM_PIXELS);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn session_keeps_complete_frames() {
        let mut text = full_frame_csv(0, 20.0);
        text.push_str(&full_frame_csv(1, 22.0));
        // A trailing partial frame is dropped.
        text.push_str("2,0,0,24.00\n");
        let frames = capture_frames(Cursor::new(text), 5, Duration::from_secs(3)).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].index, 0);
        assert_eq!(frames[1].index, 1);
        assert_approx_eq!(f32, frames[1].image.get(0, 0).unwrap(), 22.0);
    }

    #[test]
    fn listen_echoes_lines() {
        let text = "MLX90640 ready\r\n0,0,0,20.00\n";
        let mut out = Vec::new();
        listen(Cursor::new(text), Duration::from_secs(1), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "MLX90640 ready\n0,0,0,20.00\n"
        );
    }
}
