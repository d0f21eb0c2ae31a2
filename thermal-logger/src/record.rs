// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! The CSV wire format.
//!
//! Every pixel of every frame is reported as one line of text:
//!
//! ```text
//! frame,row,col,temperature
//! ```
//!
//! `frame` is a monotonically increasing counter, `row` and `col` locate the
//! pixel on the 24×32 grid, and `temperature` is in degrees Celsius with two
//! decimal places. The format is deliberately line-oriented so a listener
//! can join the stream mid-frame and resynchronize on the next line.

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

/// One pixel temperature sample, as carried on the wire.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelRecord {
    /// The index of the frame this sample belongs to.
    pub frame: u32,

    /// Row on the sensor grid, from the top.
    pub row: u8,

    /// Column on the sensor grid, from the left.
    pub col: u8,

    /// Temperature in degrees Celsius.
    pub temperature: f32,
}

impl PixelRecord {
    /// Return a copy of this record with the temperature multiplied by
    /// `scale`.
    ///
    /// The logger uses this for the emissivity correction; a scale of 0.98 is
    /// a reasonable value for human skin.
    pub fn scaled(mut self, scale: f32) -> Self {
        self.temperature *= scale;
        self
    }
}

impl fmt::Display for PixelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{:.2}",
            self.frame, self.row, self.col, self.temperature
        )
    }
}

/// Errors encountered while parsing a line of CSV into a [`PixelRecord`].
///
/// A stream can contain non-record lines (the startup banner, line noise from
/// a freshly opened serial port), so consumers usually treat these errors as
/// "skip this line" rather than failures.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ParseRecordError {
    #[error("expected 4 comma-separated fields, found {0}")]
    FieldCount(usize),

    #[error("unparseable frame index {0:?}")]
    Frame(String),

    #[error("unparseable row {0:?}")]
    Row(String),

    #[error("unparseable column {0:?}")]
    Column(String),

    #[error("unparseable temperature {0:?}")]
    Temperature(String),
}

impl FromStr for PixelRecord {
    type Err = ParseRecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut fields = [""; 4];
        let mut count = 0;
        for field in line.trim().split(',') {
            if count == fields.len() {
                return Err(ParseRecordError::FieldCount(count + 1));
            }
            fields[count] = field.trim();
            count += 1;
        }
        if count != fields.len() {
            return Err(ParseRecordError::FieldCount(count));
        }
        let frame = fields[0]
            .parse()
            .map_err(|_| ParseRecordError::Frame(fields[0].to_string()))?;
        let row = fields[1]
            .parse()
            .map_err(|_| ParseRecordError::Row(fields[1].to_string()))?;
        let col = fields[2]
            .parse()
            .map_err(|_| ParseRecordError::Column(fields[2].to_string()))?;
        let temperature = fields[3]
            .parse()
            .map_err(|_| ParseRecordError::Temperature(fields[3].to_string()))?;
        Ok(Self {
            frame,
            row,
            col,
            temperature,
        })
    }
}

#[cfg(test)]
mod test {
    use super::{ParseRecordError, PixelRecord};

    use float_cmp::assert_approx_eq;

    #[test]
    fn display_two_decimal_places() {
        let record = PixelRecord {
            frame: 7,
            row: 3,
            col: 21,
            temperature: 36.578,
        };
        assert_eq!(record.to_string(), "7,3,21,36.58");
    }

    #[test]
    fn display_pads_fractions() {
        let record = PixelRecord {
            frame: 0,
            row: 0,
            col: 0,
            temperature: 25f32,
        };
        assert_eq!(record.to_string(), "0,0,0,25.00");
    }

    #[test]
    fn parse_round_trip() {
        let record: PixelRecord = "12,23,31,-40.25".parse().unwrap();
        assert_eq!(record.frame, 12);
        assert_eq!(record.row, 23);
        assert_eq!(record.col, 31);
        assert_approx_eq!(f32, record.temperature, -40.25);
    }

    #[test]
    fn parse_tolerates_whitespace() {
        let record: PixelRecord = " 1, 2 ,3, 36.50 \r\n".parse().unwrap();
        assert_eq!((record.frame, record.row, record.col), (1, 2, 3));
    }

    #[test]
    fn parse_rejects_wrong_field_count() {
        assert_eq!(
            "1,2,3".parse::<PixelRecord>(),
            Err(ParseRecordError::FieldCount(3))
        );
        assert_eq!(
            "1,2,3,4,5".parse::<PixelRecord>(),
            Err(ParseRecordError::FieldCount(5))
        );
    }

    #[test]
    fn parse_rejects_bad_fields() {
        assert!(matches!(
            "x,2,3,36.5".parse::<PixelRecord>(),
            Err(ParseRecordError::Frame(_))
        ));
        assert!(matches!(
            "1,300,3,36.5".parse::<PixelRecord>(),
            Err(ParseRecordError::Row(_))
        ));
        assert!(matches!(
            "1,2,x,36.5".parse::<PixelRecord>(),
            Err(ParseRecordError::Column(_))
        ));
        assert!(matches!(
            "1,2,3,warm".parse::<PixelRecord>(),
            Err(ParseRecordError::Temperature(_))
        ));
    }

    #[test]
    fn scaled_applies_emissivity() {
        let record = PixelRecord {
            frame: 0,
            row: 0,
            col: 0,
            temperature: 100f32,
        };
        assert_approx_eq!(f32, record.scaled(0.98).temperature, 98f32);
    }
}
