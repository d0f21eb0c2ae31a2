// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Terminal rendering of a frame as a fixed-width temperature grid.

use std::io::{self, Write};

use crate::frame::FrameImage;

/// Write `image` as one line per sensor row, two decimal places per cell.
pub fn write_grid<W>(out: &mut W, image: &FrameImage) -> io::Result<()>
where
    W: Write,
{
    for row in image.rows() {
        for temperature in row {
            write!(out, "{:4.2}  ", temperature)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
