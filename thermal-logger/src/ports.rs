// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Finding and opening the logger's serial port.
//!
//! The logger enumerates as a USB CDC-ACM device (typically a Teensy or
//! similar dev board), which shows up as `/dev/cu.usbmodem*` on macOS and
//! `/dev/ttyACM*` on Linux. Discovery goes by those names rather than USB
//! VID/PID pairs so that swapping the dev board doesn't break the tools.

use std::thread;
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, SerialPort, SerialPortInfo};
use tracing::{debug, trace, warn};

use crate::error::PortError;

/// The serial link's baud rate, on both ends.
pub const BAUD_RATE: u32 = 115_200;

/// How long to sleep between discovery attempts in [`wait_for_port`].
const DISCOVERY_INTERVAL: Duration = Duration::from_millis(500);

/// Name fragments used by CDC-ACM serial devices.
const PORT_NAME_HINTS: [&str; 2] = ["usbmodem", "ttyACM"];

fn looks_like_logger(info: &SerialPortInfo) -> bool {
    trace!(port = %info.port_name, "checking port");
    PORT_NAME_HINTS
        .iter()
        .any(|hint| info.port_name.contains(hint))
}

/// Enumerate serial ports and pick the first one that looks like the logger.
pub fn find_port() -> Result<SerialPortInfo, PortError> {
    let ports = serialport::available_ports()?;
    trace!("found {} ports to check", ports.len());
    ports
        .into_iter()
        .find(looks_like_logger)
        .ok_or(PortError::NotFound)
}

/// Keep retrying discovery until a port shows up or `timeout` passes.
///
/// Useful right after plugging the board in, when the OS can take a moment
/// to create the device node.
pub fn wait_for_port(timeout: Duration) -> Result<SerialPortInfo, PortError> {
    let deadline = Instant::now() + timeout;
    loop {
        match find_port() {
            Ok(info) => return Ok(info),
            Err(PortError::NotFound) => {}
            Err(error) => {
                // Enumeration itself failing is usually permissions, not
                // timing; don't spin on it silently.
                warn!(%error, "port enumeration failed");
            }
        }
        if Instant::now() >= deadline {
            return Err(PortError::WaitTimeout(timeout));
        }
        trace!("no port yet, sleeping before the next check");
        thread::sleep(DISCOVERY_INTERVAL);
    }
}

/// Open a port at the logger's baud rate and drop any stale input.
///
/// The input buffer can hold a partial frame from before the tool attached,
/// so it is cleared before the first read.
pub fn open_port(path: &str, read_timeout: Duration) -> Result<Box<dyn SerialPort>, PortError> {
    let port = serialport::new(path, BAUD_RATE)
        .timeout(read_timeout)
        .open()?;
    port.clear(ClearBuffer::Input)?;
    debug!(port = path, baud = BAUD_RATE, "serial port opened");
    Ok(port)
}

#[cfg(test)]
mod test {
    use super::looks_like_logger;

    use serialport::{SerialPortInfo, SerialPortType};

    fn info(name: &str) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::Unknown,
        }
    }

    #[test]
    fn cdc_acm_names_match() {
        assert!(looks_like_logger(&info("/dev/cu.usbmodem175676601")));
        assert!(looks_like_logger(&info("/dev/ttyACM0")));
    }

    #[test]
    fn other_ports_skipped() {
        assert!(!looks_like_logger(&info("/dev/ttyS0")));
        assert!(!looks_like_logger(&info("/dev/ttyUSB0")));
    }
}
