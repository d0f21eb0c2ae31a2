// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("invalid I2C address {0:?}")]
pub struct InvalidAddress(String);

/// Parse an I²C address given as decimal or `0x`-prefixed hexadecimal.
pub fn parse_address(arg: &str) -> Result<u8, InvalidAddress> {
    let parsed = if let Some(hex_digits) = arg.strip_prefix("0x") {
        u8::from_str_radix(hex_digits, 16)
    } else {
        arg.parse()
    };
    parsed.map_err(|_| InvalidAddress(arg.to_string()))
}

#[derive(Error, Clone, Debug, PartialEq)]
#[error("invalid duration {0:?} (expected seconds)")]
pub struct InvalidSeconds(String);

/// Parse a duration given as a (fractional) number of seconds.
pub fn parse_seconds(arg: &str) -> Result<Duration, InvalidSeconds> {
    let seconds: f64 = arg.parse().map_err(|_| InvalidSeconds(arg.to_string()))?;
    if !seconds.is_finite() || seconds <= 0f64 {
        return Err(InvalidSeconds(arg.to_string()));
    }
    Ok(Duration::from_secs_f64(seconds))
}

#[cfg(test)]
mod test {
    use super::{parse_address, parse_seconds};

    use std::time::Duration;

    #[test]
    fn addresses_parse_in_both_bases() {
        assert_eq!(parse_address("0x33").unwrap(), 0x33);
        assert_eq!(parse_address("51").unwrap(), 51);
    }

    #[test]
    fn bad_addresses_rejected() {
        assert!(parse_address("0xZZ").is_err());
        assert!(parse_address("384").is_err());
        assert!(parse_address("").is_err());
    }

    #[test]
    fn seconds_parse() {
        assert_eq!(parse_seconds("3").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_seconds("0.5").unwrap(), Duration::from_millis(500));
        assert!(parse_seconds("0").is_err());
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("soon").is_err());
    }
}
