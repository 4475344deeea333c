//! Pure register encoding and decoding for the MAX44009.
//!
//! The sensor packs its wide dynamic range into a small floating-point
//! format: a 4-bit exponent and an 8-bit mantissa spread over the lux high
//! and low byte registers. Lux is computed as `2^exponent * mantissa * 0.72`.

use crate::Configuration;

/// Lux per mantissa count at exponent zero
pub const LUX_PER_COUNT: f64 = 0.72;

/// Largest exponent accepted by the threshold registers; 0b1111 marks overrange
const MAX_THRESHOLD_EXPONENT: u8 = 14;

const CONTINUOUS_BIT: u8 = 1 << 7;
const MANUAL_BIT: u8 = 1 << 6;
const CDR_BIT: u8 = 1 << 3;
const INTEGRATION_TIME_MASK: u8 = 0x07;

/// Which threshold register a threshold byte belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ThresholdKind {
    /// Upper threshold; the device fills the low mantissa nibble with ones
    Upper,
    /// Lower threshold; the device fills the low mantissa nibble with zeros
    Lower,
}

/// Encode the configuration register byte.
///
/// Only the low three bits of `integration_time` are used; larger values are
/// truncated rather than rejected.
pub fn encode_configuration(continuous: bool, manual: bool, cdr: bool, integration_time: u8) -> u8 {
    let mut config = 0;
    if continuous {
        config |= CONTINUOUS_BIT;
    }
    if manual {
        config |= MANUAL_BIT;
    }
    if cdr {
        config |= CDR_BIT;
    }
    config | (integration_time & INTEGRATION_TIME_MASK)
}

/// Decode a configuration register byte read back from the device
pub fn decode_configuration(byte: u8) -> Configuration {
    Configuration {
        continuous: byte & CONTINUOUS_BIT != 0,
        manual: byte & MANUAL_BIT != 0,
        current_division: byte & CDR_BIT != 0,
        integration_time: byte & INTEGRATION_TIME_MASK,
    }
}

/// Split the lux high and low bytes into `(exponent, mantissa)`
pub fn exponent_mantissa(high: u8, low: u8) -> (u8, u8) {
    let exponent = high >> 4;
    let mantissa = ((high & 0x0F) << 4) | (low & 0x0F);
    (exponent, mantissa)
}

/// Convert the lux high and low bytes into lux.
///
/// Computes `2^exponent * mantissa * 0.72` without clamping to the datasheet
/// maximum of 188,000 lux, so an overrange reading (exponent 0b1111) decodes
/// to a value far above it.
pub fn decode_luminosity(high: u8, low: u8) -> f64 {
    let (exponent, mantissa) = exponent_mantissa(high, low);
    scale(exponent, mantissa)
}

/// Lux value at which a threshold register byte trips
pub fn threshold_to_lux(byte: u8, kind: ThresholdKind) -> f64 {
    let exponent = byte >> 4;
    let low_nibble = match kind {
        ThresholdKind::Upper => 0x0F,
        ThresholdKind::Lower => 0x00,
    };
    scale(exponent, ((byte & 0x0F) << 4) | low_nibble)
}

/// Encode a lux value into a threshold register byte.
///
/// Uses the smallest exponent that keeps the mantissa within eight bits.
/// Upper thresholds round up to the next representable value, lower
/// thresholds round down, so the encoded window never shrinks. Returns
/// `None` for negative or NaN input and for values beyond the largest
/// threshold the device can hold.
pub fn lux_to_threshold(lux: f64, kind: ThresholdKind) -> Option<u8> {
    if lux.is_nan() || lux < 0.0 {
        return None;
    }
    let counts = lux / LUX_PER_COUNT;

    for exponent in 0..=MAX_THRESHOLD_EXPONENT {
        let mantissa = counts / f64::from(1u32 << exponent);
        if mantissa > 255.0 {
            continue;
        }
        let nibble = match kind {
            ThresholdKind::Upper => ceil_nonnegative((mantissa - 15.0) / 16.0),
            ThresholdKind::Lower => mantissa as u32 / 16,
        };
        // mantissa <= 255 keeps both nibbles within 0..=15
        return Some((exponent << 4) | nibble.min(15) as u8);
    }
    None
}

fn scale(exponent: u8, mantissa: u8) -> f64 {
    f64::from(1u32 << exponent) * f64::from(mantissa) * LUX_PER_COUNT
}

fn ceil_nonnegative(value: f64) -> u32 {
    if value <= 0.0 {
        return 0;
    }
    let truncated = value as u32;
    if f64::from(truncated) < value {
        truncated + 1
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_encode_configuration() {
        assert_eq!(encode_configuration(true, false, true, 5), 0x8D);
        assert_eq!(encode_configuration(false, false, false, 0), 0x00);
        assert_eq!(encode_configuration(true, true, false, 3), 0xC3);
    }

    #[test]
    fn test_integration_time_is_truncated() {
        assert_eq!(
            encode_configuration(false, false, false, 255),
            encode_configuration(false, false, false, 7)
        );
        assert_eq!(encode_configuration(false, false, false, 0x0B), 0x03);
    }

    #[test]
    fn test_decode_configuration() {
        let config = decode_configuration(0x8D);
        assert!(config.continuous);
        assert!(!config.manual);
        assert!(config.current_division);
        assert_eq!(config.integration_time, 5);
        assert_eq!(config.to_byte(), 0x8D);

        // Unused bits 5 and 4 are ignored
        assert_eq!(decode_configuration(0x33), Configuration::default());
    }

    #[test]
    fn test_exponent_mantissa_ignores_low_byte_high_nibble() {
        assert_eq!(exponent_mantissa(0x1F, 0x00), (1, 0xF0));
        assert_eq!(exponent_mantissa(0x1F, 0xF0), (1, 0xF0));
        assert_eq!(exponent_mantissa(0xA5, 0x0C), (0x0A, 0x5C));
    }

    #[test]
    fn test_decode_luminosity() {
        assert_eq!(decode_luminosity(0x00, 0x00), 0.0);
        assert_close(decode_luminosity(0x1F, 0x00), 345.6);
        assert_close(decode_luminosity(0x00, 0x01), 0.72);
    }

    #[test]
    fn test_decode_luminosity_is_not_clamped() {
        let lux = decode_luminosity(0xFF, 0xFF);
        assert_close(lux, 32768.0 * 255.0 * 0.72);
        assert!(lux > 188_000.0);
    }

    #[test]
    fn test_threshold_to_lux() {
        assert_close(threshold_to_lux(0x3A, ThresholdKind::Lower), 921.6);
        assert_close(threshold_to_lux(0x3A, ThresholdKind::Upper), 1008.0);
        assert_close(threshold_to_lux(0x00, ThresholdKind::Upper), 10.8);
        assert_eq!(threshold_to_lux(0x00, ThresholdKind::Lower), 0.0);
    }

    #[test]
    fn test_lux_to_threshold_brackets_the_request() {
        assert_eq!(lux_to_threshold(1000.0, ThresholdKind::Lower), Some(0x3A));
        assert_eq!(lux_to_threshold(1000.0, ThresholdKind::Upper), Some(0x3A));

        for lux in [0.5, 10.0, 250.0, 4321.0, 65_000.0, 150_000.0] {
            let lower = lux_to_threshold(lux, ThresholdKind::Lower).unwrap();
            let upper = lux_to_threshold(lux, ThresholdKind::Upper).unwrap();
            assert!(threshold_to_lux(lower, ThresholdKind::Lower) <= lux);
            assert!(threshold_to_lux(upper, ThresholdKind::Upper) >= lux);
        }
    }

    #[test]
    fn test_lux_to_threshold_rejects_unrepresentable() {
        assert_eq!(lux_to_threshold(-1.0, ThresholdKind::Upper), None);
        assert_eq!(lux_to_threshold(f64::NAN, ThresholdKind::Lower), None);
        assert_eq!(lux_to_threshold(1.0e9, ThresholdKind::Upper), None);
        assert_eq!(lux_to_threshold(0.0, ThresholdKind::Lower), Some(0x00));
    }
}
