//! # Axis Scaling
//!
//! Linear conversion from the signed 16-bit range used by generic gamepad
//! front-ends (`-32768..=32767`) to the unsigned 8-bit stick range of the
//! DualSense report (`0..=255`, center `0x80`).
//!
//! ## Rounding
//!
//! The offset input `v + 32768` is scaled by `255 / 65535` and rounded to the
//! nearest integer, halves rounding up:
//!
//! ```text
//! out = ((v + 32768) * 255 + 32767) / 65535
//! ```
//!
//! | Input | Output |
//! |-------|--------|
//! | -32768 | 0 |
//! | -1 | 127 |
//! | 0 | 128 |
//! | 32767 | 255 |

/// Smallest signed axis input.
pub const AXIS_INPUT_MIN: i16 = i16::MIN;
/// Largest signed axis input.
pub const AXIS_INPUT_MAX: i16 = i16::MAX;

const INPUT_SPAN: u32 = u16::MAX as u32;
const OUTPUT_SPAN: u32 = u8::MAX as u32;

/// Rescales a signed 16-bit axis value to the 8-bit report range.
///
/// # Examples
///
/// ```
/// use dualsense_bus::report::scaling::axis_to_byte;
///
/// assert_eq!(axis_to_byte(i16::MIN), 0);
/// assert_eq!(axis_to_byte(0), 0x80);
/// assert_eq!(axis_to_byte(i16::MAX), 0xFF);
/// ```
pub fn axis_to_byte(value: i16) -> u8 {
    let offset = (i32::from(value) - i32::from(AXIS_INPUT_MIN)) as u32;
    let scaled = (offset * OUTPUT_SPAN + INPUT_SPAN / 2) / INPUT_SPAN;
    // offset <= INPUT_SPAN, so scaled <= OUTPUT_SPAN
    scaled as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_to_byte_endpoints() {
        assert_eq!(axis_to_byte(AXIS_INPUT_MIN), 0);
        assert_eq!(axis_to_byte(AXIS_INPUT_MAX), 255);
    }

    #[test]
    fn test_axis_to_byte_midpoint() {
        assert_eq!(axis_to_byte(0), 128);
        assert_eq!(axis_to_byte(-1), 127);
    }

    #[test]
    fn test_axis_to_byte_is_monotonic() {
        let mut previous = 0u8;
        for value in (i16::MIN..=i16::MAX).step_by(97) {
            let current = axis_to_byte(value);
            assert!(current >= previous, "not monotonic at {}", value);
            previous = current;
        }
    }

    #[test]
    fn test_axis_to_byte_rounds_to_nearest() {
        // 257 input steps per output step; 128 steps above a boundary still rounds down
        assert_eq!(axis_to_byte(-32768 + 128), 0);
        assert_eq!(axis_to_byte(-32768 + 129), 1);
    }
}
