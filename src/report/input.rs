//! # Input Report State
//!
//! In-memory model of the DualSense input report and its wire encoding.
//!
//! ## Wire Layout (little-endian)
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 2 | Buttons mask (bits 0-3: d-pad code) |
//! | 2 | 1 | Special buttons mask |
//! | 3 | 1 | Left stick X |
//! | 4 | 1 | Left stick Y |
//! | 5 | 1 | Right stick X |
//! | 6 | 1 | Right stick Y |
//! | 7 | 1 | Left trigger |
//! | 8 | 1 | Right trigger |

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::catalog::{AnyButton, Axis, DPadDirection, Slider};

/// Encoded size of a structured input report.
pub const INPUT_REPORT_SIZE: usize = 9;

/// Largest raw input report the bus driver accepts.
pub const MAX_RAW_INPUT_REPORT_SIZE: usize = 63;

/// Centered stick value.
pub const AXIS_CENTER: u8 = 0x80;

/// Bits of the buttons mask reserved for the d-pad code.
pub const DPAD_MASK: u16 = 0x000F;

/// DualSense input report.
///
/// Fields are only changed through the mutators below so the d-pad nibble
/// always holds exactly one direction code.
///
/// # Examples
///
/// ```
/// use dualsense_bus::report::catalog::{Button, DPadDirection};
/// use dualsense_bus::report::input::InputReport;
///
/// let mut report = InputReport::RESTING;
/// report.set_button(Button::Cross, true);
/// report.set_dpad(DPadDirection::East);
/// assert_eq!(report.buttons(), 0x0022);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputReport {
    buttons: u16,
    special: u8,
    thumb_lx: u8,
    thumb_ly: u8,
    thumb_rx: u8,
    thumb_ry: u8,
    trigger_l: u8,
    trigger_r: u8,
}

impl Default for InputReport {
    fn default() -> Self {
        Self::RESTING
    }
}

impl InputReport {
    /// Canonical resting state: d-pad released, sticks centered, everything
    /// else zero.
    pub const RESTING: InputReport = InputReport {
        buttons: DPadDirection::None.code() as u16,
        special: 0,
        thumb_lx: AXIS_CENTER,
        thumb_ly: AXIS_CENTER,
        thumb_rx: AXIS_CENTER,
        thumb_ry: AXIS_CENTER,
        trigger_l: 0,
        trigger_r: 0,
    };

    /// Overwrites every field with the resting state.
    pub fn reset(&mut self) {
        *self = Self::RESTING;
    }

    /// Presses or releases a button. Standard buttons edit the buttons
    /// mask, special buttons edit the special mask.
    pub fn set_button(&mut self, button: impl Into<AnyButton>, pressed: bool) {
        match button.into() {
            AnyButton::Standard(button) => {
                if pressed {
                    self.buttons |= button.mask();
                } else {
                    self.buttons &= !button.mask();
                }
            }
            AnyButton::Special(button) => {
                if pressed {
                    self.special |= button.mask();
                } else {
                    self.special &= !button.mask();
                }
            }
        }
    }

    /// Returns whether a button is currently pressed.
    pub fn is_pressed(&self, button: impl Into<AnyButton>) -> bool {
        match button.into() {
            AnyButton::Standard(button) => self.buttons & button.mask() != 0,
            AnyButton::Special(button) => self.special & button.mask() != 0,
        }
    }

    /// Replaces the d-pad nibble with `direction`'s code.
    pub fn set_dpad(&mut self, direction: DPadDirection) {
        self.buttons = (self.buttons & !DPAD_MASK) | u16::from(direction.code());
    }

    /// Current d-pad direction. `None` is also returned for codes outside
    /// 0x0-0x8, which can only arrive through [`InputReport::set_buttons_full`].
    pub fn dpad(&self) -> DPadDirection {
        DPadDirection::from_code((self.buttons & DPAD_MASK) as u8).unwrap_or_default()
    }

    pub fn set_axis(&mut self, axis: Axis, value: u8) {
        match axis {
            Axis::LeftThumbX => self.thumb_lx = value,
            Axis::LeftThumbY => self.thumb_ly = value,
            Axis::RightThumbX => self.thumb_rx = value,
            Axis::RightThumbY => self.thumb_ry = value,
        }
    }

    pub fn axis(&self, axis: Axis) -> u8 {
        match axis {
            Axis::LeftThumbX => self.thumb_lx,
            Axis::LeftThumbY => self.thumb_ly,
            Axis::RightThumbX => self.thumb_rx,
            Axis::RightThumbY => self.thumb_ry,
        }
    }

    pub fn set_slider(&mut self, slider: Slider, value: u8) {
        match slider {
            Slider::LeftTrigger => self.trigger_l = value,
            Slider::RightTrigger => self.trigger_r = value,
        }
    }

    pub fn slider(&self, slider: Slider) -> u8 {
        match slider {
            Slider::LeftTrigger => self.trigger_l,
            Slider::RightTrigger => self.trigger_r,
        }
    }

    /// Overwrites the whole buttons mask, d-pad nibble included.
    pub fn set_buttons_full(&mut self, buttons: u16) {
        self.buttons = buttons;
    }

    /// Overwrites the whole special mask.
    pub fn set_special_buttons_full(&mut self, special: u8) {
        self.special = special;
    }

    pub fn buttons(&self) -> u16 {
        self.buttons
    }

    pub fn special_buttons(&self) -> u8 {
        self.special
    }

    pub fn left_thumb_x(&self) -> u8 {
        self.thumb_lx
    }

    pub fn left_thumb_y(&self) -> u8 {
        self.thumb_ly
    }

    pub fn right_thumb_x(&self) -> u8 {
        self.thumb_rx
    }

    pub fn right_thumb_y(&self) -> u8 {
        self.thumb_ry
    }

    pub fn left_trigger(&self) -> u8 {
        self.trigger_l
    }

    pub fn right_trigger(&self) -> u8 {
        self.trigger_r
    }

    /// Encodes the report in wire order.
    ///
    /// # Examples
    ///
    /// ```
    /// use dualsense_bus::report::input::InputReport;
    ///
    /// let bytes = InputReport::RESTING.encode();
    /// assert_eq!(&bytes[..], &[0x08, 0x00, 0x00, 0x80, 0x80, 0x80, 0x80, 0x00, 0x00]);
    /// ```
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(INPUT_REPORT_SIZE);
        buf.put_u16_le(self.buttons);
        buf.put_u8(self.special);
        buf.put_u8(self.thumb_lx);
        buf.put_u8(self.thumb_ly);
        buf.put_u8(self.thumb_rx);
        buf.put_u8(self.thumb_ry);
        buf.put_u8(self.trigger_l);
        buf.put_u8(self.trigger_r);
        buf.freeze()
    }

    /// Decodes a frame produced by [`InputReport::encode`]. Bytes past
    /// [`INPUT_REPORT_SIZE`] are ignored; shorter frames yield `None`.
    pub fn decode(mut frame: &[u8]) -> Option<Self> {
        if frame.len() < INPUT_REPORT_SIZE {
            return None;
        }
        Some(Self {
            buttons: frame.get_u16_le(),
            special: frame.get_u8(),
            thumb_lx: frame.get_u8(),
            thumb_ly: frame.get_u8(),
            thumb_rx: frame.get_u8(),
            thumb_ry: frame.get_u8(),
            trigger_l: frame.get_u8(),
            trigger_r: frame.get_u8(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::catalog::{Button, SpecialButton};

    const RESTING_BYTES: [u8; INPUT_REPORT_SIZE] =
        [0x08, 0x00, 0x00, 0x80, 0x80, 0x80, 0x80, 0x00, 0x00];

    fn scrambled() -> InputReport {
        let mut report = InputReport::RESTING;
        report.set_buttons_full(0xBEEF);
        report.set_special_buttons_full(0xFF);
        for axis in Axis::ALL {
            report.set_axis(axis, 0x11);
        }
        for slider in Slider::ALL {
            report.set_slider(slider, 0xEE);
        }
        report
    }

    #[test]
    fn test_resting_encoding() {
        assert_eq!(&InputReport::RESTING.encode()[..], &RESTING_BYTES);
        assert_eq!(InputReport::default(), InputReport::RESTING);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut report = scrambled();
        report.reset();
        assert_eq!(&report.encode()[..], &RESTING_BYTES);
        report.reset();
        assert_eq!(&report.encode()[..], &RESTING_BYTES);
    }

    #[test]
    fn test_press_release_restores_masks() {
        let base = scrambled();
        for button in AnyButton::ALL {
            for start in [InputReport::RESTING, base] {
                let mut report = start;
                report.set_button(button, true);
                assert!(report.is_pressed(button));
                report.set_button(button, false);
                assert!(!report.is_pressed(button));

                let mut expected = start;
                expected.set_button(button, false);
                assert_eq!(report, expected, "{} did not restore", button.name());
            }
        }
    }

    #[test]
    fn test_press_release_from_unpressed_is_bit_exact() {
        for button in AnyButton::ALL {
            let mut report = InputReport::RESTING;
            report.set_button(button, true);
            report.set_button(button, false);
            assert_eq!(report, InputReport::RESTING);
        }
    }

    #[test]
    fn test_button_never_touches_dpad() {
        let mut report = InputReport::RESTING;
        report.set_dpad(DPadDirection::Southwest);
        for button in Button::ALL {
            report.set_button(button, true);
        }
        assert_eq!(report.dpad(), DPadDirection::Southwest);
        assert_eq!(report.buttons(), 0xFFF5);
    }

    #[test]
    fn test_special_button_uses_special_mask() {
        let mut report = InputReport::RESTING;
        report.set_button(SpecialButton::Touchpad, true);
        assert_eq!(report.special_buttons(), 0x02);
        assert_eq!(report.buttons(), 0x0008);
    }

    #[test]
    fn test_dpad_mutual_exclusion() {
        let mut report = scrambled();
        let upper = report.buttons() & !DPAD_MASK;
        for direction in DPadDirection::ALL {
            report.set_dpad(direction);
            assert_eq!(report.buttons() & DPAD_MASK, u16::from(direction.code()));
            assert_eq!(report.buttons() & !DPAD_MASK, upper);
            assert_eq!(report.dpad(), direction);
        }
    }

    #[test]
    fn test_axes_and_sliders_are_positional() {
        let mut report = InputReport::RESTING;
        report.set_axis(Axis::LeftThumbX, 1);
        report.set_axis(Axis::LeftThumbY, 2);
        report.set_axis(Axis::RightThumbX, 3);
        report.set_axis(Axis::RightThumbY, 4);
        report.set_slider(Slider::LeftTrigger, 5);
        report.set_slider(Slider::RightTrigger, 6);

        assert_eq!(&report.encode()[3..], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(report.left_thumb_x(), 1);
        assert_eq!(report.right_thumb_y(), 4);
        assert_eq!(report.left_trigger(), 5);
        assert_eq!(report.right_trigger(), 6);
        assert_eq!(report.axis(Axis::RightThumbX), 3);
        assert_eq!(report.slider(Slider::RightTrigger), 6);
    }

    #[test]
    fn test_buttons_encode_little_endian() {
        let mut report = InputReport::RESTING;
        report.set_buttons_full(0x1234);
        report.set_special_buttons_full(0x05);
        let bytes = report.encode();
        assert_eq!(bytes[0], 0x34);
        assert_eq!(bytes[1], 0x12);
        assert_eq!(bytes[2], 0x05);
    }

    #[test]
    fn test_decode_reads_wire_order() {
        let frame = [0x34, 0x12, 0x05, 1, 2, 3, 4, 5, 6];
        let report = InputReport::decode(&frame).unwrap();
        assert_eq!(report.buttons(), 0x1234);
        assert_eq!(report.special_buttons(), 0x05);
        assert_eq!(report.right_thumb_x(), 3);
        assert_eq!(report.right_trigger(), 6);
        assert_eq!(InputReport::decode(&scrambled().encode()), Some(scrambled()));
    }

    #[test]
    fn test_decode_short_frame() {
        assert_eq!(InputReport::decode(&RESTING_BYTES[..8]), None);
    }

    #[test]
    fn test_unknown_dpad_code_reads_as_none() {
        let mut report = InputReport::RESTING;
        report.set_buttons_full(0x000F);
        assert_eq!(report.dpad(), DPadDirection::None);
    }
}
