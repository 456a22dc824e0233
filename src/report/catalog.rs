//! # Control Catalog
//!
//! Closed sets of addressable DualSense controls and their wire mapping.
//!
//! | Family | Count | Wire value |
//! |--------|-------|------------|
//! | [`Button`] | 12 | bit in the 16-bit buttons mask (bits 4-15) |
//! | [`SpecialButton`] | 3 | bit in the 8-bit special mask |
//! | [`DPadDirection`] | 9 | 4-bit code in the low nibble of the buttons mask |
//! | [`Axis`] | 4 | positional (report field) |
//! | [`Slider`] | 2 | positional (report field) |
//!
//! Within a family ids are contiguous from 0 and `ALL` lists the controls in
//! ascending id order, so index `i` of a family always resolves to the
//! control with id `i`.

use std::fmt;

/// Family a [`Control`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlFamily {
    Button,
    SpecialButton,
    DPadDirection,
    Axis,
    Slider,
}

impl ControlFamily {
    /// Human-readable family name, used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::SpecialButton => "special button",
            Self::DPadDirection => "d-pad direction",
            Self::Axis => "axis",
            Self::Slider => "slider",
        }
    }
}

/// Digital buttons carried in the 16-bit buttons mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Button {
    ThumbRight,
    ThumbLeft,
    Options,
    Create,
    TriggerRight,
    TriggerLeft,
    ShoulderRight,
    ShoulderLeft,
    Triangle,
    Circle,
    Cross,
    Square,
}

impl Button {
    /// All buttons in id order.
    pub const ALL: [Button; 12] = [
        Button::ThumbRight,
        Button::ThumbLeft,
        Button::Options,
        Button::Create,
        Button::TriggerRight,
        Button::TriggerLeft,
        Button::ShoulderRight,
        Button::ShoulderLeft,
        Button::Triangle,
        Button::Circle,
        Button::Cross,
        Button::Square,
    ];

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::ThumbRight => "ThumbRight",
            Self::ThumbLeft => "ThumbLeft",
            Self::Options => "Options",
            Self::Create => "Create",
            Self::TriggerRight => "TriggerRight",
            Self::TriggerLeft => "TriggerLeft",
            Self::ShoulderRight => "ShoulderRight",
            Self::ShoulderLeft => "ShoulderLeft",
            Self::Triangle => "Triangle",
            Self::Circle => "Circle",
            Self::Cross => "Cross",
            Self::Square => "Square",
        }
    }

    /// Bit of this button in the buttons mask. Never touches the d-pad nibble.
    pub const fn mask(self) -> u16 {
        match self {
            Self::ThumbRight => 1 << 15,
            Self::ThumbLeft => 1 << 14,
            Self::Options => 1 << 13,
            Self::Create => 1 << 12,
            Self::TriggerRight => 1 << 11,
            Self::TriggerLeft => 1 << 10,
            Self::ShoulderRight => 1 << 9,
            Self::ShoulderLeft => 1 << 8,
            Self::Triangle => 1 << 7,
            Self::Circle => 1 << 6,
            Self::Cross => 1 << 5,
            Self::Square => 1 << 4,
        }
    }
}

/// Buttons carried in the separate 8-bit special mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpecialButton {
    Ps,
    Touchpad,
    Mute,
}

impl SpecialButton {
    /// All special buttons in id order.
    pub const ALL: [SpecialButton; 3] =
        [SpecialButton::Ps, SpecialButton::Touchpad, SpecialButton::Mute];

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Ps => "PS",
            Self::Touchpad => "Touchpad",
            Self::Mute => "Mute",
        }
    }

    /// Bit of this button in the special mask.
    pub const fn mask(self) -> u8 {
        1 << self.id()
    }
}

/// Either kind of digital button.
///
/// [`AnyButton::ALL`] is the dense index table used by the index-based
/// accessors: the 12 standard buttons first, then PS, Touchpad and Mute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnyButton {
    Standard(Button),
    Special(SpecialButton),
}

impl AnyButton {
    pub const ALL: [AnyButton; 15] = [
        AnyButton::Standard(Button::ThumbRight),
        AnyButton::Standard(Button::ThumbLeft),
        AnyButton::Standard(Button::Options),
        AnyButton::Standard(Button::Create),
        AnyButton::Standard(Button::TriggerRight),
        AnyButton::Standard(Button::TriggerLeft),
        AnyButton::Standard(Button::ShoulderRight),
        AnyButton::Standard(Button::ShoulderLeft),
        AnyButton::Standard(Button::Triangle),
        AnyButton::Standard(Button::Circle),
        AnyButton::Standard(Button::Cross),
        AnyButton::Standard(Button::Square),
        AnyButton::Special(SpecialButton::Ps),
        AnyButton::Special(SpecialButton::Touchpad),
        AnyButton::Special(SpecialButton::Mute),
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Standard(button) => button.name(),
            Self::Special(button) => button.name(),
        }
    }
}

impl From<Button> for AnyButton {
    fn from(button: Button) -> Self {
        Self::Standard(button)
    }
}

impl From<SpecialButton> for AnyButton {
    fn from(button: SpecialButton) -> Self {
        Self::Special(button)
    }
}

/// Hat switch states. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum DPadDirection {
    #[default]
    None,
    Northwest,
    West,
    Southwest,
    South,
    Southeast,
    East,
    Northeast,
    North,
}

impl DPadDirection {
    /// All directions in id order.
    pub const ALL: [DPadDirection; 9] = [
        DPadDirection::None,
        DPadDirection::Northwest,
        DPadDirection::West,
        DPadDirection::Southwest,
        DPadDirection::South,
        DPadDirection::Southeast,
        DPadDirection::East,
        DPadDirection::Northeast,
        DPadDirection::North,
    ];

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Northwest => "Northwest",
            Self::West => "West",
            Self::Southwest => "Southwest",
            Self::South => "South",
            Self::Southeast => "Southeast",
            Self::East => "East",
            Self::Northeast => "Northeast",
            Self::North => "North",
        }
    }

    /// 4-bit hat code written to the low nibble of the buttons mask.
    pub const fn code(self) -> u8 {
        match self {
            Self::North => 0x0,
            Self::Northeast => 0x1,
            Self::East => 0x2,
            Self::Southeast => 0x3,
            Self::South => 0x4,
            Self::Southwest => 0x5,
            Self::West => 0x6,
            Self::Northwest => 0x7,
            Self::None => 0x8,
        }
    }

    /// Decodes a hat code. Codes 0x9-0xF are not produced by this crate.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|direction| direction.code() == code)
    }
}

/// Analog thumbstick axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    LeftThumbX,
    LeftThumbY,
    RightThumbX,
    RightThumbY,
}

impl Axis {
    pub const ALL: [Axis; 4] = [
        Axis::LeftThumbX,
        Axis::LeftThumbY,
        Axis::RightThumbX,
        Axis::RightThumbY,
    ];

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::LeftThumbX => "LeftThumbX",
            Self::LeftThumbY => "LeftThumbY",
            Self::RightThumbX => "RightThumbX",
            Self::RightThumbY => "RightThumbY",
        }
    }
}

/// Analog triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slider {
    LeftTrigger,
    RightTrigger,
}

impl Slider {
    pub const ALL: [Slider; 2] = [Slider::LeftTrigger, Slider::RightTrigger];

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::LeftTrigger => "LeftTrigger",
            Self::RightTrigger => "RightTrigger",
        }
    }
}

/// Any addressable control, tagged by family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Button(Button),
    SpecialButton(SpecialButton),
    DPadDirection(DPadDirection),
    Axis(Axis),
    Slider(Slider),
}

impl Control {
    /// Every control of `family`, in ascending id order.
    ///
    /// # Examples
    ///
    /// ```
    /// use dualsense_bus::report::catalog::{Axis, Control, ControlFamily};
    ///
    /// let axes = Control::all_of(ControlFamily::Axis);
    /// assert_eq!(axes.len(), 4);
    /// assert_eq!(axes[0], Control::Axis(Axis::LeftThumbX));
    /// ```
    pub fn all_of(family: ControlFamily) -> Vec<Control> {
        match family {
            ControlFamily::Button => Button::ALL.into_iter().map(Control::Button).collect(),
            ControlFamily::SpecialButton => SpecialButton::ALL
                .into_iter()
                .map(Control::SpecialButton)
                .collect(),
            ControlFamily::DPadDirection => DPadDirection::ALL
                .into_iter()
                .map(Control::DPadDirection)
                .collect(),
            ControlFamily::Axis => Axis::ALL.into_iter().map(Control::Axis).collect(),
            ControlFamily::Slider => Slider::ALL.into_iter().map(Control::Slider).collect(),
        }
    }

    pub const fn family(self) -> ControlFamily {
        match self {
            Self::Button(_) => ControlFamily::Button,
            Self::SpecialButton(_) => ControlFamily::SpecialButton,
            Self::DPadDirection(_) => ControlFamily::DPadDirection,
            Self::Axis(_) => ControlFamily::Axis,
            Self::Slider(_) => ControlFamily::Slider,
        }
    }

    pub const fn id(self) -> u8 {
        match self {
            Self::Button(c) => c.id(),
            Self::SpecialButton(c) => c.id(),
            Self::DPadDirection(c) => c.id(),
            Self::Axis(c) => c.id(),
            Self::Slider(c) => c.id(),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Button(c) => c.name(),
            Self::SpecialButton(c) => c.name(),
            Self::DPadDirection(c) => c.name(),
            Self::Axis(c) => c.name(),
            Self::Slider(c) => c.name(),
        }
    }

    /// Fixed wire value, if the family has one. Axes and sliders are
    /// positional and return `None`.
    pub const fn wire_value(self) -> Option<u16> {
        match self {
            Self::Button(c) => Some(c.mask()),
            Self::SpecialButton(c) => Some(c.mask() as u16),
            Self::DPadDirection(c) => Some(c.code() as u16),
            Self::Axis(_) | Self::Slider(_) => None,
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAMILIES: [ControlFamily; 5] = [
        ControlFamily::Button,
        ControlFamily::SpecialButton,
        ControlFamily::DPadDirection,
        ControlFamily::Axis,
        ControlFamily::Slider,
    ];

    #[test]
    fn test_ids_are_contiguous_per_family() {
        for family in FAMILIES {
            let controls = Control::all_of(family);
            for (index, control) in controls.iter().enumerate() {
                assert_eq!(control.id() as usize, index, "{} out of order", control);
                assert_eq!(control.family(), family);
            }
        }
    }

    #[test]
    fn test_family_sizes() {
        assert_eq!(Control::all_of(ControlFamily::Button).len(), 12);
        assert_eq!(Control::all_of(ControlFamily::SpecialButton).len(), 3);
        assert_eq!(Control::all_of(ControlFamily::DPadDirection).len(), 9);
        assert_eq!(Control::all_of(ControlFamily::Axis).len(), 4);
        assert_eq!(Control::all_of(ControlFamily::Slider).len(), 2);
    }

    #[test]
    fn test_button_masks_unique_and_clear_of_dpad_nibble() {
        let mut seen = 0u16;
        for button in Button::ALL {
            let mask = button.mask();
            assert_eq!(mask.count_ones(), 1, "{:?} must be a single bit", button);
            assert_eq!(mask & 0x000F, 0, "{:?} overlaps the d-pad nibble", button);
            assert_eq!(seen & mask, 0, "{:?} overlaps another button", button);
            seen |= mask;
        }
        assert_eq!(seen, 0xFFF0);
    }

    #[test]
    fn test_special_masks_unique() {
        let mut seen = 0u8;
        for button in SpecialButton::ALL {
            assert_eq!(seen & button.mask(), 0);
            seen |= button.mask();
        }
        assert_eq!(seen, 0b0000_0111);
    }

    #[test]
    fn test_dpad_codes_cover_nine_states() {
        let mut codes: Vec<u8> = DPadDirection::ALL.iter().map(|d| d.code()).collect();
        codes.sort_unstable();
        assert_eq!(codes, (0u8..=8).collect::<Vec<_>>());
        assert_eq!(DPadDirection::default().code(), 0x8);
    }

    #[test]
    fn test_dpad_from_code() {
        for direction in DPadDirection::ALL {
            assert_eq!(DPadDirection::from_code(direction.code()), Some(direction));
        }
        assert_eq!(DPadDirection::from_code(0x9), None);
        assert_eq!(DPadDirection::from_code(0xF), None);
    }

    #[test]
    fn test_any_button_index_table() {
        assert_eq!(AnyButton::ALL.len(), 15);
        for (index, button) in Button::ALL.iter().enumerate() {
            assert_eq!(AnyButton::ALL[index], AnyButton::Standard(*button));
        }
        assert_eq!(AnyButton::ALL[12], AnyButton::Special(SpecialButton::Ps));
        assert_eq!(AnyButton::ALL[14], AnyButton::Special(SpecialButton::Mute));
    }

    #[test]
    fn test_wire_values() {
        assert_eq!(Control::Button(Button::Square).wire_value(), Some(0x0010));
        assert_eq!(Control::Button(Button::ThumbRight).wire_value(), Some(0x8000));
        assert_eq!(Control::SpecialButton(SpecialButton::Mute).wire_value(), Some(0x04));
        assert_eq!(Control::DPadDirection(DPadDirection::None).wire_value(), Some(0x8));
        assert_eq!(Control::Axis(Axis::LeftThumbX).wire_value(), None);
        assert_eq!(Control::Slider(Slider::RightTrigger).wire_value(), None);
    }

    #[test]
    fn test_display_uses_name() {
        assert_eq!(Control::SpecialButton(SpecialButton::Ps).to_string(), "PS");
        assert_eq!(Control::Axis(Axis::RightThumbY).to_string(), "RightThumbY");
    }
}
