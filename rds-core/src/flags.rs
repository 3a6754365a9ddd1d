//! Flag words carried by input messages.
//!
//! Payloads keep the raw integers; handlers convert with
//! `from_bits_truncate` so unknown bits from newer clients are ignored.

use bitflags::bitflags;

bitflags! {
    /// Flags of a standard mouse event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PointerFlags: u16 {
        /// Wheel delta is negative (down / left).
        const WHEEL_NEGATIVE = 0x0100;
        const WHEEL          = 0x0200;
        const HWHEEL         = 0x0400;
        const MOVE           = 0x0800;
        const BUTTON1        = 0x1000;
        const BUTTON2        = 0x2000;
        const BUTTON3        = 0x4000;
        const DOWN           = 0x8000;
    }
}

bitflags! {
    /// Flags of an extended mouse event (side buttons).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExtendedPointerFlags: u16 {
        const BUTTON1 = 0x0001;
        const BUTTON2 = 0x0002;
        /// Shares its value with [`PointerFlags::MOVE`].
        const MOVE    = 0x0800;
        const DOWN    = 0x8000;
    }
}

bitflags! {
    /// Flags of a scancode, virtual-key or unicode keyboard event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyboardFlags: u16 {
        /// `E0` prefixed scancode.
        const EXTENDED  = 0x0100;
        /// `E1` prefixed scancode (Pause).
        const EXTENDED1 = 0x0200;
        const DOWN      = 0x4000;
        const RELEASE   = 0x8000;
    }
}

bitflags! {
    /// Remote lock-key state sent with a keyboard sync.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SyncFlags: u32 {
        const SCROLL_LOCK = 0x01;
        const NUM_LOCK    = 0x02;
        const CAPS_LOCK   = 0x04;
        const KANA_LOCK   = 0x08;
    }
}

bitflags! {
    /// Per-contact flags of a touch frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ContactFlags: u32 {
        const DOWN       = 0x01;
        const UPDATE     = 0x02;
        const UP         = 0x04;
        const IN_RANGE   = 0x08;
        const IN_CONTACT = 0x10;
        const CANCELED   = 0x20;
    }
}

impl KeyboardFlags {
    /// Press when the down bit is set, release otherwise.
    pub fn is_press(self) -> bool {
        self.contains(Self::DOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_bits_are_dropped() {
        let f = PointerFlags::from_bits_truncate(0x8801 | 0x1000);
        assert!(f.contains(PointerFlags::DOWN | PointerFlags::MOVE | PointerFlags::BUTTON1));
        assert_eq!(f.bits() & 0x0001, 0);
    }

    #[test]
    fn keyboard_press_release() {
        assert!((KeyboardFlags::DOWN | KeyboardFlags::EXTENDED).is_press());
        assert!(!KeyboardFlags::empty().is_press());
        assert!(!KeyboardFlags::RELEASE.is_press());
    }
}
