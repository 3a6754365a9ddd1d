//! Pointer normalization: clamping, motion suppression and button-mask
//! diffing.

use tracing::trace;

use super::host::{InputEvent, InputHost};
use crate::flags::{ExtendedPointerFlags, PointerFlags};

/// Number of button bits tracked in the mask.
pub const BUTTON_COUNT: u8 = 10;

// ── Button bits ──────────────────────────────────────────────────

pub const BUTTON_LEFT: u16 = 1 << 0;
pub const BUTTON_MIDDLE: u16 = 1 << 1;
pub const BUTTON_RIGHT: u16 = 1 << 2;
pub const WHEEL_UP: u16 = 1 << 3;
pub const WHEEL_DOWN: u16 = 1 << 4;
pub const HWHEEL_LEFT: u16 = 1 << 5;
pub const HWHEEL_RIGHT: u16 = 1 << 6;
pub const XBUTTON1: u16 = 1 << 7;
pub const XBUTTON2: u16 = 1 << 8;

// ── ButtonMaskState ──────────────────────────────────────────────

/// Pressed-button mask; bit `i` is button `i + 1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonMaskState {
    mask: u16,
}

impl ButtonMaskState {
    pub fn mask(&self) -> u16 {
        self.mask
    }

    /// Move to `mask`, injecting one press or release per toggled bit in
    /// ascending bit order.
    pub fn apply(&mut self, mask: u16, host: &mut dyn InputHost) {
        let changed = self.mask ^ mask;
        for bit in 0..BUTTON_COUNT {
            if changed & (1 << bit) != 0 {
                host.inject(InputEvent::Button {
                    button: bit + 1,
                    pressed: mask & (1 << bit) != 0,
                });
            }
        }
        self.mask = mask;
    }

    /// Press then release `bits` (wheel clicks).
    fn click(&mut self, bits: u16, host: &mut dyn InputHost) {
        self.apply(self.mask | bits, host);
        self.apply(self.mask & !bits, host);
    }

    fn set(&mut self, bits: u16, down: bool, host: &mut dyn InputHost) {
        let mask = if down { self.mask | bits } else { self.mask & !bits };
        self.apply(mask, host);
    }

    /// Forget every pressed button without emitting releases.
    pub fn clear(&mut self) {
        self.mask = 0;
    }
}

// ── PointerState ─────────────────────────────────────────────────

/// Per-session pointer translator.
#[derive(Debug, Clone, Default)]
pub struct PointerState {
    buttons: ButtonMaskState,
    last_motion: Option<(u32, u32)>,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buttons(&self) -> ButtonMaskState {
        self.buttons
    }

    pub fn last_motion(&self) -> Option<(u32, u32)> {
        self.last_motion
    }

    /// Clamp to `[0, width-2] × [0, height-2]`.
    fn clamp(x: u32, y: u32, width: u32, height: u32) -> (u32, u32) {
        (
            x.min(width.saturating_sub(2)),
            y.min(height.saturating_sub(2)),
        )
    }

    fn motion(&mut self, x: u32, y: u32, host: &mut dyn InputHost) {
        if self.last_motion != Some((x, y)) {
            host.inject(InputEvent::Motion { x, y });
        }
        self.last_motion = Some((x, y));
    }

    /// Handle a standard mouse event on a `width × height` frame.
    ///
    /// Wheel events win over button events when both are flagged, then
    /// button 1, 2 and 3 in that order; only one of them applies.
    pub fn mouse_event(
        &mut self,
        flags: PointerFlags,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        host: &mut dyn InputHost,
    ) {
        let (x, y) = Self::clamp(x, y, width, height);
        trace!(?flags, x, y, "mouse event");

        if flags.intersects(PointerFlags::MOVE | PointerFlags::DOWN) {
            self.motion(x, y, host);
        }

        let down = flags.contains(PointerFlags::DOWN);
        let negative = flags.contains(PointerFlags::WHEEL_NEGATIVE);

        if flags.contains(PointerFlags::WHEEL) {
            self.buttons
                .click(if negative { WHEEL_DOWN } else { WHEEL_UP }, host);
        } else if flags.contains(PointerFlags::HWHEEL) {
            self.buttons
                .click(if negative { HWHEEL_LEFT } else { HWHEEL_RIGHT }, host);
        } else if flags.contains(PointerFlags::BUTTON1) {
            self.buttons.set(BUTTON_LEFT, down, host);
        } else if flags.contains(PointerFlags::BUTTON2) {
            self.buttons.set(BUTTON_RIGHT, down, host);
        } else if flags.contains(PointerFlags::BUTTON3) {
            self.buttons.set(BUTTON_MIDDLE, down, host);
        }
    }

    /// Handle an extended mouse event (side buttons).
    pub fn extended_mouse_event(
        &mut self,
        flags: ExtendedPointerFlags,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        host: &mut dyn InputHost,
    ) {
        let (x, y) = Self::clamp(x, y, width, height);

        if flags.intersects(ExtendedPointerFlags::MOVE | ExtendedPointerFlags::DOWN) {
            self.motion(x, y, host);
        }

        let down = flags.contains(ExtendedPointerFlags::DOWN);
        if flags.contains(ExtendedPointerFlags::BUTTON1) {
            self.buttons.set(XBUTTON1, down, host);
        } else if flags.contains(ExtendedPointerFlags::BUTTON2) {
            self.buttons.set(XBUTTON2, down, host);
        }
    }

    /// Forget buttons and the last position at disconnect.
    pub fn reset(&mut self) {
        self.buttons.clear();
        self.last_motion = None;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::host::HeadlessInput;

    fn press(button: u8) -> InputEvent {
        InputEvent::Button {
            button,
            pressed: true,
        }
    }

    fn release(button: u8) -> InputEvent {
        InputEvent::Button {
            button,
            pressed: false,
        }
    }

    #[test]
    fn mask_diff_one_event_per_bit() {
        let mut host = HeadlessInput::new();
        let mut state = ButtonMaskState::default();
        for mask in [0, 0b0001, 0b0101, 0b0100] {
            state.apply(mask, &mut host);
        }
        assert_eq!(host.events(), &[press(1), press(3), release(1)]);
    }

    #[test]
    fn ascending_order_on_ties() {
        let mut host = HeadlessInput::new();
        let mut state = ButtonMaskState::default();
        state.apply(0b1010, &mut host);
        state.apply(0b0101, &mut host);
        assert_eq!(
            host.events(),
            &[press(2), press(4), press(1), release(2), press(3), release(4)]
        );
    }

    #[test]
    fn clamps_and_suppresses_duplicate_motion() {
        let mut host = HeadlessInput::new();
        let mut p = PointerState::new();
        p.mouse_event(PointerFlags::MOVE, 5000, 5000, 800, 600, &mut host);
        p.mouse_event(PointerFlags::MOVE, 900, 700, 800, 600, &mut host);
        p.mouse_event(PointerFlags::MOVE, 10, 10, 800, 600, &mut host);
        assert_eq!(
            host.events(),
            &[
                InputEvent::Motion { x: 798, y: 598 },
                InputEvent::Motion { x: 10, y: 10 },
            ]
        );
    }

    #[test]
    fn first_motion_to_origin_is_emitted() {
        let mut host = HeadlessInput::new();
        let mut p = PointerState::new();
        p.mouse_event(PointerFlags::MOVE, 0, 0, 100, 100, &mut host);
        assert_eq!(host.events(), &[InputEvent::Motion { x: 0, y: 0 }]);
    }

    #[test]
    fn buttons_map_to_x_numbers() {
        let mut host = HeadlessInput::new();
        let mut p = PointerState::new();
        let down = PointerFlags::DOWN;
        p.mouse_event(PointerFlags::BUTTON2 | down, 1, 1, 100, 100, &mut host);
        p.mouse_event(PointerFlags::BUTTON3 | down, 1, 1, 100, 100, &mut host);
        p.mouse_event(PointerFlags::BUTTON2, 1, 1, 100, 100, &mut host);
        let events = host.take_events();
        assert_eq!(
            events,
            &[
                InputEvent::Motion { x: 1, y: 1 },
                press(3),
                press(2),
                release(3)
            ]
        );
        assert_eq!(p.buttons().mask(), BUTTON_MIDDLE);
    }

    #[test]
    fn wheel_is_a_click_pair() {
        let mut host = HeadlessInput::new();
        let mut p = PointerState::new();
        p.mouse_event(PointerFlags::WHEEL, 0, 0, 100, 100, &mut host);
        p.mouse_event(
            PointerFlags::WHEEL | PointerFlags::WHEEL_NEGATIVE,
            0,
            0,
            100,
            100,
            &mut host,
        );
        p.mouse_event(PointerFlags::HWHEEL, 0, 0, 100, 100, &mut host);
        assert_eq!(
            host.events(),
            &[
                press(4),
                release(4),
                press(5),
                release(5),
                press(7),
                release(7)
            ]
        );
        assert_eq!(p.buttons().mask(), 0);
    }

    #[test]
    fn extended_buttons() {
        let mut host = HeadlessInput::new();
        let mut p = PointerState::new();
        p.extended_mouse_event(
            ExtendedPointerFlags::BUTTON2 | ExtendedPointerFlags::DOWN,
            3,
            4,
            100,
            100,
            &mut host,
        );
        p.extended_mouse_event(ExtendedPointerFlags::BUTTON2, 3, 4, 100, 100, &mut host);
        assert_eq!(
            host.events(),
            &[InputEvent::Motion { x: 3, y: 4 }, press(9), release(9)]
        );
    }
}
