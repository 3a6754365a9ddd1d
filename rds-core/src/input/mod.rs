//! Remote input normalization.
//!
//! [`InputNormalizer`] bundles the stateful keyboard, pointer and touch
//! translators of one session. Each remote event is turned into zero or
//! more [`InputEvent`]s delivered to an [`InputHost`].

pub mod host;
pub mod keyboard;
pub mod keymap;
pub mod pointer;
pub mod touch;

pub use host::{HeadlessInput, InputEvent, InputHost, TouchPhase};
pub use keyboard::KeyboardState;
pub use pointer::{ButtonMaskState, PointerState};
pub use touch::{TouchContact, TouchContactTable, TouchState};

use tracing::debug;

use crate::flags::{ExtendedPointerFlags, KeyboardFlags, PointerFlags, SyncFlags};

/// Input options fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputOptions {
    /// Rewrite keypad arrows to cursor keys.
    pub keypad_remap: bool,
    /// Switch host autorepeat off around injected keys.
    pub suppress_autorepeat: bool,
    /// Start the touch subsystem when a client connects.
    pub touch: bool,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            keypad_remap: false,
            suppress_autorepeat: true,
            touch: true,
        }
    }
}

// ── InputNormalizer ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct InputNormalizer {
    options: InputOptions,
    keyboard: KeyboardState,
    pointer: PointerState,
    touch: TouchState,
}

impl InputNormalizer {
    pub fn new(options: InputOptions) -> Self {
        Self {
            options,
            keyboard: KeyboardState::new(options.keypad_remap, options.suppress_autorepeat),
            pointer: PointerState::new(),
            touch: TouchState::new(),
        }
    }

    pub fn options(&self) -> InputOptions {
        self.options
    }

    pub fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn touch(&self) -> &TouchState {
        &self.touch
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// A client connected.
    pub fn connect(&mut self) {
        if self.options.touch {
            self.touch.start();
        }
    }

    /// The client went away: release held keys, stop touch, forget
    /// pointer buttons.
    pub fn disconnect(&mut self, host: &mut dyn InputHost) {
        self.keyboard.release_all(host);
        self.touch.stop();
        self.pointer.reset();
        debug!("input state reset");
    }

    // ── Events ───────────────────────────────────────────────────

    pub fn scancode(
        &mut self,
        flags: u16,
        scancode: u32,
        keyboard_type: u32,
        host: &mut dyn InputHost,
    ) {
        self.keyboard.scancode_event(
            KeyboardFlags::from_bits_truncate(flags),
            scancode,
            keyboard_type,
            host,
        );
    }

    pub fn virtual_key(&mut self, flags: u16, vk: u32, host: &mut dyn InputHost) {
        self.keyboard
            .virtual_key_event(KeyboardFlags::from_bits_truncate(flags), vk, host);
    }

    pub fn unicode(&mut self, flags: u16, code: u32, host: &mut dyn InputHost) {
        self.keyboard
            .unicode_event(KeyboardFlags::from_bits_truncate(flags), code, host);
    }

    pub fn keyboard_sync(&mut self, flags: u32, host: &mut dyn InputHost) {
        self.keyboard
            .sync(SyncFlags::from_bits_truncate(flags), host);
    }

    pub fn mouse(
        &mut self,
        flags: u16,
        x: u32,
        y: u32,
        bounds: (u32, u32),
        host: &mut dyn InputHost,
    ) {
        self.pointer.mouse_event(
            PointerFlags::from_bits_truncate(flags),
            x,
            y,
            bounds.0,
            bounds.1,
            host,
        );
    }

    pub fn extended_mouse(
        &mut self,
        flags: u16,
        x: u32,
        y: u32,
        bounds: (u32, u32),
        host: &mut dyn InputHost,
    ) {
        self.pointer.extended_mouse_event(
            ExtendedPointerFlags::from_bits_truncate(flags),
            x,
            y,
            bounds.0,
            bounds.1,
            host,
        );
    }

    pub fn touch_frame(&mut self, contacts: &[TouchContact], host: &mut dyn InputHost) {
        self.touch.frame(contacts, host);
    }

    pub fn touch_released(&mut self, contact_id: u32, host: &mut dyn InputHost) {
        self.touch.released(contact_id, host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::ContactFlags;

    #[test]
    fn disconnect_resets_everything() {
        let mut host = HeadlessInput::new();
        let mut input = InputNormalizer::new(InputOptions::default());
        input.connect();
        assert!(input.touch().is_running());

        input.scancode(KeyboardFlags::DOWN.bits(), 0x1E, 4, &mut host);
        input.mouse(
            (PointerFlags::BUTTON1 | PointerFlags::DOWN).bits(),
            5,
            5,
            (100, 100),
            &mut host,
        );
        input.touch_frame(
            &[TouchContact::new(1, 1, 1, ContactFlags::DOWN)],
            &mut host,
        );
        host.take_events();

        input.disconnect(&mut host);
        assert_eq!(
            host.events(),
            &[InputEvent::Key {
                keycode: 38,
                pressed: false,
                repeat: false
            }]
        );
        assert_eq!(input.pointer().buttons().mask(), 0);
        assert!(input.pointer().last_motion().is_none());
        assert!(!input.touch().is_running());
        assert_eq!(input.touch().table().live_count(), 0);
    }

    #[test]
    fn touch_disabled_by_option() {
        let mut input = InputNormalizer::new(InputOptions {
            touch: false,
            ..InputOptions::default()
        });
        input.connect();
        assert!(!input.touch().is_running());
    }
}
