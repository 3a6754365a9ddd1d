//! Input host of the software display.
//!
//! Injected events are traced and dropped. Only the state the normalizer
//! queries back is kept: lock modifiers, the autorepeat control and the
//! keysym bound to each keycode.

use tracing::trace;

use rds_core::input::host::{lock_toggle, software_virtual_modifier};
use rds_core::{InputEvent, InputHost};

#[derive(Debug)]
pub struct SoftwareInput {
    modifiers: u32,
    autorepeat: bool,
    keysyms: [u32; 256],
    injected: u64,
}

impl SoftwareInput {
    pub fn new() -> Self {
        Self {
            modifiers: 0,
            autorepeat: true,
            keysyms: [0; 256],
            injected: 0,
        }
    }

    /// Events injected since start.
    pub fn injected(&self) -> u64 {
        self.injected
    }

    /// Keysym currently bound to `keycode`; 0 when unbound.
    pub fn keysym(&self, keycode: u8) -> u32 {
        self.keysyms[usize::from(keycode)]
    }
}

impl Default for SoftwareInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHost for SoftwareInput {
    fn inject(&mut self, event: InputEvent) {
        trace!(%event, "inject");
        if let InputEvent::Key {
            keycode,
            pressed: true,
            ..
        } = event
        {
            self.modifiers ^= lock_toggle(keycode);
        }
        self.injected += 1;
    }

    fn modifier_state(&self) -> u32 {
        self.modifiers
    }

    fn virtual_modifier(&self, name: &str) -> Option<u32> {
        software_virtual_modifier(name)
    }

    fn autorepeat(&self) -> bool {
        self.autorepeat
    }

    fn set_autorepeat(&mut self, enabled: bool) {
        self.autorepeat = enabled;
    }

    fn remap_keysym(&mut self, keycode: u8, keysym: u32) {
        self.keysyms[usize::from(keycode)] = keysym;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rds_core::input::host::LOCK_MASK;
    use rds_core::input::keymap::{CAPS_LOCK_KEYCODE, UNICODE_KEYCODE};
    use rds_core::{InputNormalizer, InputOptions};

    #[test]
    fn moves_are_counted_not_stored() {
        let mut host = SoftwareInput::new();
        let mut input = InputNormalizer::new(InputOptions::default());
        for i in 0..10_000u32 {
            input.mouse(0x0800, i % 600, i / 600, (640, 480), &mut host);
        }
        // Every move was distinct, so every one reached the host.
        assert_eq!(host.injected(), 10_000);
    }

    #[test]
    fn caps_lock_toggles_and_unicode_slot_rebinds() {
        let mut host = SoftwareInput::new();
        host.inject(InputEvent::Key {
            keycode: CAPS_LOCK_KEYCODE,
            pressed: true,
            repeat: false,
        });
        assert_eq!(host.modifier_state(), LOCK_MASK);

        host.remap_keysym(UNICODE_KEYCODE, 0x0100_20AC);
        host.remap_keysym(UNICODE_KEYCODE, 0xE9);
        assert_eq!(host.keysym(UNICODE_KEYCODE), 0xE9);
        assert!(host.autorepeat());
    }
}
