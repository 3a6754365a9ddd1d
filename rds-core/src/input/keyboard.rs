//! Keyboard normalization.
//!
//! All three remote key encodings end in [`KeyboardState::key`], which
//! applies the keypad remap, suppresses host autorepeat around the
//! injection and keeps a bitmap of keys that are logically down.

use tracing::{debug, trace};

use super::host::{InputEvent, InputHost, LOCK_MASK};
use super::keymap::{
    self, CAPS_LOCK_KEYCODE, NUM_LOCK_KEYCODE, SCROLL_LOCK_KEYCODE, UNICODE_KEYCODE, VK_EXTENDED,
};
use crate::flags::{KeyboardFlags, SyncFlags};

// ── KeyboardState ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct KeyboardState {
    down: [u8; 32],
    keypad_remap: bool,
    suppress_autorepeat: bool,
}

impl KeyboardState {
    /// `keypad_remap` rewrites keypad arrows to cursor keys;
    /// `suppress_autorepeat` switches host autorepeat off around each
    /// injected key.
    pub fn new(keypad_remap: bool, suppress_autorepeat: bool) -> Self {
        Self {
            down: [0; 32],
            keypad_remap,
            suppress_autorepeat,
        }
    }

    pub fn is_down(&self, keycode: u8) -> bool {
        self.down[keycode as usize / 8] & (1 << (keycode % 8)) != 0
    }

    /// Keycodes currently down, ascending.
    pub fn keys_down(&self) -> Vec<u8> {
        (0..=u8::MAX).filter(|&k| self.is_down(k)).collect()
    }

    fn set_down(&mut self, keycode: u8, down: bool) {
        let byte = &mut self.down[keycode as usize / 8];
        if down {
            *byte |= 1 << (keycode % 8);
        } else {
            *byte &= !(1 << (keycode % 8));
        }
    }

    /// Inject one key transition.
    pub fn key(&mut self, keycode: u8, pressed: bool, host: &mut dyn InputHost) {
        let keycode = if self.keypad_remap {
            keymap::keypad_to_cursor(keycode)
        } else {
            keycode
        };

        let saved = self.suppress_autorepeat && host.autorepeat();
        if saved {
            host.set_autorepeat(false);
        }

        let repeat = saved && pressed && self.is_down(keycode);
        host.inject(InputEvent::Key {
            keycode,
            pressed,
            repeat,
        });
        self.set_down(keycode, pressed);

        if saved {
            host.set_autorepeat(true);
        }
    }

    // ── Remote encodings ─────────────────────────────────────────

    /// Hardware scancode event.
    pub fn scancode_event(
        &mut self,
        flags: KeyboardFlags,
        scancode: u32,
        keyboard_type: u32,
        host: &mut dyn InputHost,
    ) {
        let Some(keycode) = keymap::scancode_to_keycode(
            scancode,
            flags.contains(KeyboardFlags::EXTENDED),
            flags.contains(KeyboardFlags::EXTENDED1),
            keyboard_type,
        ) else {
            debug!(scancode, ?flags, "unmapped scancode");
            return;
        };
        trace!(scancode, keycode, "scancode event");
        self.key(keycode, flags.is_press(), host);
    }

    /// Windows virtual-key event.
    pub fn virtual_key_event(&mut self, flags: KeyboardFlags, vk: u32, host: &mut dyn InputHost) {
        let vk = if flags.contains(KeyboardFlags::EXTENDED) {
            vk | VK_EXTENDED
        } else {
            vk
        };
        let Some(keycode) = keymap::virtual_key_to_keycode(vk) else {
            debug!(vk, "unmapped virtual key");
            return;
        };
        self.key(keycode, flags.is_press(), host);
    }

    /// Unicode event: bind the code point to the unicode slot keycode and
    /// send that key.
    pub fn unicode_event(&mut self, flags: KeyboardFlags, code: u32, host: &mut dyn InputHost) {
        let Some(keysym) = keymap::unicode_keysym(code) else {
            debug!(code, "ignoring unicode control or out-of-range value");
            return;
        };
        host.remap_keysym(UNICODE_KEYCODE, keysym);
        self.key(UNICODE_KEYCODE, flags.is_press(), host);
    }

    // ── Sync ─────────────────────────────────────────────────────

    /// Release every key that is logically down, lowest keycode first.
    pub fn release_all(&mut self, host: &mut dyn InputHost) {
        for keycode in self.keys_down() {
            self.key(keycode, false, host);
        }
    }

    /// Bring local lock keys in line with the remote state, starting from
    /// all keys up.
    pub fn sync(&mut self, flags: SyncFlags, host: &mut dyn InputHost) {
        self.release_all(host);

        let state = host.modifier_state();
        let num = host.virtual_modifier("NumLock").unwrap_or(0);
        let scroll = host.virtual_modifier("ScrollLock").unwrap_or(0);

        let locks = [
            (state & LOCK_MASK, SyncFlags::CAPS_LOCK, CAPS_LOCK_KEYCODE),
            (state & num, SyncFlags::NUM_LOCK, NUM_LOCK_KEYCODE),
            (state & scroll, SyncFlags::SCROLL_LOCK, SCROLL_LOCK_KEYCODE),
        ];
        for (local, remote, keycode) in locks {
            if (local != 0) != flags.contains(remote) {
                debug!(keycode, "toggling lock key");
                self.key(keycode, true, host);
                self.key(keycode, false, host);
            }
        }
    }

    /// Forget key state without emitting anything.
    pub fn clear(&mut self) {
        self.down = [0; 32];
    }
}

// ── Tests ────────────────────────────────────────────────────────
