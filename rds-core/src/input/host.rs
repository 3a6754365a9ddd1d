//! Canonical input events and the host that receives them.

use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use super::keymap::{CAPS_LOCK_KEYCODE, NUM_LOCK_KEYCODE, SCROLL_LOCK_KEYCODE};

/// Real modifier bit for Caps Lock.
pub const LOCK_MASK: u32 = 1 << 1;
/// Real modifier bit software hosts bind `NumLock` to (Mod2).
pub const NUM_LOCK_MASK: u32 = 1 << 4;
/// Real modifier bit software hosts bind `ScrollLock` to (Mod3).
pub const SCROLL_LOCK_MASK: u32 = 1 << 5;

/// Modifier bit a press of `keycode` toggles on a software host, or 0.
pub fn lock_toggle(keycode: u8) -> u32 {
    match keycode {
        CAPS_LOCK_KEYCODE => LOCK_MASK,
        NUM_LOCK_KEYCODE => NUM_LOCK_MASK,
        SCROLL_LOCK_KEYCODE => SCROLL_LOCK_MASK,
        _ => 0,
    }
}

/// Virtual modifier table of a software host.
pub fn software_virtual_modifier(name: &str) -> Option<u32> {
    match name {
        "NumLock" => Some(NUM_LOCK_MASK),
        "ScrollLock" => Some(SCROLL_LOCK_MASK),
        _ => None,
    }
}

// ── InputEvent ───────────────────────────────────────────────────

/// Phase of a touch contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchPhase {
    Begin,
    Update,
    End,
}

/// A normalized input event, ready for injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEvent {
    /// Absolute pointer motion in framebuffer pixels.
    Motion { x: u32, y: u32 },
    /// Pointer button `button` (1-based) changed state.
    Button { button: u8, pressed: bool },
    /// Canonical keycode changed state. `repeat` marks a press of a key
    /// that is already down.
    Key {
        keycode: u8,
        pressed: bool,
        repeat: bool,
    },
    /// Touch contact event.
    Touch {
        phase: TouchPhase,
        contact_id: u32,
        x: i32,
        y: i32,
    },
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Motion { x, y } => write!(f, "motion({x},{y})"),
            Self::Button { button, pressed: true } => write!(f, "press(button{button})"),
            Self::Button { button, pressed: false } => write!(f, "release(button{button})"),
            Self::Key { keycode, pressed, .. } => {
                write!(f, "key {keycode} {}", if *pressed { "down" } else { "up" })
            }
            Self::Touch {
                phase,
                contact_id,
                x,
                y,
            } => write!(f, "touch {phase:?} #{contact_id} ({x},{y})"),
        }
    }
}

// ── InputHost ────────────────────────────────────────────────────

/// The input-injection side of the windowing system.
pub trait InputHost {
    /// Deliver one canonical event.
    fn inject(&mut self, event: InputEvent);

    /// Current real modifier mask (`LOCK_MASK` for Caps Lock).
    fn modifier_state(&self) -> u32;

    /// Real modifier bits bound to the named virtual modifier
    /// (`"NumLock"`, `"ScrollLock"`), if any.
    fn virtual_modifier(&self, name: &str) -> Option<u32>;

    /// Whether the keyboard's own autorepeat is enabled.
    fn autorepeat(&self) -> bool;

    fn set_autorepeat(&mut self, enabled: bool);

    /// Bind `keysym` to every level of `keycode`.
    fn remap_keysym(&mut self, keycode: u8, keysym: u32);
}

// ── HeadlessInput ────────────────────────────────────────────────

/// Recording input host for tests and embedders: keeps every injected
/// event until [`take_events`](Self::take_events) and models lock-key
/// toggling.
#[derive(Debug, Clone)]
pub struct HeadlessInput {
    events: Vec<InputEvent>,
    modifiers: u32,
    autorepeat: bool,
    autorepeat_changes: usize,
    keysyms: HashMap<u8, u32>,
}

impl HeadlessInput {
    pub const NUM_LOCK_MASK: u32 = NUM_LOCK_MASK;
    pub const SCROLL_LOCK_MASK: u32 = SCROLL_LOCK_MASK;

    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            modifiers: 0,
            autorepeat: true,
            autorepeat_changes: 0,
            keysyms: HashMap::new(),
        }
    }

    /// Events injected so far.
    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    /// Return and clear the recorded events.
    pub fn take_events(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }

    /// Force the local modifier mask (for tests and host-side state).
    pub fn set_modifiers(&mut self, modifiers: u32) {
        self.modifiers = modifiers;
    }

    /// Number of `set_autorepeat` calls so far.
    pub fn autorepeat_changes(&self) -> usize {
        self.autorepeat_changes
    }

    /// Last keysym bound to `keycode`.
    pub fn keysym(&self, keycode: u8) -> Option<u32> {
        self.keysyms.get(&keycode).copied()
    }
}

impl Default for HeadlessInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHost for HeadlessInput {
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
        self.events.push(event);
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
        self.autorepeat_changes += 1;
    }

    fn remap_keysym(&mut self, keycode: u8, keysym: u32) {
        self.keysyms.insert(keycode, keysym);
    }
}
