//! Multi-touch contact tracking.
//!
//! [`TouchContactTable`] is a fixed arena of contact slots with explicit
//! occupancy bits. [`TouchState`] turns the contact records of a touch
//! frame into begin/update/end events using that table.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::host::{InputEvent, InputHost, TouchPhase};
use crate::error::RdsError;
use crate::flags::ContactFlags;

/// Simultaneous contacts tracked.
pub const MAX_CONTACTS: usize = 10;

/// One contact record of a touch frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchContact {
    pub contact_id: u32,
    pub x: i32,
    pub y: i32,
    /// Raw [`ContactFlags`] bits.
    pub flags: u32,
}

impl TouchContact {
    pub fn new(contact_id: u32, x: i32, y: i32, flags: ContactFlags) -> Self {
        Self {
            contact_id,
            x,
            y,
            flags: flags.bits(),
        }
    }

    pub fn flags(&self) -> ContactFlags {
        ContactFlags::from_bits_truncate(self.flags)
    }
}

// ── TouchContactTable ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    contact_id: u32,
    x: i32,
    y: i32,
}

/// Result of placing a contact position in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// A free slot was taken.
    New(usize),
    /// Existing slot, position changed.
    Moved(usize),
    /// Existing slot, same position.
    Unchanged(usize),
}

#[derive(Debug, Clone, Default)]
pub struct TouchContactTable {
    slots: [Slot; MAX_CONTACTS],
    occupied: u16,
    dropped: u64,
}

impl TouchContactTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_live(&self, slot: usize) -> bool {
        self.occupied & (1 << slot) != 0
    }

    /// Slot index holding `contact_id`.
    pub fn find(&self, contact_id: u32) -> Option<usize> {
        (0..MAX_CONTACTS).find(|&i| self.is_live(i) && self.slots[i].contact_id == contact_id)
    }

    /// Last known position of a live contact.
    pub fn position(&self, contact_id: u32) -> Option<(i32, i32)> {
        self.find(contact_id)
            .map(|i| (self.slots[i].x, self.slots[i].y))
    }

    /// Record a position for `contact_id`, allocating the first free slot
    /// for an unknown contact.
    pub fn place(&mut self, contact_id: u32, x: i32, y: i32) -> Result<Placement, RdsError> {
        if let Some(i) = self.find(contact_id) {
            let slot = &mut self.slots[i];
            let moved = (slot.x, slot.y) != (x, y);
            slot.x = x;
            slot.y = y;
            return Ok(if moved {
                Placement::Moved(i)
            } else {
                Placement::Unchanged(i)
            });
        }

        let free = (0..MAX_CONTACTS)
            .find(|&i| !self.is_live(i))
            .ok_or(RdsError::TouchSlotsExhausted { contact_id })?;
        self.slots[free] = Slot { contact_id, x, y };
        self.occupied |= 1 << free;
        Ok(Placement::New(free))
    }

    /// Update a live contact. Returns `None` for unknown contacts,
    /// otherwise whether the position changed.
    pub fn update(&mut self, contact_id: u32, x: i32, y: i32) -> Option<bool> {
        let i = self.find(contact_id)?;
        let slot = &mut self.slots[i];
        let moved = (slot.x, slot.y) != (x, y);
        slot.x = x;
        slot.y = y;
        Some(moved)
    }

    /// Free the slot of `contact_id`. Returns `false` if it was not live.
    pub fn release(&mut self, contact_id: u32) -> bool {
        match self.find(contact_id) {
            Some(i) => {
                self.occupied &= !(1 << i);
                true
            }
            None => false,
        }
    }

    /// Live contacts.
    pub fn live_count(&self) -> usize {
        self.occupied.count_ones() as usize
    }

    pub fn is_full(&self) -> bool {
        self.live_count() == MAX_CONTACTS
    }

    /// Contacts dropped because every slot was taken.
    pub fn dropped_contacts(&self) -> u64 {
        self.dropped
    }

    fn record_drop(&mut self) {
        self.dropped += 1;
    }

    /// Free every slot. The drop counter is kept.
    pub fn clear(&mut self) {
        self.occupied = 0;
    }
}

// ── TouchState ───────────────────────────────────────────────────

/// Touch subsystem of a session: the contact table plus an on/off
/// switch tied to the client connection.
#[derive(Debug, Clone, Default)]
pub struct TouchState {
    table: TouchContactTable,
    running: bool,
}

impl TouchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> &TouchContactTable {
        &self.table
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop and forget every contact.
    pub fn stop(&mut self) {
        self.running = false;
        self.table.clear();
    }

    fn emit(host: &mut dyn InputHost, phase: TouchPhase, contact: &TouchContact) {
        host.inject(InputEvent::Touch {
            phase,
            contact_id: contact.contact_id,
            x: contact.x,
            y: contact.y,
        });
    }

    /// Process the contacts of one touch frame in order.
    pub fn frame(&mut self, contacts: &[TouchContact], host: &mut dyn InputHost) {
        if !self.running {
            debug!("touch frame while touch is stopped");
            return;
        }
        for contact in contacts {
            self.contact(contact, host);
        }
    }

    fn contact(&mut self, contact: &TouchContact, host: &mut dyn InputHost) {
        let flags = contact.flags();
        let id = contact.contact_id;

        if flags.contains(ContactFlags::UP) {
            if self.table.release(id) {
                Self::emit(host, TouchPhase::End, contact);
            }
        } else if flags.contains(ContactFlags::DOWN) {
            match self.table.place(id, contact.x, contact.y) {
                Ok(Placement::New(_)) => Self::emit(host, TouchPhase::Begin, contact),
                Ok(Placement::Moved(_)) => Self::emit(host, TouchPhase::Update, contact),
                Ok(Placement::Unchanged(_)) => {}
                Err(e) => {
                    self.table.record_drop();
                    warn!(
                        contact_id = id,
                        dropped = self.table.dropped_contacts(),
                        "{e}"
                    );
                }
            }
        } else {
            match self.table.update(id, contact.x, contact.y) {
                Some(true) => Self::emit(host, TouchPhase::Update, contact),
                Some(false) => {}
                None => debug!(contact_id = id, "update for unknown contact"),
            }
        }
    }

    /// The client reported a contact as released outside a frame.
    pub fn released(&mut self, contact_id: u32, host: &mut dyn InputHost) {
        if !self.running {
            return;
        }
        if let Some((x, y)) = self.table.position(contact_id) {
            self.table.release(contact_id);
            host.inject(InputEvent::Touch {
                phase: TouchPhase::End,
                contact_id,
                x,
                y,
            });
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
