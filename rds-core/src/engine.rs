//! The damage-buffer synchronization protocol.
//!
//! The engine owns the dirty region and at most one attached
//! [`SyncBuffer`]. A client asks for changes with a buffer id; the engine
//! attaches that buffer (copying the whole frame into it on first
//! attach), and on the next [`flush`](DamageSyncEngine::flush) copies the
//! drained rectangles over and reports the buffer id back.
//!
//! ```text
//!  Unattached ──request_sync(id)──► Attached ──flush──► reply(id)
//!       ▲                              │
//!       └──────────── detach ◄─────────┘   (id remembered as stale)
//! ```

use tracing::{debug, error, trace, warn};

use crate::damage::DirtyTracker;
use crate::error::RdsError;
use crate::frame::FrameStore;
use crate::geometry::{Rect, extents};
use crate::syncbuf::{BufferProvider, SyncBuffer};

// ── DamageSyncEngine ─────────────────────────────────────────────

#[derive(Debug)]
pub struct DamageSyncEngine {
    damage: DirtyTracker,
    attached: Option<SyncBuffer>,
    sync_requested: bool,
    last_detached_id: Option<u32>,
}

impl DamageSyncEngine {
    pub fn new(damage: DirtyTracker) -> Self {
        Self {
            damage,
            attached: None,
            sync_requested: false,
            last_detached_id: None,
        }
    }

    // ── Damage input ─────────────────────────────────────────────

    /// Renderer hook: a rectangle of the frame changed.
    pub fn report_damage(&mut self, rect: Rect) {
        self.damage.mark_rect(rect);
    }

    pub fn mark_full(&mut self) {
        self.damage.mark_full();
    }

    pub fn damage(&self) -> &DirtyTracker {
        &self.damage
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    pub fn attached_id(&self) -> Option<u32> {
        self.attached.as_ref().map(SyncBuffer::id)
    }

    pub fn attached(&self) -> Option<&SyncBuffer> {
        self.attached.as_ref()
    }

    pub fn sync_requested(&self) -> bool {
        self.sync_requested
    }

    pub fn last_detached_id(&self) -> Option<u32> {
        self.last_detached_id
    }

    // ── Client requests ──────────────────────────────────────────

    /// `true` when `id` names the buffer that was just released and no
    /// other buffer has been attached since. Such a request was in flight
    /// before the client saw the release and must not re-attach.
    fn is_stale(&self, id: u32) -> bool {
        self.attached.is_none() && self.last_detached_id == Some(id)
    }

    /// Attach `id` unless it is already the attached buffer.
    fn ensure_attached(
        &mut self,
        id: u32,
        frame: &FrameStore,
        provider: &mut dyn BufferProvider,
    ) -> Result<bool, RdsError> {
        if self.attached_id() == Some(id) {
            return Ok(true);
        }
        self.attach(id, frame, provider)
    }

    /// Handle "I have buffer `id`, send me changes".
    ///
    /// Marks a sync as requested if a buffer is attached afterwards; the
    /// caller runs [`flush`](Self::flush) to produce the reply. A buffer
    /// the provider cannot resolve leaves the request parked.
    pub fn request_sync(
        &mut self,
        id: u32,
        frame: &FrameStore,
        provider: &mut dyn BufferProvider,
    ) -> Result<(), RdsError> {
        if self.is_stale(id) {
            debug!(id, "ignoring sync request for released buffer");
            return Ok(());
        }
        if self.ensure_attached(id, frame, provider)? {
            self.sync_requested = true;
        }
        Ok(())
    }

    /// Handle an immediate sync: attach as for
    /// [`request_sync`](Self::request_sync), write an empty rectangle list
    /// and return the id to reply with, without touching the damage.
    pub fn immediate_sync(
        &mut self,
        id: u32,
        frame: &FrameStore,
        provider: &mut dyn BufferProvider,
    ) -> Result<Option<u32>, RdsError> {
        if self.is_stale(id) {
            debug!(id, "ignoring immediate sync for released buffer");
            return Ok(None);
        }
        if !self.ensure_attached(id, frame, provider)? {
            return Ok(None);
        }
        let Some(buffer) = self.attached.as_ref() else {
            return Ok(None);
        };
        buffer.lock().set_rects(Vec::new());
        Ok(Some(buffer.id()))
    }

    // ── Attach / detach ──────────────────────────────────────────

    /// Detach any current buffer and attach `id`.
    ///
    /// Returns `Ok(false)` when the provider has no such buffer. A buffer
    /// smaller than the frame is released again and reported as
    /// [`RdsError::BufferTooSmall`]; nothing is attached in that case.
    /// On success the whole frame is copied into the buffer and marked
    /// dirty.
    pub fn attach(
        &mut self,
        id: u32,
        frame: &FrameStore,
        provider: &mut dyn BufferProvider,
    ) -> Result<bool, RdsError> {
        self.detach(provider);

        let needed = frame.geometry().map_or(0, |g| g.byte_size);
        let Some(buffer) = provider.connect(id, needed) else {
            debug!(id, "sync buffer unavailable, request parked");
            return Ok(false);
        };

        let size = buffer.data_size();
        if size < needed {
            error!(id, size, needed, "sync buffer too small for frame");
            provider.release(buffer);
            return Err(RdsError::BufferTooSmall { id, size, needed });
        }

        frame.copy_all_into(buffer.lock().data_mut());
        self.damage.mark_full();
        debug!(id, "sync buffer attached");
        self.attached = Some(buffer);
        Ok(true)
    }

    /// Release the attached buffer, remembering its id as stale.
    pub fn detach(&mut self, provider: &mut dyn BufferProvider) {
        if let Some(buffer) = self.attached.take() {
            debug!(id = buffer.id(), "sync buffer detached");
            self.last_detached_id = Some(buffer.id());
            self.sync_requested = false;
            provider.release(buffer);
        }
    }

    /// The client went away: release the buffer and forget every request.
    /// Buffer ids are only meaningful within one connection, so the stale
    /// id is cleared too.
    pub fn reset(&mut self, provider: &mut dyn BufferProvider) {
        self.detach(provider);
        self.last_detached_id = None;
        self.sync_requested = false;
    }

    /// The frame was recreated: drop the buffer and redraw everything on
    /// the next attach.
    pub fn on_resize(&mut self, width: u32, height: u32, provider: &mut dyn BufferProvider) {
        self.detach(provider);
        self.damage.set_bounds(width, height);
    }

    // ── Flush ────────────────────────────────────────────────────

    /// Copy pending damage into the attached buffer.
    ///
    /// Returns the buffer id to send a sync reply for, or `None` when
    /// nothing was requested, nothing is attached, the session is not
    /// active, or no damage accumulated.
    pub fn flush(&mut self, frame: &FrameStore, active: bool) -> Result<Option<u32>, RdsError> {
        if !active || !self.sync_requested {
            return Ok(None);
        }
        let Some(buffer) = self.attached.as_ref() else {
            return Ok(None);
        };
        let Some(geometry) = frame.geometry() else {
            return Ok(None);
        };

        let size = buffer.data_size();
        if size < geometry.byte_size {
            error!(id = buffer.id(), size, needed = geometry.byte_size, "sync buffer too small");
            return Err(RdsError::BufferTooSmall {
                id: buffer.id(),
                size,
                needed: geometry.byte_size,
            });
        }

        let mut rects: Vec<Rect> = self
            .damage
            .drain()
            .iter()
            .filter_map(|r| r.clip(geometry.width, geometry.height))
            .collect();
        if rects.is_empty() {
            return Ok(None);
        }

        if rects.len() > buffer.max_rects() {
            warn!(
                count = rects.len(),
                max = buffer.max_rects(),
                "damage exceeds buffer capacity, sending extents"
            );
            rects = extents(&rects).into_iter().collect();
        }

        {
            let mut contents = buffer.lock();
            for rect in &rects {
                frame.copy_rect_into(rect, contents.data_mut());
            }
            trace!(id = buffer.id(), count = rects.len(), "damage copied");
            contents.set_rects(rects);
        }

        self.sync_requested = false;
        Ok(Some(buffer.id()))
    }
}

// ── Tests ────────────────────────────────────────────────────────
