//! Shared sync buffers and the collaborator that hands them out.
//!
//! A [`SyncBuffer`] is an id-addressed region the transport layer reads a
//! frame diff from: a bounded rectangle list plus a data area laid out
//! exactly like the framebuffer. Handles are cheap clones of one shared
//! allocation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::geometry::Rect;

// ── SyncBuffer ───────────────────────────────────────────────────

/// Reference-counted handle to one shared buffer.
#[derive(Debug, Clone)]
pub struct SyncBuffer {
    id: u32,
    max_rects: usize,
    inner: Arc<Mutex<BufferContents>>,
}

/// The bytes behind a [`SyncBuffer`].
#[derive(Debug, Default)]
pub struct BufferContents {
    rects: Vec<Rect>,
    data: Vec<u8>,
}

impl BufferContents {
    /// Rectangles written by the last flush.
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub(crate) fn set_rects(&mut self, rects: Vec<Rect>) {
        self.rects = rects;
    }
}

impl SyncBuffer {
    /// Allocate a zeroed buffer with `data_size` bytes of pixel storage.
    pub fn new(id: u32, data_size: usize, max_rects: usize) -> Self {
        Self {
            id,
            max_rects: max_rects.max(1),
            inner: Arc::new(Mutex::new(BufferContents {
                rects: Vec::new(),
                data: vec![0; data_size],
            })),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Rectangle capacity of the buffer's damage list.
    pub fn max_rects(&self) -> usize {
        self.max_rects
    }

    pub fn data_size(&self) -> usize {
        self.lock().data.len()
    }

    /// Exclusive access to the buffer contents.
    pub fn lock(&self) -> MutexGuard<'_, BufferContents> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the rectangle list.
    pub fn rects(&self) -> Vec<Rect> {
        self.lock().rects.clone()
    }

    /// Number of live handles to this buffer.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// `true` when both handles refer to the same allocation.
    pub fn same_buffer(&self, other: &SyncBuffer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ── BufferProvider ───────────────────────────────────────────────

/// Transport-side allocator of sync buffers.
pub trait BufferProvider {
    /// Resolve `id` to a buffer. `frame_size` is the byte size of the
    /// current frame, for providers that allocate on demand. `None` means
    /// the buffer is not (yet) available.
    fn connect(&mut self, id: u32, frame_size: usize) -> Option<SyncBuffer>;

    /// Give back a handle obtained from [`connect`](Self::connect).
    fn release(&mut self, buffer: SyncBuffer);
}

// ── LocalBufferPool ──────────────────────────────────────────────

/// In-process [`BufferProvider`].
///
/// Buffers are either registered up front with [`insert`](Self::insert)
/// or, when auto-allocation is on, created on `connect` with
/// `frame_size + slack` bytes. An allocated buffer lives until it is
/// released and is replaced if the frame outgrew it.
#[derive(Debug)]
pub struct LocalBufferPool {
    buffers: HashMap<u32, SyncBuffer>,
    allocated: HashSet<u32>,
    max_rects: usize,
    auto_allocate: Option<usize>,
    connected: usize,
}

impl LocalBufferPool {
    /// A pool that only serves explicitly inserted buffers.
    pub fn new(max_rects: usize) -> Self {
        Self {
            buffers: HashMap::new(),
            allocated: HashSet::new(),
            max_rects,
            auto_allocate: None,
            connected: 0,
        }
    }

    /// A pool that allocates unknown ids on demand with `slack` spare bytes.
    pub fn auto(max_rects: usize, slack: usize) -> Self {
        Self {
            auto_allocate: Some(slack),
            ..Self::new(max_rects)
        }
    }

    /// Register a buffer of `data_size` bytes under `id`, replacing any
    /// previous one.
    pub fn insert(&mut self, id: u32, data_size: usize) -> SyncBuffer {
        self.allocated.remove(&id);
        self.store(id, data_size)
    }

    /// Forget the buffer with `id`. Outstanding handles stay valid.
    pub fn remove(&mut self, id: u32) -> Option<SyncBuffer> {
        self.allocated.remove(&id);
        self.buffers.remove(&id)
    }

    /// Buffers currently held by the pool.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&SyncBuffer> {
        self.buffers.get(&id)
    }

    /// Handles currently connected and not yet released.
    pub fn connected(&self) -> usize {
        self.connected
    }

    fn store(&mut self, id: u32, data_size: usize) -> SyncBuffer {
        let buffer = SyncBuffer::new(id, data_size, self.max_rects);
        self.buffers.insert(id, buffer.clone());
        buffer
    }

    fn allocate(&mut self, id: u32, size: usize) -> SyncBuffer {
        debug!(id, size, "allocating sync buffer");
        self.allocated.insert(id);
        self.store(id, size)
    }
}

impl BufferProvider for LocalBufferPool {
    fn connect(&mut self, id: u32, frame_size: usize) -> Option<SyncBuffer> {
        // Allocated buffers the frame outgrew are replaced, never reused.
        let reusable = self
            .buffers
            .get(&id)
            .filter(|b| !self.allocated.contains(&id) || b.data_size() >= frame_size)
            .cloned();
        let buffer = match (reusable, self.auto_allocate) {
            (Some(buffer), _) => buffer,
            (None, Some(slack)) => self.allocate(id, frame_size.saturating_add(slack)),
            (None, None) => {
                warn!(id, "unknown sync buffer id");
                return None;
            }
        };
        self.connected += 1;
        Some(buffer)
    }

    fn release(&mut self, buffer: SyncBuffer) {
        debug!(id = buffer.id(), "releasing sync buffer");
        self.connected = self.connected.saturating_sub(1);
        let id = buffer.id();
        if self.allocated.contains(&id)
            && self.buffers.get(&id).is_some_and(|b| b.same_buffer(&buffer))
        {
            self.allocated.remove(&id);
            self.buffers.remove(&id);
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
