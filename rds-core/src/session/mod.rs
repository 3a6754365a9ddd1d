//! The per-client session: lifecycle, message dispatch and the frame
//! sync / input plumbing behind it.
//!
//! One [`SessionController`] owns the framebuffer, the damage sync engine
//! and the input normalizer. The control loop feeds it client messages,
//! renderer damage and ticks; everything it wants to tell the client goes
//! through the [`MessageSink`] installed on [`accept`](SessionController::accept).
//!
//! Errors follow [`ErrorClass`]: fatal protocol and allocation errors end
//! the session (the controller disconnects before returning them), other
//! classes drop the unit of work and are logged.

pub mod config;
pub mod host;
pub mod state;

pub use config::{SessionConfig, SizeLimits, SizePolicy};
pub use host::{DisplayHost, HeadlessDisplay, MessageSink, PendingPrompt, Prompt};
pub use state::SessionState;

use tracing::{debug, error, info, trace, warn};

use crate::cursor::{CursorImage, CursorUpdate, encode_cursor};
use crate::damage::DirtyTracker;
use crate::engine::DamageSyncEngine;
use crate::error::{ErrorClass, RdsError};
use crate::frame::{FrameStore, Geometry};
use crate::geometry::Rect;
use crate::input::keymap::layout_name_or_default;
use crate::input::{InputHost, InputNormalizer};
use crate::message::{ClientMessage, ServerMessage, WireMessage};
use crate::protocol::client::MAX_MESSAGE_PARAMETERS;
use crate::protocol::{
    Beep, Capabilities, FramebufferInfo, MessageReply, MessageRequest, SyncReply, Version,
};
use crate::syncbuf::BufferProvider;

// ── SessionController ────────────────────────────────────────────

pub struct SessionController<P, I, D> {
    config: SessionConfig,
    limits: SizeLimits,
    state: SessionState,
    frame: FrameStore,
    engine: DamageSyncEngine,
    input: InputNormalizer,
    provider: P,
    input_host: I,
    display: D,
    sink: Option<Box<dyn MessageSink>>,
    cursor: Option<CursorImage>,
    connection: u64,
    prompts: Vec<PendingPrompt>,
}

impl<P, I, D> SessionController<P, I, D>
where
    P: BufferProvider,
    I: InputHost,
    D: DisplayHost,
{
    /// Allocate the initial framebuffer. Failing here is fatal to the
    /// session before it starts.
    pub fn new(config: SessionConfig, provider: P, input_host: I, display: D) -> Result<Self, RdsError> {
        let mut frame = FrameStore::new();
        let geometry = *frame.create(config.width, config.height, config.depth)?;
        let damage =
            DirtyTracker::with_max_tracked(geometry.width, geometry.height, config.max_tracked_rects);
        info!(
            width = geometry.width,
            height = geometry.height,
            depth = geometry.depth,
            "session ready"
        );

        Ok(Self {
            limits: config.limits,
            input: InputNormalizer::new(config.input),
            engine: DamageSyncEngine::new(damage),
            config,
            state: SessionState::Idle,
            frame,
            provider,
            input_host,
            display,
            sink: None,
            cursor: None,
            connection: 0,
            prompts: Vec::new(),
        })
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn limits(&self) -> SizeLimits {
        self.limits
    }

    pub fn frame(&self) -> &FrameStore {
        &self.frame
    }

    /// Renderer access to the pixels. Report changes with
    /// [`report_damage`](Self::report_damage).
    pub fn frame_mut(&mut self) -> &mut FrameStore {
        &mut self.frame
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.frame.geometry()
    }

    pub fn engine(&self) -> &DamageSyncEngine {
        &self.engine
    }

    pub fn input(&self) -> &InputNormalizer {
        &self.input
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn input_host(&self) -> &I {
        &self.input_host
    }

    pub fn input_host_mut(&mut self) -> &mut I {
        &mut self.input_host
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// Serial of the current (or last) connection.
    pub fn connection(&self) -> u64 {
        self.connection
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// A client finished the transport handshake.
    pub fn accept(&mut self, sink: Box<dyn MessageSink>) -> Result<(), RdsError> {
        self.state.accept()?;
        self.connection += 1;
        self.sink = Some(sink);
        self.input.connect();
        info!(connection = self.connection, "client accepted");
        self.send(ServerMessage::Version(Version::default()))
            .or_else(|e| self.fail(e))
    }

    /// Tear the session down and return to `Idle`. Safe to call in any
    /// state, including from inside a failing send.
    pub fn disconnect(&mut self) {
        let Some(_sink) = self.sink.take() else {
            self.state.reset();
            return;
        };
        let was = self.state;
        self.state.reset();
        self.prompts.clear();
        self.engine.reset(&mut self.provider);
        self.input.disconnect(&mut self.input_host);
        info!(connection = self.connection, from = %was, "client disconnected");
    }

    /// The channel failed; same as a disconnect.
    pub fn transport_error(&mut self, err: &RdsError) {
        warn!(error = %err, "transport error");
        self.disconnect();
    }

    // ── Client messages ──────────────────────────────────────────

    /// Dispatch one client message.
    ///
    /// Returns an error only when the session was terminated because of
    /// it; recoverable errors are logged and swallowed.
    pub fn handle(&mut self, message: ClientMessage) -> Result<(), RdsError> {
        trace!(kind = %message.message_type(), "client message");
        if !self.state.is_connected() {
            return Err(RdsError::ProtocolViolation("message without a connected client"));
        }
        match self.dispatch(message) {
            Ok(()) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    fn dispatch(&mut self, message: ClientMessage) -> Result<(), RdsError> {
        match message {
            ClientMessage::Capabilities(caps) => self.capabilities(caps),
            ClientMessage::SyncRequest(req) => {
                self.engine
                    .request_sync(req.buffer_id, &self.frame, &mut self.provider)
            }
            ClientMessage::ImmediateSyncRequest(req) => {
                let reply =
                    self.engine
                        .immediate_sync(req.buffer_id, &self.frame, &mut self.provider)?;
                match reply {
                    Some(buffer_id) if self.state.is_active() => {
                        self.send(ServerMessage::SyncReply(SyncReply { buffer_id }))
                    }
                    _ => Ok(()),
                }
            }
            ClientMessage::MessageRequest(req) => {
                self.message_request(req);
                Ok(())
            }
            input => {
                self.input_event(input);
                Ok(())
            }
        }
    }

    fn capabilities(&mut self, caps: Capabilities) -> Result<(), RdsError> {
        let layout = layout_name_or_default(caps.keyboard_layout);
        debug!(layout_id = caps.keyboard_layout, layout, "keyboard layout");
        self.display.apply_keyboard_layout(layout);

        let (width, height) = self
            .limits
            .resolve(self.config.size_policy, caps.width, caps.height);
        let current = self.frame.geometry().map(|g| (g.width, g.height));
        let resized = current != Some((width, height));
        if resized {
            info!(width, height, "resizing for client");
            self.resize(width, height, self.config.depth)?;
        }

        if !self.state.is_active() {
            self.state.activate()?;
            info!(connection = self.connection, "session active");
        }
        // A resize already marked the new frame dirty.
        if !resized {
            self.engine.mark_full();
        }
        self.send_framebuffer_info()?;
        self.push_cursor()
    }

    fn input_event(&mut self, message: ClientMessage) {
        if !self.state.is_active() {
            debug!(kind = %message.message_type(), "input before activation dropped");
            return;
        }
        let bounds = self
            .frame
            .geometry()
            .map_or((0, 0), |g| (g.width, g.height));
        let host = &mut self.input_host;
        match message {
            ClientMessage::KeyboardScancode(e) => {
                self.input.scancode(e.flags, e.scancode, e.keyboard_type, host)
            }
            ClientMessage::KeyboardVirtualKey(e) => self.input.virtual_key(e.flags, e.vk, host),
            ClientMessage::KeyboardUnicode(e) => self.input.unicode(e.flags, e.code, host),
            ClientMessage::KeyboardSync(e) => self.input.keyboard_sync(e.flags, host),
            ClientMessage::Mouse(e) => self.input.mouse(e.flags, e.x, e.y, bounds, host),
            ClientMessage::ExtendedMouse(e) => {
                self.input.extended_mouse(e.flags, e.x, e.y, bounds, host)
            }
            ClientMessage::TouchFrame(frame) => self.input.touch_frame(&frame.contacts, host),
            ClientMessage::TouchReleased(e) => self.input.touch_released(e.contact_id, host),
            _ => {}
        }
    }

    fn message_request(&mut self, mut request: MessageRequest) {
        request.parameters.truncate(MAX_MESSAGE_PARAMETERS);
        debug!(message_id = request.message_id, "prompt requested");
        self.prompts.push(PendingPrompt {
            connection: self.connection,
            request,
        });
    }

    // ── Prompts ──────────────────────────────────────────────────

    /// Hand queued prompt requests to whoever runs the [`Prompt`].
    pub fn take_prompt_requests(&mut self) -> Vec<PendingPrompt> {
        std::mem::take(&mut self.prompts)
    }

    /// A prompt resolved. The reply is dropped if the client that asked
    /// is gone.
    pub fn complete_prompt(
        &mut self,
        connection: u64,
        message_id: u32,
        result: i32,
    ) -> Result<(), RdsError> {
        if connection != self.connection || !self.state.is_connected() {
            debug!(message_id, "prompt answered after disconnect");
            return Ok(());
        }
        self.send(ServerMessage::MessageReply(MessageReply { message_id, result }))
            .or_else(|e| self.fail(e))
    }

    // ── Renderer hooks ───────────────────────────────────────────

    pub fn report_damage(&mut self, rect: Rect) {
        self.engine.report_damage(rect);
    }

    /// Per-tick flush. Returns `true` when a sync reply went out.
    pub fn flush(&mut self) -> Result<bool, RdsError> {
        match self.engine.flush(&self.frame, self.state.is_active()) {
            Ok(Some(buffer_id)) => {
                trace!(buffer_id, "sync reply");
                self.send(ServerMessage::SyncReply(SyncReply { buffer_id }))
                    .or_else(|e| self.fail(e))?;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => self.fail(e).map(|()| false),
        }
    }

    /// The host changed the framebuffer geometry.
    pub fn geometry_changed(&mut self, width: u32, height: u32, depth: u32) -> Result<(), RdsError> {
        if !self.limits.allows(width, height) {
            warn!(width, height, "host geometry beyond limits rejected");
            return Err(RdsError::GeometryLimit {
                width,
                height,
                max_width: self.limits.max_width,
                max_height: self.limits.max_height,
            });
        }
        if let Some(g) = self.frame.geometry()
            && (g.width, g.height, g.depth) == (width, height, depth)
        {
            return Ok(());
        }

        let result = self.resize(width, height, depth).and_then(|()| {
            if self.state.is_active() {
                self.send_framebuffer_info()
            } else {
                Ok(())
            }
        });
        result.or_else(|e| self.fail(e))
    }

    /// The host cursor changed; `None` hides it.
    pub fn cursor_changed(&mut self, cursor: Option<CursorImage>) -> Result<(), RdsError> {
        self.cursor = cursor;
        if !self.state.is_active() {
            return Ok(());
        }
        self.push_cursor().or_else(|e| self.fail(e))
    }

    pub fn bell(&mut self, frequency: u32, duration: u32) -> Result<(), RdsError> {
        if !self.state.is_active() {
            return Ok(());
        }
        self.send(ServerMessage::Beep(Beep {
            frequency,
            duration,
        }))
        .or_else(|e| self.fail(e))
    }

    // ── Internals ────────────────────────────────────────────────

    fn resize(&mut self, width: u32, height: u32, depth: u32) -> Result<(), RdsError> {
        let geometry = *self.frame.recreate(width, height, depth)?;
        self.engine
            .on_resize(geometry.width, geometry.height, &mut self.provider);
        self.display.framebuffer_changed(&geometry);
        Ok(())
    }

    fn send_framebuffer_info(&mut self) -> Result<(), RdsError> {
        let Some(geometry) = self.frame.geometry() else {
            return Err(RdsError::NotAllocated);
        };
        let info = FramebufferInfo::from(geometry);
        self.send(ServerMessage::FramebufferInfo(info))
    }

    fn push_cursor(&mut self) -> Result<(), RdsError> {
        let message = match encode_cursor(self.cursor.as_ref()) {
            CursorUpdate::Shape(shape) => ServerMessage::SetPointer(shape),
            CursorUpdate::Null => ServerMessage::SetNullPointer,
        };
        self.send(message)
    }

    fn send(&mut self, message: ServerMessage) -> Result<(), RdsError> {
        match self.sink.as_mut() {
            Some(sink) => sink.send(message),
            None => Ok(()),
        }
    }

    /// Apply the error taxonomy: end the session on fatal and allocation
    /// errors, log and continue otherwise.
    fn fail(&mut self, err: RdsError) -> Result<(), RdsError> {
        match err.class() {
            ErrorClass::FatalProtocol | ErrorClass::Allocation => {
                error!(error = %err, "session terminated");
                self.disconnect();
                Err(err)
            }
            ErrorClass::ResourceExhaustion | ErrorClass::TransientIo => {
                warn!(error = %err, "dropped");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;
    use crate::input::{HeadlessInput, InputEvent};
    use crate::protocol::{MouseEvent, ScancodeEvent, SyncRequest};
    use crate::syncbuf::LocalBufferPool;

    /// Sink that shares its queue with the test.
    #[derive(Clone, Default)]
    struct Outbox(Rc<RefCell<VecDeque<ServerMessage>>>);

    impl MessageSink for Outbox {
        fn send(&mut self, message: ServerMessage) -> Result<(), RdsError> {
            self.0.borrow_mut().push_back(message);
            Ok(())
        }
    }

    impl Outbox {
        fn drain(&self) -> Vec<ServerMessage> {
            self.0.borrow_mut().drain(..).collect()
        }
    }

    struct Closed;

    impl MessageSink for Closed {
        fn send(&mut self, _: ServerMessage) -> Result<(), RdsError> {
            Err(RdsError::ChannelClosed)
        }
    }

    type TestSession = SessionController<LocalBufferPool, HeadlessInput, HeadlessDisplay>;

    fn session(config: SessionConfig) -> (TestSession, Outbox) {
        let mut s = SessionController::new(
            config,
            LocalBufferPool::auto(64, 0),
            HeadlessInput::new(),
            HeadlessDisplay::default(),
        )
        .unwrap();
        let out = Outbox::default();
        s.accept(Box::new(out.clone())).unwrap();
        (s, out)
    }

    fn caps(width: u32, height: u32) -> ClientMessage {
        ClientMessage::Capabilities(Capabilities {
            width,
            height,
            keyboard_layout: 0x0407,
            keyboard_type: 4,
        })
    }

    #[test]
    fn accept_sends_version() {
        let (s, out) = session(SessionConfig::default());
        assert!(s.state().is_connected());
        assert_eq!(out.drain(), vec![ServerMessage::Version(Version::default())]);
        assert!(s.input().touch().is_running());
    }

    #[test]
    fn second_accept_is_refused() {
        let (mut s, _) = session(SessionConfig::default());
        assert!(s.accept(Box::new(Outbox::default())).is_err());
    }

    #[test]
    fn capabilities_activate_session() {
        let (mut s, out) = session(SessionConfig::default());
        out.drain();
        s.handle(caps(1024, 768)).unwrap();

        assert!(s.state().is_active());
        assert_eq!(s.display().layout.as_deref(), Some("de"));
        assert!(s.engine().damage().is_full());
        assert_eq!(s.frame().generation(), 1);

        let sent = out.drain();
        assert!(matches!(
            sent[0],
            ServerMessage::FramebufferInfo(FramebufferInfo {
                width: 1024,
                height: 768,
                ..
            })
        ));
        assert_eq!(sent[1], ServerMessage::SetNullPointer);
    }

    #[test]
    fn input_before_capabilities_is_dropped() {
        let (mut s, _) = session(SessionConfig::default());
        s.handle(ClientMessage::Mouse(MouseEvent {
            flags: 0x0800,
            x: 5,
            y: 5,
        }))
        .unwrap();
        assert!(s.input_host().events().is_empty());

        s.handle(caps(1024, 768)).unwrap();
        s.handle(ClientMessage::Mouse(MouseEvent {
            flags: 0x0800,
            x: 5,
            y: 5,
        }))
        .unwrap();
        assert_eq!(s.input_host().events(), &[InputEvent::Motion { x: 5, y: 5 }]);
    }

    #[test]
    fn disconnect_releases_everything() {
        let (mut s, _) = session(SessionConfig::default());
        s.provider_mut().insert(1, 1024 * 768 * 4);
        s.handle(caps(1024, 768)).unwrap();
        s.handle(ClientMessage::SyncRequest(SyncRequest { buffer_id: 1 }))
            .unwrap();
        s.handle(ClientMessage::KeyboardScancode(ScancodeEvent {
            flags: 0x4000,
            scancode: 0x1E,
            keyboard_type: 4,
        }))
        .unwrap();
        assert!(s.engine().is_attached());
        assert_eq!(s.input().keyboard().keys_down().len(), 1);

        s.disconnect();
        assert!(s.state().is_idle());
        assert!(!s.engine().is_attached());
        assert_eq!(s.engine().last_detached_id(), None);
        assert!(!s.engine().sync_requested());
        assert!(s.input().keyboard().keys_down().is_empty());
        assert!(!s.input().touch().is_running());
        assert!(matches!(
            s.input_host().events().last(),
            Some(InputEvent::Key { pressed: false, .. })
        ));
    }

    #[test]
    fn closed_sink_ends_session() {
        let mut s = SessionController::new(
            SessionConfig::default(),
            LocalBufferPool::new(8),
            HeadlessInput::new(),
            HeadlessDisplay::default(),
        )
        .unwrap();
        assert!(matches!(
            s.accept(Box::new(Closed)),
            Err(RdsError::ChannelClosed)
        ));
        assert!(s.state().is_idle());
    }

    #[test]
    fn undersized_buffer_terminates_session() {
        let (mut s, _) = session(SessionConfig::default());
        s.provider_mut().insert(9, 16);
        s.handle(caps(1024, 768)).unwrap();
        let err = s
            .handle(ClientMessage::SyncRequest(SyncRequest { buffer_id: 9 }))
            .unwrap_err();
        assert!(matches!(err, RdsError::BufferTooSmall { .. }));
        assert!(s.state().is_idle());
        assert!(!s.engine().is_attached());
    }

    #[test]
    fn clamp_policy_limits_client_size() {
        let config = SessionConfig {
            limits: SizeLimits::new(1280, 800),
            size_policy: SizePolicy::Clamp,
            ..SessionConfig::default()
        };
        let (mut s, _) = session(config);
        s.handle(caps(1920, 1080)).unwrap();
        let g = s.geometry().unwrap();
        assert_eq!((g.width, g.height), (1280, 800));
        assert_eq!(s.limits(), SizeLimits::new(1280, 800));
    }

    #[test]
    fn ratchet_policy_raises_limits() {
        let config = SessionConfig {
            limits: SizeLimits::new(1280, 800),
            ..SessionConfig::default()
        };
        let (mut s, _) = session(config);
        s.handle(caps(1920, 1080)).unwrap();
        assert_eq!(s.limits(), SizeLimits::new(1920, 1080));
        assert!(s.geometry_changed(2560, 1440, 24).is_err());
        assert!(s.state().is_active());
    }

    #[test]
    fn host_resize_resends_framebuffer_info() {
        let (mut s, out) = session(SessionConfig::default());
        s.handle(caps(1024, 768)).unwrap();
        out.drain();

        s.geometry_changed(800, 600, 24).unwrap();
        assert_eq!(s.display().geometry.map(|g| g.width), Some(800));
        assert!(matches!(
            out.drain().as_slice(),
            [ServerMessage::FramebufferInfo(FramebufferInfo { width: 800, height: 600, .. })]
        ));

        // unchanged geometry is a no-op
        s.geometry_changed(800, 600, 24).unwrap();
        assert!(out.drain().is_empty());
        assert_eq!(s.frame().generation(), 2);
    }

    #[test]
    fn cursor_and_bell_wait_for_activation() {
        let (mut s, out) = session(SessionConfig::default());
        out.drain();
        let cursor = CursorImage::argb(2, 2, (0, 0), vec![0xFF00_0000; 4]);
        s.cursor_changed(Some(cursor)).unwrap();
        s.bell(440, 100).unwrap();
        assert!(out.drain().is_empty());

        s.handle(caps(1024, 768)).unwrap();
        let sent = out.drain();
        assert!(matches!(sent.last(), Some(ServerMessage::SetPointer(_))));

        s.bell(440, 100).unwrap();
        assert_eq!(
            out.drain(),
            vec![ServerMessage::Beep(Beep {
                frequency: 440,
                duration: 100
            })]
        );
    }

    #[test]
    fn prompt_reply_only_for_same_connection() {
        let (mut s, out) = session(SessionConfig::default());
        s.handle(ClientMessage::MessageRequest(MessageRequest {
            message_id: 4,
            message_type: 1,
            style: 0,
            timeout: 0,
            parameters: (0..8).map(|i| i.to_string()).collect(),
        }))
        .unwrap();
        let pending = s.take_prompt_requests();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request.parameters.len(), MAX_MESSAGE_PARAMETERS);
        out.drain();

        s.complete_prompt(pending[0].connection, 4, 1).unwrap();
        assert_eq!(
            out.drain(),
            vec![ServerMessage::MessageReply(MessageReply {
                message_id: 4,
                result: 1
            })]
        );

        s.disconnect();
        let out2 = Outbox::default();
        s.accept(Box::new(out2.clone())).unwrap();
        out2.drain();
        s.complete_prompt(pending[0].connection, 4, 1).unwrap();
        assert!(out2.drain().is_empty());
    }
}
