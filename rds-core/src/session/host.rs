//! Collaborators the session talks to: the outbound message channel, the
//! display host and the external prompt.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::RdsError;
use crate::frame::Geometry;
use crate::message::ServerMessage;
use crate::protocol::MessageRequest;

// ── MessageSink ──────────────────────────────────────────────────

/// Outbound half of the client channel.
pub trait MessageSink {
    /// Queue a message for the client. An error means the channel is
    /// closed.
    fn send(&mut self, message: ServerMessage) -> Result<(), RdsError>;
}

impl MessageSink for VecDeque<ServerMessage> {
    fn send(&mut self, message: ServerMessage) -> Result<(), RdsError> {
        self.push_back(message);
        Ok(())
    }
}

impl MessageSink for mpsc::UnboundedSender<ServerMessage> {
    fn send(&mut self, message: ServerMessage) -> Result<(), RdsError> {
        mpsc::UnboundedSender::send(self, message)?;
        Ok(())
    }
}

// ── DisplayHost ──────────────────────────────────────────────────

/// The windowing side of the session.
pub trait DisplayHost {
    /// Switch the host keyboard to an XKB layout name such as `"de"`.
    fn apply_keyboard_layout(&mut self, layout: &str);

    /// The framebuffer was recreated with `geometry`.
    fn framebuffer_changed(&mut self, _geometry: &Geometry) {}
}

/// A display host that only remembers what it was told.
#[derive(Debug, Clone, Default)]
pub struct HeadlessDisplay {
    pub layout: Option<String>,
    pub geometry: Option<Geometry>,
}

impl DisplayHost for HeadlessDisplay {
    fn apply_keyboard_layout(&mut self, layout: &str) {
        self.layout = Some(layout.to_string());
    }

    fn framebuffer_changed(&mut self, geometry: &Geometry) {
        self.geometry = Some(*geometry);
    }
}

// ── Prompt ───────────────────────────────────────────────────────

/// Shows a message to the local user and resolves to the chosen answer,
/// `-1` when the prompt could not be shown.
#[async_trait]
pub trait Prompt: Send + Sync {
    async fn show(&self, request: MessageRequest) -> i32;
}

/// A prompt request waiting for the backend to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPrompt {
    /// Connection the answer belongs to.
    pub connection: u64,
    pub request: MessageRequest,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Beep;

    #[test]
    fn closed_channel_is_an_error() {
        let (mut tx, rx) = mpsc::unbounded_channel::<ServerMessage>();
        drop(rx);
        let err = MessageSink::send(&mut tx, ServerMessage::SetNullPointer).unwrap_err();
        assert!(matches!(err, RdsError::ChannelClosed));
    }

    #[tokio::test]
    async fn channel_sink_delivers() {
        let (mut tx, mut rx) = mpsc::unbounded_channel();
        let beep = ServerMessage::Beep(Beep {
            frequency: 440,
            duration: 100,
        });
        MessageSink::send(&mut tx, beep.clone()).unwrap();
        assert_eq!(rx.recv().await, Some(beep));
    }
}
