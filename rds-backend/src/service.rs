//! Backend service core: the single-threaded control loop.
//!
//! One loop owns the [`SessionController`] and waits on the stop signal,
//! the listener (only while no client is connected), the client's framed
//! stream, finished prompts and the render tick. Messages the session
//! queues are written to the client after every event.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::FuturesUnordered;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use rds_core::{
    ClientMessage, LocalBufferPool, PendingPrompt, Prompt, RdsError, ServerCodec,
    ServerMessage, SessionController,
};

use crate::config::BackendConfig;
use crate::display::{SoftwareDisplay, SoftwareRenderer, arrow_cursor};
use crate::input::SoftwareInput;
use crate::prompt::CommandPrompt;

type Session = SessionController<LocalBufferPool, SoftwareInput, SoftwareDisplay>;

/// The client currently attached to the session.
struct Client {
    peer: SocketAddr,
    framed: Framed<TcpStream, ServerCodec>,
    outbound: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Client {
    /// Write everything the session queued.
    async fn write_outbound(&mut self) -> Result<(), RdsError> {
        let mut written = 0usize;
        while let Ok(message) = self.outbound.try_recv() {
            self.framed.feed(message).await?;
            written += 1;
        }
        if written > 0 {
            self.framed.flush().await?;
        }
        Ok(())
    }
}

// ── BackendService ───────────────────────────────────────────────

pub struct BackendService {
    config: BackendConfig,
    running: Arc<AtomicBool>,
}

impl BackendService {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bind the configured address and run until stopped.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(&self.config.network.listen_addr).await?;
        self.serve(listener).await
    }

    /// Run the control loop on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
        self.running.store(true, Ordering::SeqCst);
        info!("backend listening on {}", listener.local_addr()?);

        let provider =
            LocalBufferPool::auto(self.config.sync.buffer_max_rects, self.config.sync.buffer_slack);
        let mut session: Session = SessionController::new(
            self.config.to_session_config(),
            provider,
            SoftwareInput::new(),
            SoftwareDisplay::new(),
        )?;
        session.cursor_changed(Some(arrow_cursor()))?;

        let prompt: Option<Arc<dyn Prompt>> = self
            .config
            .prompt
            .enabled
            .then(|| Arc::new(CommandPrompt::new(&self.config.prompt.program)) as Arc<dyn Prompt>);

        let mut renderer = SoftwareRenderer::new();
        let mut tick = tokio::time::interval(self.config.tick());
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut prompts = FuturesUnordered::new();
        let mut client: Option<Client> = None;

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = Self::wait_for_stop(&self.running) => break,

                accepted = listener.accept(), if client.is_none() => match accepted {
                    Ok((stream, peer)) => {
                        let (tx, outbound) = mpsc::unbounded_channel();
                        match session.accept(Box::new(tx)) {
                            Ok(()) => {
                                info!("client connected from {peer}");
                                client = Some(Client {
                                    peer,
                                    framed: Framed::new(stream, ServerCodec::new()),
                                    outbound,
                                });
                            }
                            Err(e) => warn!("rejecting {peer}: {e}"),
                        }
                    }
                    Err(e) => warn!("accept error: {e}"),
                },

                message = Self::next_message(&mut client) => match message {
                    Some(Ok(message)) => {
                        // Fatal errors already disconnected the session.
                        let _ = session.handle(message);
                    }
                    Some(Err(e)) => session.transport_error(&e),
                    None => {
                        debug!("client closed the connection");
                        session.disconnect();
                    }
                },

                Some((connection, message_id, result)) = prompts.next(), if !prompts.is_empty() => {
                    let _ = session.complete_prompt(connection, message_id, result);
                }

                _ = tick.tick() => {
                    for rect in renderer.render(session.frame_mut()) {
                        session.report_damage(rect);
                    }
                    let _ = session.flush();
                }
            }

            for pending in session.take_prompt_requests() {
                prompts.push(Self::run_prompt(prompt.clone(), pending));
            }

            if let Some(c) = client.as_mut()
                && let Err(e) = c.write_outbound().await
            {
                session.transport_error(&e);
            }

            if session.state().is_idle()
                && let Some(c) = client.take()
            {
                info!("session with {} ended", c.peer);
            }
        }

        session.disconnect();
        self.running.store(false, Ordering::SeqCst);
        info!("backend service stopped after {} frames", renderer.frames());
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────

    /// Next message from the client; pending forever without one.
    async fn next_message(client: &mut Option<Client>) -> Option<Result<ClientMessage, RdsError>> {
        match client {
            Some(c) => c.framed.next().await,
            None => std::future::pending().await,
        }
    }

    async fn run_prompt(
        prompt: Option<Arc<dyn Prompt>>,
        pending: PendingPrompt,
    ) -> (u64, u32, i32) {
        let message_id = pending.request.message_id;
        let result = match prompt {
            Some(prompt) => prompt.show(pending.request).await,
            None => {
                warn!(message_id, "prompts are disabled");
                -1
            }
        };
        (pending.connection, message_id, result)
    }

    /// Async helper: resolves when `running` becomes false.
    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use rds_core::ClientCodec;
    use rds_core::protocol::{Capabilities, MessageReply, MessageRequest, SyncRequest};

    #[test]
    fn service_creates_with_defaults() {
        let svc = BackendService::new(BackendConfig::default());
        assert!(!svc.is_running());
    }

    #[test]
    fn stop_handle_works() {
        let svc = BackendService::new(BackendConfig::default());
        let handle = svc.stop_handle();
        handle.store(true, Ordering::SeqCst);
        assert!(svc.is_running());
        svc.stop();
        assert!(!svc.is_running());
    }

    async fn next(framed: &mut Framed<TcpStream, ClientCodec>) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(5), framed.next())
            .await
            .expect("timeout")
            .expect("stream closed")
            .expect("decode")
    }

    #[tokio::test]
    async fn serves_a_client_session() {
        let mut config = BackendConfig::default();
        config.display.width = 320;
        config.display.height = 200;
        config.prompt.enabled = false;
        let svc = BackendService::new(config);
        let stop = svc.stop_handle();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            let mut framed = Framed::new(stream, ClientCodec::new());
            assert!(matches!(next(&mut framed).await, ServerMessage::Version(_)));

            framed
                .send(ClientMessage::Capabilities(Capabilities {
                    width: 320,
                    height: 200,
                    keyboard_layout: 0x0409,
                    keyboard_type: 4,
                }))
                .await
                .unwrap();
            assert!(matches!(
                next(&mut framed).await,
                ServerMessage::FramebufferInfo(_)
            ));
            assert!(matches!(next(&mut framed).await, ServerMessage::SetPointer(_)));

            framed
                .send(ClientMessage::SyncRequest(SyncRequest { buffer_id: 1 }))
                .await
                .unwrap();
            assert!(matches!(next(&mut framed).await, ServerMessage::SyncReply(_)));

            framed
                .send(ClientMessage::MessageRequest(MessageRequest {
                    message_id: 9,
                    message_type: 1,
                    style: 0,
                    timeout: 0,
                    parameters: Vec::new(),
                }))
                .await
                .unwrap();
            loop {
                if let ServerMessage::MessageReply(reply) = next(&mut framed).await {
                    assert_eq!(
                        reply,
                        MessageReply {
                            message_id: 9,
                            result: -1
                        }
                    );
                    break;
                }
            }
            stop.store(false, Ordering::SeqCst);
        };

        let (served, ()) = tokio::join!(svc.serve(listener), client);
        served.unwrap();
        assert!(!svc.is_running());
    }
}
