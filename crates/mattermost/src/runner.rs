use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::events::{parse_frame, PostHandler, StreamEvent};
use crate::transport::{StreamTransport, TransportError};

/// Supervises the event stream: connect, authenticate, pump frames, and on
/// any failure or close wait a fixed delay and reconnect. Never gives up;
/// the process's steady state lives here until an external signal kills it.
pub struct RealtimeRunner {
    transport: Arc<dyn StreamTransport>,
    handler: Arc<dyn PostHandler>,
    reconnect_delay: Duration,
}

impl RealtimeRunner {
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        handler: Arc<dyn PostHandler>,
        reconnect_delay: Duration,
    ) -> Self {
        Self { transport, handler, reconnect_delay }
    }

    pub async fn run(&self) {
        loop {
            match self.connect_and_pump().await {
                Ok(()) => {
                    info!(
                        event_name = "ingress.stream.disconnected",
                        delay_secs = self.reconnect_delay.as_secs(),
                        "event stream closed, reconnecting after delay"
                    );
                }
                Err(error) => {
                    warn!(
                        event_name = "ingress.stream.failed",
                        error = %error,
                        delay_secs = self.reconnect_delay.as_secs(),
                        "event stream failed, reconnecting after delay"
                    );
                }
            }

            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// Runs one connection to completion. Per-frame problems are contained
    /// here; only connection-level failures propagate to the retry loop.
    async fn connect_and_pump(&self) -> Result<(), TransportError> {
        self.transport.connect().await?;

        loop {
            let Some(frame) = self.transport.next_frame().await? else {
                return Ok(());
            };

            match parse_frame(&frame) {
                Err(error) => {
                    warn!(
                        event_name = "ingress.stream.frame_rejected",
                        error = %error,
                        "skipping malformed frame"
                    );
                }
                Ok(StreamEvent::Hello) => {
                    info!(
                        event_name = "ingress.stream.authenticated",
                        "event stream connected and authenticated"
                    );
                }
                Ok(StreamEvent::Unsupported { event_type }) => {
                    debug!(event_type = %event_type, "ignoring event");
                }
                Ok(StreamEvent::Posted(post)) => {
                    if let Err(error) = self.handler.handle_post(&post).await {
                        error!(
                            event_name = "ingress.stream.handler_failed",
                            error = %error,
                            channel_id = %post.channel_id,
                            "post handler failed, continuing stream"
                        );
                    }
                }
            }
        }
    }
}
