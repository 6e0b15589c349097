//! Mattermost integration - realtime client interface
//!
//! This crate provides the realtime side of gander:
//! - **REST client** (`client`) - `/api/v4` calls with bearer auth
//! - **Stream transport** (`transport`) - WebSocket connect + auth challenge
//! - **Events** (`events`) - frame parsing and the post handler
//! - **Runner** (`runner`) - the reconnect-forever supervision loop
//!
//! # Key Types
//!
//! - `RealtimeRunner` - stream loop with fixed-delay reconnection
//! - `StreamTransport` - trait seam between the loop and the wire
//! - `PersonaBot` - the production post handler
//! - `MattermostClient` - thin REST client, one pool per process

pub mod client;
pub mod events;
pub mod runner;
pub mod transport;

pub use client::{ChatApi, ClientError, MattermostClient, User};
pub use events::{parse_frame, HandlerOutcome, PersonaBot, Post, PostHandler, StreamEvent};
pub use runner::RealtimeRunner;
pub use transport::{stream_url, StreamTransport, TransportError, WebSocketTransport};
