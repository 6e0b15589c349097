//! Stateless webhook service for the persona buttons.
//!
//! Two callback endpoints invoked by the chat platform, plus a liveness
//! probe:
//! - `POST /slash` - slash command, returns the button prompt payload
//! - `POST /actions` - button click, resolves the action id to a reply
//! - `GET /health` - fixed `{"status":"ok"}`
//!
//! Every request is independent; nothing persists between calls and no
//! outbound requests are made.

pub mod health;
pub mod routes;

pub use routes::{router, WebhookState};
