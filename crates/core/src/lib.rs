//! Shared foundation for the gander workspace.
//!
//! - `config` - TOML + environment configuration with secret handling
//! - `logging` - tracing subscriber setup shared by both binaries
//! - `personas` - canonical button ids, labels, and reply text
//! - `attachments` - interactive button attachment wire model
//!
//! Both deployable components (`gander-bot`, `gander-webhook`) depend on
//! this crate and on nothing of each other.

pub mod attachments;
pub mod config;
pub mod logging;
pub mod personas;

pub use attachments::{persona_prompt_attachment, ButtonAction, ButtonStyle, MessageAttachment};
pub use config::{AppConfig, ConfigError, LoadOptions, LogFormat};
pub use personas::resolve_action;
