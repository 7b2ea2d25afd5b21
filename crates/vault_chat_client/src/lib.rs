//! Streaming chat client for the vault organizer API.
//! Decodes the `/chat/stream` SSE body into text tokens plus the conversation
//! id; also carries the YAML config used by the `vault-chat` CLI.

pub mod client;
pub mod config;
pub mod error;
pub mod messages;
pub mod sse;
pub mod stream;

pub use client::{Client, DEFAULT_BASE_URL};
pub use config::{default_config_path, ApiSection, ClientSection, Config, ConfigError};
pub use error::ClientError;
pub use messages::{
    ChatResponse, DashboardSummary, EventRecord, HealthStatus, HubNote, RecentNote, VaultInfo,
    VaultStats,
};
pub use stream::{ChatReply, ChatStream, TokenStream};
