//! HTTP boundary between the bot and the chat-platform bridge.
//!
//! The bridge is a small service holding the platform session. It pushes
//! member events and slash commands to [`GatewayServer`], and the bot calls
//! back through [`BridgeClient`] for membership actions, messages, mail and
//! confirmation prompts.

pub mod client;
pub mod error;
pub mod server;
pub mod shutdown;
pub mod wire;

pub use client::BridgeClient;
pub use error::GatewayError;
pub use server::GatewayServer;
pub use shutdown::ShutdownController;
