//! Buddy 核心库
//!
//! 可重连的 WebSocket 分发客户端：维持到后端的单一连接，
//! 把入站 JSON 消息分发给回调，并发送 `{text, speaker}` 消息

pub mod client;
pub mod envelope;
pub mod error;
pub mod listener;
pub mod policy;
pub mod state;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{ClientConfig, DEFAULT_URL, DispatchClient};
pub use envelope::{DEFAULT_SPEAKER, InboundEnvelope, NEUTRAL_EMOTION, OutboundEnvelope};
pub use error::ClientError;
pub use listener::{Listener, ListenerRegistry, listener};
pub use policy::{DEFAULT_RECONNECT_DELAY, ReconnectPolicy};
pub use state::ConnectionState;
pub use transport::{Connection, Connector, TungsteniteConnection, TungsteniteConnector, WsMessage};
