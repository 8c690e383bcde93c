//! WebSocket 传输层
//!
//! 使用 tokio-tungstenite 实现；通过 [`Connector`] trait 抽象，便于替换

use crate::error::ClientError;
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// 默认连接超时
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// WebSocket 消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    /// 对端关闭，附带关闭原因
    Close(Option<String>),
}

/// 建立连接
pub trait Connector: Send + Sync + 'static {
    type Connection: Connection;

    fn connect(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Self::Connection, ClientError>> + Send;
}

/// 一条已建立的连接
pub trait Connection: Send + 'static {
    /// 发送文本帧
    fn send_text(&mut self, text: String) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// 接收下一帧，`None` 表示流已结束
    fn recv(&mut self) -> impl Future<Output = Option<Result<WsMessage, ClientError>>> + Send;

    /// 主动关闭
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// tokio-tungstenite 连接器
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    connect_timeout: Duration,
}

impl Default for TungsteniteConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl TungsteniteConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Connector for TungsteniteConnector {
    type Connection = TungsteniteConnection;

    async fn connect(&self, url: &str) -> Result<TungsteniteConnection, ClientError> {
        match tokio::time::timeout(self.connect_timeout, connect_async(url)).await {
            Ok(Ok((stream, response))) => {
                tracing::debug!(status = %response.status(), "WebSocket handshake completed");
                Ok(TungsteniteConnection { stream })
            }
            Ok(Err(e)) => Err(ClientError::ConnectionFailed(e.to_string())),
            Err(_) => Err(ClientError::ConnectionFailed(
                "Connection timed out".to_string(),
            )),
        }
    }
}

/// tokio-tungstenite 连接
#[derive(Debug)]
pub struct TungsteniteConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connection for TungsteniteConnection {
    async fn send_text(&mut self, text: String) -> Result<(), ClientError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ClientError::TransportError(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<WsMessage, ClientError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(ClientError::TransportError(e.to_string()))),
            };

            let frame = match message {
                Message::Text(text) => WsMessage::Text(text.as_str().to_string()),
                Message::Binary(data) => WsMessage::Binary(data.to_vec()),
                Message::Ping(data) => WsMessage::Ping(data.to_vec()),
                Message::Pong(data) => WsMessage::Pong(data.to_vec()),
                Message::Close(frame) => {
                    WsMessage::Close(frame.map(|f| f.reason.as_str().to_string()))
                }
                Message::Frame(_) => continue,
            };
            return Some(Ok(frame));
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!("WebSocket close failed: {}", e);
        }
    }
}
