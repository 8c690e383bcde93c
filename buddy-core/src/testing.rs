//! 测试用的脚本化连接器

use crate::error::ClientError;
use crate::transport::{Connection, Connector, WsMessage};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// 按预置顺序返回连接或错误；队列为空时连接一直挂起
#[derive(Clone)]
pub(crate) struct ScriptedConnector {
    sessions: Arc<Mutex<VecDeque<Result<ScriptedConnection, ClientError>>>>,
    attempt_tx: mpsc::UnboundedSender<Instant>,
    attempt_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<Instant>>>>,
}

impl ScriptedConnector {
    pub(crate) fn new() -> Self {
        let (attempt_tx, attempt_rx) = mpsc::unbounded_channel();
        Self {
            sessions: Arc::new(Mutex::new(VecDeque::new())),
            attempt_tx,
            attempt_rx: Arc::new(Mutex::new(Some(attempt_rx))),
        }
    }

    /// 每次连接尝试的时间点，只能取一次
    pub(crate) fn attempts(&self) -> mpsc::UnboundedReceiver<Instant> {
        self.attempt_rx
            .lock()
            .take()
            .expect("attempts receiver already taken")
    }

    pub(crate) fn push_session(&self) -> ServerHandle {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.sessions.lock().push_back(Ok(ScriptedConnection {
            inbound: inbound_rx,
            outbound: outbound_tx,
        }));
        ServerHandle {
            inbound: inbound_tx,
            outbound: outbound_rx,
        }
    }

    pub(crate) fn push_failure(&self, error: ClientError) {
        self.sessions.lock().push_back(Err(error));
    }
}

impl Connector for ScriptedConnector {
    type Connection = ScriptedConnection;

    async fn connect(&self, _url: &str) -> Result<ScriptedConnection, ClientError> {
        let _ = self.attempt_tx.send(Instant::now());
        let next = self.sessions.lock().pop_front();
        match next {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

pub(crate) struct ScriptedConnection {
    inbound: mpsc::UnboundedReceiver<WsMessage>,
    outbound: mpsc::UnboundedSender<String>,
}

impl Connection for ScriptedConnection {
    async fn send_text(&mut self, text: String) -> Result<(), ClientError> {
        self.outbound
            .send(text)
            .map_err(|_| ClientError::TransportError("peer went away".to_string()))
    }

    async fn recv(&mut self) -> Option<Result<WsMessage, ClientError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.inbound.close();
    }
}

/// 模拟的服务端一侧；丢弃即断开
pub(crate) struct ServerHandle {
    inbound: mpsc::UnboundedSender<WsMessage>,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl ServerHandle {
    pub(crate) fn send(&self, message: WsMessage) {
        let _ = self.inbound.send(message);
    }

    pub(crate) fn send_text(&self, text: &str) {
        self.send(WsMessage::Text(text.to_string()));
    }

    pub(crate) fn close(&self, reason: &str) {
        self.send(WsMessage::Close(Some(reason.to_string())));
    }

    /// 客户端写出的下一帧
    pub(crate) async fn recv(&mut self) -> Option<String> {
        self.outbound.recv().await
    }
}
