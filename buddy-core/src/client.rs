//! 可重连的分发客户端
//!
//! 客户端持有唯一的后台任务，由它独占当前连接：
//! - 入站文本帧解析为 JSON 后先交给主回调，再按注册顺序交给监听器
//! - 出站消息经由通道交给后台任务，仅在连接打开时写出
//! - 连接关闭或建立失败后按 [`ReconnectPolicy`] 等待并重连

use crate::envelope::{DEFAULT_SPEAKER, OutboundEnvelope};
use crate::error::ClientError;
use crate::listener::{self, Listener, ListenerRegistry};
use crate::policy::ReconnectPolicy;
use crate::state::ConnectionState;
use crate::transport::{
    Connection, Connector, DEFAULT_CONNECT_TIMEOUT, TungsteniteConnector, WsMessage,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 默认服务端地址
pub const DEFAULT_URL: &str = "ws://127.0.0.1:8000/ws";

const REPORT_CHANNEL_CAPACITY: usize = 64;

/// 客户端配置
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 服务器 URL
    pub url: String,
    /// 连接超时
    pub connect_timeout: Duration,
    /// 重连策略
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// 正在运行的后台任务
struct Lifecycle {
    handle: JoinHandle<()>,
    shutdown: Arc<Notify>,
    outbound_tx: mpsc::UnboundedSender<String>,
}

/// 可重连的分发客户端
pub struct DispatchClient<C: Connector = TungsteniteConnector> {
    config: ClientConfig,
    connector: Arc<C>,
    listeners: ListenerRegistry,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    report_tx: broadcast::Sender<ClientError>,
    lifecycle: Mutex<Option<Lifecycle>>,
}

impl DispatchClient<TungsteniteConnector> {
    /// 使用 tokio-tungstenite 连接器创建客户端
    pub fn new(config: ClientConfig) -> Self {
        let connector = TungsteniteConnector::new(config.connect_timeout);
        Self::with_connector(config, connector)
    }
}

impl<C: Connector> DispatchClient<C> {
    pub fn with_connector(config: ClientConfig, connector: C) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (report_tx, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);

        Self {
            config,
            connector: Arc::new(connector),
            listeners: ListenerRegistry::new(),
            state_tx: Arc::new(state_tx),
            report_tx,
            lifecycle: Mutex::new(None),
        }
    }

    /// 启动连接生命周期
    ///
    /// `on_message` 在所有监听器之前收到每条消息；重连时沿用同一个回调。
    /// 必须在 tokio 运行时内调用
    pub fn connect(&self, on_message: Option<Listener>) -> Result<(), ClientError> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.as_ref().is_some_and(|l| !l.handle.is_finished()) {
            return Err(ClientError::AlreadyStarted);
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(Notify::new());

        let worker = Worker {
            url: self.config.url.clone(),
            policy: self.config.reconnect.clone(),
            connector: self.connector.clone(),
            listeners: self.listeners.clone(),
            on_message,
            state_tx: self.state_tx.clone(),
            report_tx: self.report_tx.clone(),
            outbound_rx,
            shutdown: shutdown.clone(),
        };

        let handle = tokio::spawn(worker.run());
        *lifecycle = Some(Lifecycle {
            handle,
            shutdown,
            outbound_tx,
        });
        Ok(())
    }

    /// 以默认发言人发送文本
    pub fn send(&self, text: &str) -> Result<(), ClientError> {
        self.send_as(text, DEFAULT_SPEAKER)
    }

    /// 发送 `{text, speaker}`
    ///
    /// 未连接时丢弃，不排队也不重试
    pub fn send_as(&self, text: &str, speaker: &str) -> Result<(), ClientError> {
        let payload = OutboundEnvelope::new(text, speaker).to_json()?;

        let queued = if self.state().is_open() {
            self.lifecycle
                .lock()
                .as_ref()
                .is_some_and(|l| l.outbound_tx.send(payload).is_ok())
        } else {
            false
        };

        if queued {
            Ok(())
        } else {
            warn!("WebSocket not ready, message dropped: {}", text);
            let error = ClientError::SendWhileDisconnected(text.to_string());
            let _ = self.report_tx.send(error.clone());
            Err(error)
        }
    }

    pub fn add_listener(&self, listener: Listener) {
        self.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Listener) {
        self.listeners.remove(listener);
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// 当前连接状态
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// 订阅连接状态变化
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// 订阅错误报告
    pub fn reports(&self) -> broadcast::Receiver<ClientError> {
        self.report_tx.subscribe()
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// 后台任务是否仍在运行
    pub fn is_running(&self) -> bool {
        self.lifecycle
            .lock()
            .as_ref()
            .is_some_and(|l| !l.handle.is_finished())
    }

    /// 关闭当前连接并停止重连
    pub async fn shutdown(&self) {
        let Some(lifecycle) = self.lifecycle.lock().take() else {
            return;
        };

        lifecycle.shutdown.notify_one();
        if let Err(e) = lifecycle.handle.await {
            error!("Dispatch task ended abnormally: {}", e);
        }
        self.state_tx.send_replace(ConnectionState::Disconnected);
        info!("Dispatch client stopped");
    }
}

impl<C: Connector> Drop for DispatchClient<C> {
    fn drop(&mut self) {
        if let Some(lifecycle) = self.lifecycle.get_mut().take() {
            lifecycle.handle.abort();
        }
    }
}

/// 单次连接结束的原因
enum SessionEnd {
    Closed(Option<String>),
    Shutdown,
}

/// 后台任务
struct Worker<C: Connector> {
    url: String,
    policy: ReconnectPolicy,
    connector: Arc<C>,
    listeners: ListenerRegistry,
    on_message: Option<Listener>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    report_tx: broadcast::Sender<ClientError>,
    outbound_rx: mpsc::UnboundedReceiver<String>,
    shutdown: Arc<Notify>,
}

impl<C: Connector> Worker<C> {
    async fn run(mut self) {
        // 自上次成功打开以来的连续重连次数
        let mut attempt: u32 = 0;

        loop {
            self.set_state(ConnectionState::Connecting);
            info!(url = %self.url, attempt, "Connecting to Buddy backend");

            let connected = tokio::select! {
                result = self.connector.connect(&self.url) => result,
                _ = self.shutdown.notified() => break,
            };

            match connected {
                Ok(connection) => {
                    attempt = 0;
                    self.set_state(ConnectionState::Open);
                    info!("WebSocket connected to {}", self.url);

                    let end = self.session(connection).await;
                    self.set_state(ConnectionState::Disconnected);
                    self.discard_pending();

                    match end {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Closed(reason) => {
                            self.report(ClientError::ConnectionClosed(reason));
                        }
                    }
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    self.set_state(ConnectionState::Disconnected);
                    self.report(e);
                }
            }

            attempt = attempt.saturating_add(1);
            let Some(delay) = self.policy.delay_for(attempt) else {
                warn!(attempts = attempt - 1, "Reconnect attempts exhausted, giving up");
                break;
            };

            warn!("WebSocket disconnected. Retrying in {:?}...", delay);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.notified() => break,
            }
        }

        self.set_state(ConnectionState::Disconnected);
        self.discard_pending();
    }

    /// 驱动一条连接直到关闭或收到停止信号
    ///
    /// 依次检查停止信号、入站帧、出站消息；对端已关闭时排队中的消息不再写出
    async fn session(&mut self, mut connection: C::Connection) -> SessionEnd {
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    connection.close().await;
                    return SessionEnd::Shutdown;
                }
                frame = connection.recv() => match frame {
                    Some(Ok(WsMessage::Text(text))) => self.dispatch_text(&text),
                    Some(Ok(WsMessage::Binary(data))) => self.dispatch_bytes(&data),
                    Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => {}
                    Some(Ok(WsMessage::Close(reason))) => return SessionEnd::Closed(reason),
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        self.report(e);
                        return SessionEnd::Closed(None);
                    }
                    None => return SessionEnd::Closed(None),
                },
                Some(payload) = self.outbound_rx.recv() => {
                    debug!(bytes = payload.len(), "Sending frame");
                    if let Err(e) = connection.send_text(payload).await {
                        error!("WebSocket error: {}", e);
                        self.report(e);
                        connection.close().await;
                        return SessionEnd::Closed(None);
                    }
                }
            }
        }
    }

    fn dispatch_text(&self, text: &str) {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.deliver(&value),
            Err(e) => self.reject(text.to_string(), e),
        }
    }

    fn dispatch_bytes(&self, data: &[u8]) {
        match serde_json::from_slice::<Value>(data) {
            Ok(value) => self.deliver(&value),
            Err(e) => self.reject(String::from_utf8_lossy(data).into_owned(), e),
        }
    }

    fn deliver(&self, value: &Value) {
        if let Some(on_message) = &self.on_message {
            listener::invoke(on_message, value);
        }
        let count = self.listeners.dispatch(value);
        debug!(listeners = count, "Dispatched inbound message");
    }

    fn reject(&self, raw: String, e: serde_json::Error) {
        error!("Invalid WS message: {}", e);
        self.report(ClientError::MalformedPayload {
            raw,
            reason: e.to_string(),
        });
    }

    /// 连接断开时，尚未写出的消息全部丢弃
    fn discard_pending(&mut self) {
        while let Ok(payload) = self.outbound_rx.try_recv() {
            let text = serde_json::from_str::<OutboundEnvelope>(&payload)
                .map(|envelope| envelope.text)
                .unwrap_or(payload);
            warn!("Connection lost before sending, message dropped: {}", text);
            self.report(ClientError::SendDiscarded(text));
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                debug!(from = %current, to = %state, "Connection state changed");
                *current = state;
                true
            }
        });
    }

    fn report(&self, error: ClientError) {
        // 没有订阅者时直接忽略
        let _ = self.report_tx.send(error);
    }
}
