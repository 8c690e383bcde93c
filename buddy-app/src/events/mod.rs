//! 事件模块
//!
//! 把网络消息、客户端报告、连接状态和终端输入汇成一条事件流，
//! 由 `ChatSession` 逐个处理

use crate::commands::{Command, HELP};
use crate::error::AppError;
use crate::modules::audio::{AudioCache, AudioPlayer};
use crate::modules::chat::{ChatMessage, Transcript};
use buddy_core::{ClientError, ConnectionState, Connector, DispatchClient, InboundEnvelope};
use auto_impl::auto_impl;
use std::io::{BufRead, Write};
use tokio::sync::{broadcast, mpsc, watch};

/// 应用事件
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Inbound(InboundEnvelope),
    Report(ClientError),
    StateChanged(ConnectionState),
    Input(Command),
    InputClosed,
}

/// 事件处理后是否继续
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// 发送端抽象，便于在测试中替换客户端
#[auto_impl(&, Arc)]
pub trait Outbox: Send + Sync {
    fn send_as(&self, text: &str, speaker: &str) -> Result<(), ClientError>;

    fn state(&self) -> ConnectionState;

    fn url(&self) -> &str;
}

impl<C: Connector> Outbox for DispatchClient<C> {
    fn send_as(&self, text: &str, speaker: &str) -> Result<(), ClientError> {
        DispatchClient::send_as(self, text, speaker)
    }

    fn state(&self) -> ConnectionState {
        DispatchClient::state(self)
    }

    fn url(&self) -> &str {
        DispatchClient::url(self)
    }
}

/// 聊天会话
pub struct ChatSession<O, W> {
    outbox: O,
    speaker: String,
    transcript: Transcript,
    cache: AudioCache,
    player: Box<dyn AudioPlayer>,
    autoplay: bool,
    out: W,
}

impl<O: Outbox, W: Write> ChatSession<O, W> {
    pub fn new(
        outbox: O,
        speaker: impl Into<String>,
        cache: AudioCache,
        player: Box<dyn AudioPlayer>,
        autoplay: bool,
        out: W,
    ) -> Self {
        Self {
            outbox,
            speaker: speaker.into(),
            transcript: Transcript::default(),
            cache,
            player,
            autoplay,
            out,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// 处理一个事件
    pub async fn handle(&mut self, event: AppEvent) -> Flow {
        match event {
            AppEvent::Inbound(envelope) => {
                self.show(ChatMessage::from_buddy(&envelope));
                self.play_audio(&envelope).await;
            }
            AppEvent::Report(error) => self.on_report(error),
            AppEvent::StateChanged(state) => self.status(&format!("Connection {}", state)),
            AppEvent::Input(command) => return self.on_command(command),
            AppEvent::InputClosed => {
                tracing::info!("Input closed, exiting");
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    /// 释放播放句柄
    pub fn close(&mut self) {
        self.player.unload();
    }

    fn on_command(&mut self, command: Command) -> Flow {
        match command {
            Command::Say(text) => match self.outbox.send_as(&text, &self.speaker) {
                Ok(()) => self.show(ChatMessage::from_user(text)),
                Err(e) => self.error(AppError::from(e)),
            },
            Command::Status => {
                let line = format!("{} ({})", self.outbox.state(), self.outbox.url());
                self.status(&line);
            }
            Command::Help => self.print(HELP),
            Command::Quit => return Flow::Exit,
        }
        Flow::Continue
    }

    fn on_report(&mut self, error: ClientError) {
        match error {
            // 非 JSON 帧按纯文本显示
            ClientError::MalformedPayload { raw, .. } => {
                self.show(ChatMessage::from_buddy(&InboundEnvelope::plain_text(raw)));
            }
            // 发送时即被拒绝的消息已在输入处理中提示
            ClientError::SendWhileDisconnected(_) => {}
            other => self.error(AppError::from(other)),
        }
    }

    async fn play_audio(&mut self, envelope: &InboundEnvelope) {
        if !envelope.has_audio() {
            return;
        }

        let path = match self.cache.store(envelope).await {
            Ok(Some(path)) => path,
            Ok(None) => return,
            Err(e) => {
                tracing::error!("Failed to save audio: {}", e);
                return;
            }
        };

        if !self.autoplay {
            return;
        }
        if let Err(e) = self.player.play(&path) {
            let error = AppError::from(e);
            tracing::error!(code = %error.code(), "{}", error);
        }
    }

    fn show(&mut self, message: ChatMessage) {
        let line = self.transcript.push(message).to_string();
        self.print(&line);
    }

    fn status(&mut self, line: &str) {
        self.print(&format!("* {}", line));
    }

    fn error(&mut self, error: AppError) {
        self.print(&format!("! [{}] {}", error.code(), error));
    }

    fn print(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            tracing::warn!("Failed to write output: {}", e);
        }
    }
}

/// 转发客户端报告
pub async fn forward_reports(
    mut reports: broadcast::Receiver<ClientError>,
    tx: mpsc::UnboundedSender<AppEvent>,
) {
    loop {
        match reports.recv().await {
            Ok(error) => {
                if tx.send(AppEvent::Report(error)).is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Skipped {} client reports", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// 转发连接状态变化
pub async fn forward_state(
    mut state: watch::Receiver<ConnectionState>,
    tx: mpsc::UnboundedSender<AppEvent>,
) {
    while state.changed().await.is_ok() {
        let current = *state.borrow_and_update();
        if tx.send(AppEvent::StateChanged(current)).is_err() {
            break;
        }
    }
}

/// 逐行读取输入，读完后发送 `InputClosed`
///
/// 阻塞读取，需在独立线程中运行
pub fn forward_input<R: BufRead>(reader: R, tx: mpsc::UnboundedSender<AppEvent>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to read input: {}", e);
                break;
            }
        };
        let Some(command) = Command::parse(&line) else {
            continue;
        };
        if tx.send(AppEvent::Input(command)).is_err() {
            return;
        }
    }
    let _ = tx.send(AppEvent::InputClosed);
}
