//! 聊天记录

use buddy_core::InboundEnvelope;
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::fmt;

/// 后端消息的显示名
pub const BUDDY_SENDER: &str = "Buddy";

/// 本地输入的显示名
pub const USER_SENDER: &str = "You";

/// 默认保留的消息条数
pub const DEFAULT_CAPACITY: usize = 200;

/// 一条聊天消息
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub sender: String,
    pub text: String,
    pub emotion: Option<String>,
    pub timestamp: DateTime<Local>,
}

impl ChatMessage {
    pub fn new(sender: impl Into<String>, text: impl Into<String>, emotion: Option<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            emotion,
            timestamp: Local::now(),
        }
    }

    /// 后端回复
    pub fn from_buddy(envelope: &InboundEnvelope) -> Self {
        Self::new(BUDDY_SENDER, envelope.text.clone(), envelope.emotion.clone())
    }

    pub fn from_user(text: impl Into<String>) -> Self {
        Self::new(USER_SENDER, text, None)
    }

    /// `<sender> (<emotion>): <text>`，没有情绪时省略括号
    pub fn render(&self) -> String {
        match self.emotion.as_deref().filter(|e| !e.is_empty()) {
            Some(emotion) => format!("{} ({}): {}", self.sender, emotion, self.text),
            None => format!("{}: {}", self.sender, self.text),
        }
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.render())
    }
}

/// 滚动消息列表，超出容量时丢弃最旧的消息
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl Transcript {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn latest(&self) -> Option<&ChatMessage> {
        self.messages.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
