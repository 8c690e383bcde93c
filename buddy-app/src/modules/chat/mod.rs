//! 聊天界面模型

pub mod transcript;

pub use transcript::{BUDDY_SENDER, ChatMessage, Transcript, USER_SENDER};
