//! Buddy 应用模块
//!
//! 配置、音频缓存与播放、聊天记录

pub mod audio;
pub mod chat;
pub mod config;
