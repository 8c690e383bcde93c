//! 音频模块
//!
//! 缓存后端下发的 mp3 并交给播放器

pub mod cache;
pub mod player;

pub use cache::{AudioCache, LATEST_FILE};
pub use player::{AudioPlayer, CommandPlayer, SilentPlayer, player_for};
