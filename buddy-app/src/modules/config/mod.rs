//! 配置模块

pub mod manager;

pub use manager::{
    AudioSettings, ConfigManager, ReconnectSettings, SERVER_URL_ENV, ServerSettings, UserConfig,
};
