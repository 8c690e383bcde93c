//! 配置管理器

use crate::error::ConfigError;
use arc_swap::ArcSwap;
use buddy_core::{ClientConfig, DEFAULT_SPEAKER, DEFAULT_URL, ReconnectPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// 配置目录名
pub const APP_DIR: &str = "buddy";

/// 覆盖服务器地址的环境变量
pub const SERVER_URL_ENV: &str = "BUDDY_SERVER_URL";

const CONFIG_FILE: &str = "config.toml";
const AUDIO_DIR: &str = "buddy_audio";

/// 服务器设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub url: String,
    /// 出站消息的 speaker 字段
    pub speaker: String,
    pub connect_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            speaker: DEFAULT_SPEAKER.to_string(),
            connect_timeout_secs: 30,
        }
    }
}

/// 重连设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    pub delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            delay_ms: 3000,
            multiplier: 1.0,
            max_delay_ms: 60_000,
            max_attempts: None,
        }
    }
}

impl ReconnectSettings {
    pub fn to_policy(&self) -> ReconnectPolicy {
        let policy = ReconnectPolicy::fixed(Duration::from_millis(self.delay_ms))
            .with_backoff(self.multiplier, Duration::from_millis(self.max_delay_ms));
        match self.max_attempts {
            Some(max) => policy.with_max_attempts(max),
            None => policy,
        }
    }
}

/// 音频设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// 缓存目录，默认在系统缓存目录下
    pub cache_dir: Option<PathBuf>,
    /// 播放命令及参数，文件路径追加在最后；为空则不播放
    pub player_command: Vec<String>,
    pub autoplay: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            cache_dir: None,
            player_command: Vec::new(),
            autoplay: true,
        }
    }
}

/// 用户配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UserConfig {
    pub server: ServerSettings,
    pub reconnect: ReconnectSettings,
    pub audio: AudioSettings,
}

impl UserConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.server.url.trim();
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ConfigError::ValidationFailed(format!(
                "server url must start with ws:// or wss://, got {:?}",
                self.server.url
            )));
        }
        if self.server.speaker.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "speaker must not be empty".to_string(),
            ));
        }
        if self.reconnect.delay_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "reconnect delay must be positive".to_string(),
            ));
        }
        if self.reconnect.multiplier.is_nan() || self.reconnect.multiplier < 1.0 {
            return Err(ConfigError::ValidationFailed(format!(
                "reconnect multiplier must be at least 1.0, got {}",
                self.reconnect.multiplier
            )));
        }
        Ok(())
    }

    /// 环境变量覆盖服务器地址
    pub fn apply_overrides(&mut self, server_url: Option<String>) {
        if let Some(url) = server_url.filter(|u| !u.trim().is_empty()) {
            tracing::info!("Server url overridden by {}: {}", SERVER_URL_ENV, url);
            self.server.url = url.trim().to_string();
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            url: self.server.url.trim().to_string(),
            connect_timeout: Duration::from_secs(self.server.connect_timeout_secs),
            reconnect: self.reconnect.to_policy(),
        }
    }

    pub fn audio_cache_dir(&self) -> PathBuf {
        self.audio.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(AUDIO_DIR)
        })
    }
}

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    config: ArcSwap<UserConfig>,
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        Self::new(config_dir)
    }
}

impl ConfigManager {
    pub fn new(config_dir: PathBuf) -> Self {
        Self::with_path(config_dir.join(CONFIG_FILE))
    }

    pub fn with_path(config_path: PathBuf) -> Self {
        let config = ArcSwap::new(Arc::new(UserConfig::default()));
        Self { config, config_path }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// 读取配置文件，不存在时使用默认值
    pub fn load(&self) -> Result<UserConfig, ConfigError> {
        if !self.config_path.exists() {
            tracing::debug!("No config at {}, using defaults", self.config_path.display());
            return Ok(UserConfig::default());
        }
        let content = std::fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        let config: UserConfig =
            toml::from_str(&content).map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        self.config.store(Arc::new(config.clone()));
        Ok(config)
    }

    /// 读取配置；首次运行时把默认配置写到磁盘，写入失败只记录日志
    pub fn load_or_init(&self) -> Result<UserConfig, ConfigError> {
        if self.config_path.exists() {
            return self.load();
        }
        let config = UserConfig::default();
        match self.save(&config) {
            Ok(()) => tracing::info!("Default config written to {}", self.config_path.display()),
            Err(e) => tracing::warn!("Could not write default config: {}", e),
        }
        Ok(config)
    }

    pub fn save(&self, config: &UserConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let content =
            toml::to_string(config).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }
        std::fs::write(&self.config_path, content)
            .map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        self.config.store(Arc::new(config.clone()));
        Ok(())
    }

    /// 替换内存中的配置，不写盘
    pub fn apply(&self, config: UserConfig) {
        self.config.store(Arc::new(config));
    }

    pub fn current(&self) -> Arc<UserConfig> {
        self.config.load_full()
    }
}
