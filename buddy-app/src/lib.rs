//! Buddy 终端客户端
//!
//! 连接 Buddy 后端，在终端中收发聊天消息并播放回复音频

pub mod commands;
pub mod error;
pub mod events;
pub mod modules;

use anyhow::Context;
use buddy_core::{DispatchClient, InboundEnvelope, listener};
use events::{AppEvent, ChatSession, Flow};
use modules::audio::{AudioCache, player_for};
use modules::config::SERVER_URL_ENV;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

pub use commands::Command;
pub use error::{AppError, AudioError, ConfigError, ErrorCode};
pub use modules::chat::{ChatMessage, Transcript};
pub use modules::config::{ConfigManager, UserConfig};

/// 初始化日志，输出到 stderr，默认级别 info
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // 重复初始化时忽略
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// 运行客户端直到输入结束、`/quit` 或 Ctrl-C
pub async fn run(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let manager = match config_path {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::default(),
    };
    let mut config = manager
        .load_or_init()
        .with_context(|| format!("loading {}", manager.path().display()))?;
    config.apply_overrides(std::env::var(SERVER_URL_ENV).ok());
    config.validate()?;
    manager.apply(config);
    let config = manager.current();

    let cache = AudioCache::new(config.audio_cache_dir());
    if let Err(e) = cache.ensure_dir().await {
        tracing::error!("Audio cache unavailable: {}", e);
    }

    let client = DispatchClient::new(config.client_config());
    let (tx, mut rx) = mpsc::unbounded_channel();

    // 先订阅，避免漏掉第一次连接的状态和报告
    tokio::spawn(events::forward_reports(client.reports(), tx.clone()));
    tokio::spawn(events::forward_state(client.watch_state(), tx.clone()));

    let inbound_tx = tx.clone();
    client.connect(Some(listener(move |value| {
        let _ = inbound_tx.send(AppEvent::Inbound(InboundEnvelope::from_value(value)));
    })))?;
    tracing::info!("Connecting to {}", client.url());

    std::thread::Builder::new()
        .name("buddy-stdin".to_string())
        .spawn(move || events::forward_input(std::io::stdin().lock(), tx))
        .context("spawning input reader")?;

    let mut session = ChatSession::new(
        &client,
        config.server.speaker.clone(),
        cache,
        player_for(&config.audio.player_command),
        config.audio.autoplay,
        std::io::stdout(),
    );
    session.handle(AppEvent::Input(Command::Help)).await;

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                if session.handle(event).await == Flow::Exit {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    session.close();
    client.shutdown().await;
    Ok(())
}
