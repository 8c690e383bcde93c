//! 音频播放
//!
//! 同一时间只保留一个播放句柄，播放新音频前先卸载旧的

use crate::error::AudioError;
use auto_impl::auto_impl;
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// 音频播放器
#[auto_impl(&mut, Box)]
pub trait AudioPlayer: Send {
    /// 播放指定文件，先停止当前播放
    fn play(&mut self, path: &Path) -> Result<(), AudioError>;

    /// 释放当前播放句柄
    fn unload(&mut self);
}

/// 不播放，只记录日志
#[derive(Debug, Default)]
pub struct SilentPlayer;

impl AudioPlayer for SilentPlayer {
    fn play(&mut self, path: &Path) -> Result<(), AudioError> {
        tracing::debug!("No player configured, skipping {}", path.display());
        Ok(())
    }

    fn unload(&mut self) {}
}

/// 调用外部播放命令，文件路径作为最后一个参数
///
/// 必须在 tokio 运行时内使用
#[derive(Debug)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
    current: Option<Child>,
}

impl CommandPlayer {
    /// 从 `[program, args...]` 构造；为空时返回 `None`
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            current: None,
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }
}

impl AudioPlayer for CommandPlayer {
    fn play(&mut self, path: &Path) -> Result<(), AudioError> {
        self.unload();
        tracing::info!("Attempting to play sound at: {}", path.display());

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AudioError::PlaybackFailed(format!("{}: {}", self.program, e)))?;

        self.current = Some(child);
        tracing::info!("Audio playback started");
        Ok(())
    }

    fn unload(&mut self) {
        if let Some(mut child) = self.current.take() {
            // 进程可能已经自行退出
            if let Err(e) = child.start_kill() {
                tracing::debug!("Player already finished: {}", e);
            }
        }
    }
}

impl Drop for CommandPlayer {
    fn drop(&mut self) {
        self.unload();
    }
}

/// 根据配置选择播放器
pub fn player_for(command: &[String]) -> Box<dyn AudioPlayer> {
    match CommandPlayer::from_command(command) {
        Some(player) => Box::new(player),
        None => Box::new(SilentPlayer),
    }
}
