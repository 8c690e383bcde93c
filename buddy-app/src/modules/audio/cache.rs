//! 音频缓存
//!
//! 每条带音频的消息写成 `msg_<audio_index>.mp3`，并同步一份到 `latest.mp3`。
//! 不做淘汰：后端的索引本身是循环使用的

use crate::error::AudioError;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use buddy_core::InboundEnvelope;
use std::path::{Path, PathBuf};

/// 最近一条音频的固定文件名
pub const LATEST_FILE: &str = "latest.mp3";

/// 按索引生成缓存文件名
pub fn file_name(index: i64) -> String {
    format!("msg_{}.mp3", index)
}

/// 音频缓存目录
#[derive(Debug, Clone)]
pub struct AudioCache {
    dir: PathBuf,
}

impl AudioCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn latest_path(&self) -> PathBuf {
        self.dir.join(LATEST_FILE)
    }

    /// 确保缓存目录存在
    pub async fn ensure_dir(&self) -> Result<(), AudioError> {
        let exists = tokio::fs::try_exists(&self.dir)
            .await
            .map_err(|e| AudioError::CacheDirFailed(e.to_string()))?;

        if exists {
            tracing::info!("Audio folder exists: {}", self.dir.display());
        } else {
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| AudioError::CacheDirFailed(e.to_string()))?;
            tracing::info!("Audio folder created: {}", self.dir.display());
        }
        Ok(())
    }

    /// 写入消息附带的音频，返回文件路径；没有完整音频字段时返回 `None`
    pub async fn store(&self, envelope: &InboundEnvelope) -> Result<Option<PathBuf>, AudioError> {
        let (Some(audio_b64), Some(_), Some(index)) = (
            envelope.audio_b64.as_deref(),
            envelope.audio_name.as_deref(),
            envelope.audio_index,
        ) else {
            return Ok(None);
        };

        let bytes = STANDARD
            .decode(audio_b64.trim())
            .map_err(|e| AudioError::DecodeFailed(e.to_string()))?;

        let path = self.dir.join(file_name(index));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| AudioError::WriteFailed(format!("{}: {}", path.display(), e)))?;
        tracing::info!(bytes = bytes.len(), "Audio file written: {}", path.display());

        self.refresh_latest(&path, &bytes).await;
        Ok(Some(path))
    }

    /// 尽力更新 `latest.mp3`：先复制，失败则直接写入
    async fn refresh_latest(&self, path: &Path, bytes: &[u8]) {
        let latest = self.latest_path();
        if let Err(e) = tokio::fs::copy(path, &latest).await {
            tracing::warn!("Copy to {} failed: {}, writing directly", latest.display(), e);
            if let Err(e) = tokio::fs::write(&latest, bytes).await {
                tracing::error!("Failed to write {}: {}", latest.display(), e);
            }
        }
    }
}
