//! Buddy 错误类型定义
//!
//! 应用层错误统一在此定义，使用 thiserror 自动派生 Error trait

use buddy_core::ClientError;
use thiserror::Error;

/// 应用统一错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 网络相关错误
    #[error(transparent)]
    Network(#[from] ClientError),

    /// 音频相关错误
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// 配置相关错误
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// 错误代码（用于终端显示）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // 网络错误
    NetworkConnectFailed,
    NetworkLost,
    NetworkMessageDropped,
    NetworkMalformedPayload,
    NetworkAlreadyStarted,

    // 音频错误
    AudioCacheFailed,
    AudioDecodeFailed,
    AudioPlaybackFailed,

    // 配置错误
    ConfigLoadFailed,
    ConfigSaveFailed,
    ConfigValidationFailed,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::NetworkConnectFailed => write!(f, "NETWORK_CONNECT_FAILED"),
            ErrorCode::NetworkLost => write!(f, "NETWORK_LOST"),
            ErrorCode::NetworkMessageDropped => write!(f, "NETWORK_MESSAGE_DROPPED"),
            ErrorCode::NetworkMalformedPayload => write!(f, "NETWORK_MALFORMED_PAYLOAD"),
            ErrorCode::NetworkAlreadyStarted => write!(f, "NETWORK_ALREADY_STARTED"),
            ErrorCode::AudioCacheFailed => write!(f, "AUDIO_CACHE_FAILED"),
            ErrorCode::AudioDecodeFailed => write!(f, "AUDIO_DECODE_FAILED"),
            ErrorCode::AudioPlaybackFailed => write!(f, "AUDIO_PLAYBACK_FAILED"),
            ErrorCode::ConfigLoadFailed => write!(f, "CONFIG_LOAD_FAILED"),
            ErrorCode::ConfigSaveFailed => write!(f, "CONFIG_SAVE_FAILED"),
            ErrorCode::ConfigValidationFailed => write!(f, "CONFIG_VALIDATION_FAILED"),
        }
    }
}

/// 音频相关错误
#[derive(Debug, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("Failed to prepare audio folder: {0}")]
    CacheDirFailed(String),

    #[error("Invalid base64 audio: {0}")]
    DecodeFailed(String),

    #[error("Failed to write audio file: {0}")]
    WriteFailed(String),

    #[error("Playback failed: {0}")]
    PlaybackFailed(String),
}

/// 配置相关错误
#[derive(Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

impl AppError {
    /// 获取对应的错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Network(e) => match e {
                ClientError::ConnectionFailed(_) => ErrorCode::NetworkConnectFailed,
                ClientError::TransportError(_) | ClientError::ConnectionClosed(_) => {
                    ErrorCode::NetworkLost
                }
                ClientError::SendWhileDisconnected(_) | ClientError::SendDiscarded(_) => {
                    ErrorCode::NetworkMessageDropped
                }
                ClientError::MalformedPayload { .. } | ClientError::Serialization(_) => {
                    ErrorCode::NetworkMalformedPayload
                }
                ClientError::AlreadyStarted => ErrorCode::NetworkAlreadyStarted,
            },
            AppError::Audio(e) => match e {
                AudioError::CacheDirFailed(_) | AudioError::WriteFailed(_) => {
                    ErrorCode::AudioCacheFailed
                }
                AudioError::DecodeFailed(_) => ErrorCode::AudioDecodeFailed,
                AudioError::PlaybackFailed(_) => ErrorCode::AudioPlaybackFailed,
            },
            AppError::Config(e) => match e {
                ConfigError::LoadFailed(_) => ErrorCode::ConfigLoadFailed,
                ConfigError::SaveFailed(_) => ErrorCode::ConfigSaveFailed,
                ConfigError::ValidationFailed(_) => ErrorCode::ConfigValidationFailed,
            },
        }
    }

    /// 检查是否为可恢复错误
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Network(e) => e.is_recoverable(),
            AppError::Audio(_) => true,
            AppError::Config(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::NetworkConnectFailed.to_string(), "NETWORK_CONNECT_FAILED");
        assert_eq!(ErrorCode::NetworkMessageDropped.to_string(), "NETWORK_MESSAGE_DROPPED");
        assert_eq!(ErrorCode::AudioDecodeFailed.to_string(), "AUDIO_DECODE_FAILED");
        assert_eq!(ErrorCode::ConfigValidationFailed.to_string(), "CONFIG_VALIDATION_FAILED");
    }

    #[test]
    fn test_app_error_from_client() {
        let app_error: AppError = ClientError::SendWhileDisconnected("hi".to_string()).into();
        assert_eq!(app_error.code(), ErrorCode::NetworkMessageDropped);
        assert!(!app_error.is_recoverable());

        let app_error: AppError = ClientError::ConnectionClosed(None).into();
        assert_eq!(app_error.code(), ErrorCode::NetworkLost);
        assert!(app_error.is_recoverable());

        let app_error: AppError = ClientError::MalformedPayload {
            raw: "{bad".to_string(),
            reason: "eof".to_string(),
        }
        .into();
        assert_eq!(app_error.code(), ErrorCode::NetworkMalformedPayload);
    }

    #[test]
    fn test_app_error_from_audio() {
        let app_error: AppError = AudioError::DecodeFailed("bad padding".to_string()).into();
        assert_eq!(app_error.code(), ErrorCode::AudioDecodeFailed);
        assert!(app_error.to_string().contains("Invalid base64 audio"));
        assert!(app_error.is_recoverable());
    }

    #[test]
    fn test_app_error_from_config() {
        let app_error: AppError = ConfigError::ValidationFailed("bad url".to_string()).into();
        assert_eq!(app_error.code(), ErrorCode::ConfigValidationFailed);
        assert!(!app_error.is_recoverable());
    }

    #[test]
    fn test_transparent_display() {
        let app_error: AppError = ClientError::SendWhileDisconnected("hello".to_string()).into();
        assert_eq!(
            app_error.to_string(),
            "WebSocket not ready, message dropped: hello"
        );
    }
}
