//! 客户端错误类型
//!
//! 所有错误都不会终止进程，只作用于单个帧、单次发送或单次连接

use thiserror::Error;

/// 分发客户端错误
///
/// 同时作为报告事件通过广播通道发出，因此需要 `Clone`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Connection closed{}", closed_suffix(.0))]
    ConnectionClosed(Option<String>),

    #[error("Invalid WS message: {reason}")]
    MalformedPayload { raw: String, reason: String },

    #[error("WebSocket not ready, message dropped: {0}")]
    SendWhileDisconnected(String),

    /// 已接受但连接在写出前断开
    #[error("Connection lost before sending, message dropped: {0}")]
    SendDiscarded(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Client is already started")]
    AlreadyStarted,
}

fn closed_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(reason) if !reason.is_empty() => format!(": {reason}"),
        _ => String::new(),
    }
}

impl ClientError {
    /// 连接层面的错误，之后会自动重连
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ClientError::ConnectionFailed(_)
                | ClientError::TransportError(_)
                | ClientError::ConnectionClosed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        assert_eq!(ClientError::ConnectionClosed(None).to_string(), "Connection closed");
        assert_eq!(
            ClientError::ConnectionClosed(Some("going away".to_string())).to_string(),
            "Connection closed: going away"
        );
        assert_eq!(
            ClientError::SendWhileDisconnected("hello".to_string()).to_string(),
            "WebSocket not ready, message dropped: hello"
        );
        assert_eq!(
            ClientError::SendDiscarded("hello".to_string()).to_string(),
            "Connection lost before sending, message dropped: hello"
        );

        let error = ClientError::MalformedPayload {
            raw: "{bad".to_string(),
            reason: "EOF while parsing an object".to_string(),
        };
        assert!(error.to_string().starts_with("Invalid WS message"));
    }

    #[test]
    fn test_client_error_is_recoverable() {
        assert!(ClientError::ConnectionFailed("refused".to_string()).is_recoverable());
        assert!(ClientError::TransportError("reset".to_string()).is_recoverable());
        assert!(ClientError::ConnectionClosed(None).is_recoverable());

        assert!(!ClientError::SendWhileDisconnected("hi".to_string()).is_recoverable());
        assert!(!ClientError::SendDiscarded("hi".to_string()).is_recoverable());
        assert!(!ClientError::AlreadyStarted.is_recoverable());
    }
}
