//! 消息信封
//!
//! 出站消息固定为 `{ text, speaker }`；入站消息是任意 JSON，
//! 这里只提供一个宽松的类型化视图，缺失或类型不符的字段一律视为空

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 默认发言人
pub const DEFAULT_SPEAKER: &str = "user";

/// 无法解析的帧在界面上使用的情绪
pub const NEUTRAL_EMOTION: &str = "neutral";

/// 出站消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    pub text: String,
    pub speaker: String,
}

impl OutboundEnvelope {
    pub fn new(text: impl Into<String>, speaker: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speaker: speaker.into(),
        }
    }

    /// 序列化为 JSON 文本帧
    pub fn to_json(&self) -> Result<String, ClientError> {
        serde_json::to_string(self).map_err(|e| ClientError::Serialization(e.to_string()))
    }
}

/// 入站消息视图
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundEnvelope {
    pub text: String,
    /// `speaker`，旧版后端使用 `sender`
    pub speaker: Option<String>,
    pub emotion: Option<String>,
    pub expression: Option<String>,
    pub blended_scores: Option<Value>,
    /// Base64 编码的 mp3
    pub audio_b64: Option<String>,
    pub audio_name: Option<String>,
    pub audio_index: Option<i64>,
}

impl InboundEnvelope {
    /// 从已解析的 JSON 构造
    pub fn from_value(value: &Value) -> Self {
        let str_field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);

        Self {
            text: str_field("text").unwrap_or_default(),
            speaker: str_field("speaker").or_else(|| str_field("sender")),
            emotion: str_field("emotion"),
            expression: str_field("expression"),
            blended_scores: value.get("blended_scores").filter(|v| !v.is_null()).cloned(),
            audio_b64: str_field("audio_b64"),
            audio_name: str_field("audio_name"),
            audio_index: value.get("audio_index").and_then(Value::as_i64),
        }
    }

    /// 非 JSON 帧按纯文本处理
    pub fn plain_text(raw: impl Into<String>) -> Self {
        Self {
            text: raw.into(),
            emotion: Some(NEUTRAL_EMOTION.to_string()),
            ..Default::default()
        }
    }

    /// 三个音频字段都存在时才写入缓存
    pub fn has_audio(&self) -> bool {
        self.audio_b64.is_some() && self.audio_name.is_some() && self.audio_index.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outbound_envelope_json() {
        let json = OutboundEnvelope::new("hello", DEFAULT_SPEAKER).to_json().unwrap();
        assert_eq!(json, r#"{"text":"hello","speaker":"user"}"#);
    }

    #[test]
    fn test_inbound_envelope_from_backend_reply() {
        let value = json!({
            "text": "Nice to see you!",
            "emotion": "joy",
            "expression": "smile",
            "blended_scores": { "joy": 0.8, "neutral": 0.2 },
            "audio_b64": "SUQz",
            "audio_name": "msg_3.mp3",
            "audio_index": 3
        });

        let envelope = InboundEnvelope::from_value(&value);
        assert_eq!(envelope.text, "Nice to see you!");
        assert_eq!(envelope.emotion.as_deref(), Some("joy"));
        assert_eq!(envelope.expression.as_deref(), Some("smile"));
        assert_eq!(envelope.audio_index, Some(3));
        assert!(envelope.blended_scores.is_some());
        assert!(envelope.has_audio());
    }

    #[test]
    fn test_inbound_envelope_sender_alias() {
        let envelope = InboundEnvelope::from_value(&json!({ "text": "hi", "sender": "Buddy" }));
        assert_eq!(envelope.speaker.as_deref(), Some("Buddy"));

        let envelope = InboundEnvelope::from_value(&json!({
            "text": "hi",
            "speaker": "Buddy",
            "sender": "ignored"
        }));
        assert_eq!(envelope.speaker.as_deref(), Some("Buddy"));
    }

    #[test]
    fn test_inbound_envelope_partial_audio() {
        // 缺少 audio_index 时不算音频消息
        let envelope = InboundEnvelope::from_value(&json!({
            "text": "hi",
            "audio_b64": "SUQz",
            "audio_name": "msg_0.mp3"
        }));
        assert!(!envelope.has_audio());
    }

    #[test]
    fn test_inbound_envelope_non_object() {
        let envelope = InboundEnvelope::from_value(&json!([1, 2, 3]));
        assert_eq!(envelope, InboundEnvelope::default());
    }

    #[test]
    fn test_plain_text_is_neutral() {
        let envelope = InboundEnvelope::plain_text("not json");
        assert_eq!(envelope.text, "not json");
        assert_eq!(envelope.emotion.as_deref(), Some(NEUTRAL_EMOTION));
        assert!(!envelope.has_audio());
    }
}
