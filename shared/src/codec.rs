use serde_json::Value;
use thiserror::Error;

use crate::envelope::Envelope;

/// Why a text frame could not be turned into an envelope.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error("payload has no string `type` field")]
    MissingType,

    #[error("unknown envelope type `{0}`")]
    UnknownType(String),

    #[error("invalid fields for `{kind}` envelope: {source}")]
    InvalidFields {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Unknown types are expected from newer peers and only worth a debug log.
    pub fn is_unknown_type(&self) -> bool {
        matches!(self, DecodeError::UnknownType(_))
    }
}

/// Decode a text frame into an envelope of the given direction.
pub fn decode<E: Envelope>(text: &str) -> Result<E, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::MalformedJson)?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?
        .to_string();

    if !E::KINDS.contains(&kind.as_str()) {
        return Err(DecodeError::UnknownType(kind));
    }

    serde_json::from_value(value).map_err(|source| DecodeError::InvalidFields { kind, source })
}

/// Encode an envelope as a JSON text frame.
pub fn encode<E: Envelope>(envelope: &E) -> Result<String, serde_json::Error> {
    serde_json::to_string(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientEnvelope, Id, ServerEnvelope};
    use serde_json::json;

    #[test]
    fn test_decode_join() {
        let env: ClientEnvelope = decode(r#"{"type":"join","videoId":42,"userId":"stu-1"}"#).unwrap();
        assert_eq!(
            env,
            ClientEnvelope::Join {
                video_id: Id::Int(42),
                user_id: Id::from("stu-1"),
            }
        );
    }

    #[test]
    fn test_decode_new_comment_keeps_comment_opaque() {
        let env: ClientEnvelope = decode(
            r#"{"type":"new_comment","videoId":"v1","comment":{"id":1,"timestamp":12.5,"tags":["pitch"]}}"#,
        )
        .unwrap();
        match env {
            ClientEnvelope::NewComment { video_id, comment } => {
                assert_eq!(video_id, Id::from("v1"));
                assert_eq!(comment, json!({"id": 1, "timestamp": 12.5, "tags": ["pitch"]}));
            }
            other => panic!("Expected NewComment, got {:?}", other),
        }
    }

    #[test]
    fn test_non_json_is_malformed() {
        let err = decode::<ClientEnvelope>("not json {").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedJson(_)));
    }

    #[test]
    fn test_missing_type() {
        assert!(matches!(
            decode::<ClientEnvelope>(r#"{"videoId":1}"#).unwrap_err(),
            DecodeError::MissingType
        ));
        assert!(matches!(
            decode::<ClientEnvelope>("[1,2,3]").unwrap_err(),
            DecodeError::MissingType
        ));
        assert!(matches!(
            decode::<ClientEnvelope>(r#"{"type":5}"#).unwrap_err(),
            DecodeError::MissingType
        ));
    }

    #[test]
    fn test_unknown_type_is_reported_by_name() {
        let err = decode::<ClientEnvelope>(r#"{"type":"reaction","videoId":1}"#).unwrap_err();
        assert!(err.is_unknown_type());
        assert_eq!(err.to_string(), "unknown envelope type `reaction`");
    }

    #[test]
    fn test_server_only_type_is_unknown_to_server() {
        let err = decode::<ClientEnvelope>(r#"{"type":"joined","videoId":1}"#).unwrap_err();
        assert!(err.is_unknown_type());
    }

    #[test]
    fn test_missing_field_is_invalid() {
        let err = decode::<ClientEnvelope>(r#"{"type":"typing","videoId":1,"userId":2}"#).unwrap_err();
        match err {
            DecodeError::InvalidFields { kind, .. } => assert_eq!(kind, "typing"),
            other => panic!("Expected InvalidFields, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_server_typing() {
        let text = encode(&ServerEnvelope::Typing {
            user_id: Id::Int(7),
            is_typing: false,
        })
        .unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"type": "typing", "userId": 7, "isTyping": false}));
    }
}
