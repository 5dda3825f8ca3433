//! Content decoding for the inline preview.
//!
//! Decoding only ever sees the already-limited body; byte accounting is the
//! caller's job.

use serde_json::{Map, Value};

use crate::error::DecodeError;

pub const AMQP_LIST: &str = "amqp/list";
pub const AMQP_MAP: &str = "amqp/map";
pub const JMS_MAP_MESSAGE: &str = "jms/map-message";

/// One element of a decoded list body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub index: usize,
    pub value: String,
}

/// One entry of a decoded map body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// A body in renderable form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedBody {
    PlainText(String),
    ItemList(Vec<ListItem>),
    KeyValueTable(Vec<KeyValue>),
}

/// Case-sensitive, like the broker's own type names: `TEXT/plain` is not text.
fn is_text(mime_type: &str) -> bool {
    mime_type.starts_with("text/")
}

fn is_map(mime_type: &str) -> bool {
    mime_type == AMQP_MAP || mime_type == JMS_MAP_MESSAGE
}

/// Whether a message of this type gets an inline preview at all.
pub fn is_previewable(mime_type: Option<&str>) -> bool {
    match mime_type {
        Some(m) => is_text(m) || m == AMQP_LIST || is_map(m),
        None => false,
    }
}

/// Decode a (possibly truncated) body according to its mime type.
pub fn decode(mime_type: &str, raw: &[u8]) -> Result<DecodedBody, DecodeError> {
    if is_text(mime_type) {
        return Ok(DecodedBody::PlainText(
            String::from_utf8_lossy(raw).into_owned(),
        ));
    }
    if mime_type == AMQP_LIST {
        let Value::Array(items) = parse(mime_type, raw)? else {
            return Err(DecodeError::UnexpectedShape {
                mime_type: mime_type.to_string(),
                expected: "array",
            });
        };
        let rows = items
            .iter()
            .enumerate()
            .map(|(index, item)| ListItem {
                index,
                value: stringify(item),
            })
            .collect();
        return Ok(DecodedBody::ItemList(rows));
    }
    if is_map(mime_type) {
        let Value::Object(entries) = parse(mime_type, raw)? else {
            return Err(DecodeError::UnexpectedShape {
                mime_type: mime_type.to_string(),
                expected: "object",
            });
        };
        let rows = enumeration_order(&entries)
            .into_iter()
            .map(|(key, value)| KeyValue {
                key: key.to_string(),
                value: stringify(value),
            })
            .collect();
        return Ok(DecodedBody::KeyValueTable(rows));
    }
    Err(DecodeError::UnsupportedFormat(mime_type.to_string()))
}

/// Like [`decode`], but structured bodies that fail to parse (typically
/// because the preview cut them short) are shown as raw text.
pub fn decode_or_text(mime_type: &str, raw: &[u8]) -> Result<DecodedBody, DecodeError> {
    match decode(mime_type, raw) {
        Err(e @ (DecodeError::Malformed { .. } | DecodeError::UnexpectedShape { .. })) => {
            log::warn!("Showing preview as text: {e}");
            Ok(DecodedBody::PlainText(
                String::from_utf8_lossy(raw).into_owned(),
            ))
        }
        other => other,
    }
}

/// Entries in the order a console script enumerates an object: array index
/// keys first in ascending numeric order, then every other key in document
/// order.
pub fn enumeration_order(map: &Map<String, Value>) -> Vec<(&str, &Value)> {
    let (mut indexed, named): (Vec<_>, Vec<_>) = map
        .iter()
        .map(|(key, value)| (array_index(key), key.as_str(), value))
        .partition(|(index, ..)| index.is_some());
    indexed.sort_by_key(|(index, ..)| *index);
    indexed
        .into_iter()
        .chain(named)
        .map(|(_, key, value)| (key, value))
        .collect()
}

/// Canonical array index: decimal, no sign or leading zeros, below 2^32 - 1.
fn array_index(key: &str) -> Option<u32> {
    let index: u32 = key.parse().ok()?;
    (index != u32::MAX && index.to_string() == key).then_some(index)
}

fn parse(mime_type: &str, raw: &[u8]) -> Result<Value, DecodeError> {
    serde_json::from_slice(raw).map_err(|source| DecodeError::Malformed {
        mime_type: mime_type.to_string(),
        source,
    })
}

/// Compact JSON rendering, so nested values stay inspectable.
fn stringify(value: &Value) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE_MAP: &str = include_str!("../tests/fixtures/map_message.json");

    // ── eligibility ──────────────────────────────────────────────

    #[test]
    fn recognised_types_are_previewable() {
        assert!(is_previewable(Some("text/plain")));
        assert!(is_previewable(Some("text/xml")));
        assert!(is_previewable(Some("amqp/list")));
        assert!(is_previewable(Some("amqp/map")));
        assert!(is_previewable(Some("jms/map-message")));
    }

    #[test]
    fn other_types_are_not_previewable() {
        assert!(!is_previewable(None));
        assert!(!is_previewable(Some("application/octet-stream")));
        assert!(!is_previewable(Some("application/json")));
        assert!(!is_previewable(Some("text")));
        assert!(!is_previewable(Some("TEXT/html")));
        assert!(!is_previewable(Some("jms/stream-message")));
    }

    // ── decode ───────────────────────────────────────────────────

    #[test]
    fn text_is_passed_through() {
        let decoded = decode("text/plain", b"Hello <b>world</b>").unwrap();
        assert_eq!(decoded, DecodedBody::PlainText("Hello <b>world</b>".into()));
    }

    #[test]
    fn text_cut_mid_character_is_lossy() {
        let bytes = "héllo".as_bytes();
        let decoded = decode("text/plain", &bytes[..2]).unwrap();
        assert_eq!(decoded, DecodedBody::PlainText("h\u{FFFD}".into()));
    }

    #[test]
    fn list_rows_keep_order() {
        let decoded = decode(AMQP_LIST, b"[1,2,3]").unwrap();
        assert_eq!(
            decoded,
            DecodedBody::ItemList(vec![
                ListItem { index: 0, value: "1".into() },
                ListItem { index: 1, value: "2".into() },
                ListItem { index: 2, value: "3".into() },
            ])
        );
    }

    #[test]
    fn list_elements_are_serialized_structurally() {
        let decoded = decode(AMQP_LIST, br#"["a", {"x": [1, null]}, true]"#).unwrap();
        let DecodedBody::ItemList(rows) = decoded else {
            panic!("expected a list");
        };
        let values: Vec<_> = rows.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec![r#""a""#, r#"{"x":[1,null]}"#, "true"]);
    }

    #[test]
    fn map_rows_follow_enumeration_order() {
        let decoded = decode(AMQP_MAP, br#"{"a":1,"b":2}"#).unwrap();
        assert_eq!(
            decoded,
            DecodedBody::KeyValueTable(vec![
                KeyValue { key: "a".into(), value: "1".into() },
                KeyValue { key: "b".into(), value: "2".into() },
            ])
        );
    }

    #[test]
    fn map_message_fixture() {
        let DecodedBody::KeyValueTable(rows) = decode(JMS_MAP_MESSAGE, FIXTURE_MAP.as_bytes()).unwrap() else {
            panic!("expected a table");
        };
        let keys: Vec<_> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["10", "zeta", "alpha", "nested"]);
        assert_eq!(rows[0].value, "true");
        assert_eq!(rows[2].value, r#""two""#);
        assert_eq!(rows[3].value, r#"{"b":[1,2],"a":null}"#);
    }

    #[test]
    fn index_keys_enumerate_first_in_numeric_order() {
        let decoded = decode(AMQP_MAP, br#"{"b":1,"2":2,"a":3,"1":4}"#).unwrap();
        let DecodedBody::KeyValueTable(rows) = decoded else {
            panic!("expected a table");
        };
        let keys: Vec<_> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["1", "2", "b", "a"]);
        assert_eq!(rows[0].value, "4");
    }

    #[test]
    fn non_canonical_numbers_keep_document_order() {
        let map: Map<String, Value> =
            serde_json::from_str(r#"{"010":1,"-1":2,"+3":3,"4294967295":4,"4294967294":5,"20":6,"3":7}"#).unwrap();
        let keys: Vec<_> = enumeration_order(&map).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["3", "20", "4294967294", "010", "-1", "+3", "4294967295"]);
    }

    #[test]
    fn wrong_shape_is_rejected() {
        assert!(matches!(
            decode(AMQP_LIST, br#"{"a":1}"#),
            Err(DecodeError::UnexpectedShape { expected: "array", .. })
        ));
        assert!(matches!(
            decode(AMQP_MAP, b"[1]"),
            Err(DecodeError::UnexpectedShape { expected: "object", .. })
        ));
    }

    #[test]
    fn truncated_json_is_malformed() {
        assert!(matches!(
            decode(AMQP_LIST, b"[1,2,"),
            Err(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn unsupported_types_are_reported() {
        assert!(matches!(
            decode("application/octet-stream", b"\x00\x01"),
            Err(DecodeError::UnsupportedFormat(_))
        ));
    }

    // ── decode_or_text ───────────────────────────────────────────

    #[test]
    fn truncated_structure_falls_back_to_text() {
        let decoded = decode_or_text(AMQP_MAP, br#"{"a":1,"b""#).unwrap();
        assert_eq!(decoded, DecodedBody::PlainText(r#"{"a":1,"b""#.into()));
    }

    #[test]
    fn unsupported_types_still_fail() {
        assert!(decode_or_text("image/png", b"").is_err());
    }
}
