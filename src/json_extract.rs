//! Pulls a JSON payload out of free-form model output.
//!
//! Model replies often wrap the payload in prose or markdown fences. The
//! grammar accepted here is deliberately small:
//!
//! * an **array payload** is the first `[` whose balanced region parses as
//!   a non-empty JSON array whose elements are all objects;
//! * an **object payload** is the first `{` whose balanced region parses as
//!   a JSON object.
//!
//! Brackets inside JSON string literals are ignored while balancing. Once a
//! candidate region matches the grammar it is the payload: if it then fails
//! to deserialize into the requested type the extraction fails instead of
//! trying later candidates.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("No JSON {0} found in response")]
    NotFound(&'static str),
    #[error("JSON payload has an unexpected shape: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExtractError>;

/// Returns the balanced region starting at byte offset `start`, which must
/// hold `[` or `{`. `None` when the region never closes or closes with the
/// wrong bracket.
pub fn balanced_region(text: &str, start: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    match bytes.get(start) {
        Some(b'[') | Some(b'{') => {}
        _ => return None,
    }

    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => stack.push(byte),
            b']' | b'}' => {
                let opener = stack.pop()?;
                let matches = (opener == b'[' && byte == b']') || (opener == b'{' && byte == b'}');
                if !matches {
                    return None;
                }
                if stack.is_empty() {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

fn candidates(text: &str, opener: char) -> impl Iterator<Item = &str> {
    text.char_indices()
        .filter(move |(_, c)| *c == opener)
        .filter_map(move |(idx, _)| balanced_region(text, idx))
}

/// Locates the array payload and deserializes its elements.
pub fn extract_array<T: DeserializeOwned>(text: &str) -> Result<Vec<T>> {
    for region in candidates(text, '[') {
        let Ok(Value::Array(items)) = serde_json::from_str::<Value>(region) else {
            continue;
        };
        if items.is_empty() || !items.iter().all(Value::is_object) {
            continue;
        }
        let parsed = items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<T>, _>>()?;
        return Ok(parsed);
    }

    Err(ExtractError::NotFound("array of objects"))
}

/// Locates the object payload and deserializes it.
pub fn extract_object<T: DeserializeOwned>(text: &str) -> Result<T> {
    for region in candidates(text, '{') {
        let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(region) else {
            continue;
        };
        return Ok(serde_json::from_value(value)?);
    }

    Err(ExtractError::NotFound("object"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
        label: String,
    }

    #[test]
    fn finds_array_inside_prose_and_fences() {
        let reply = "Sure! Here is your quiz:\n```json\n[{\"id\": 1, \"label\": \"a [b]\"}, {\"id\": 2, \"label\": \"c\"}]\n```\nGood luck [really].";
        let items: Vec<Item> = extract_array(reply).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].label, "a [b]");
    }

    #[test]
    fn skips_bracketed_prose_before_payload() {
        let reply = "[note] see below: [1, 2] then [{\"id\": 7, \"label\": \"x\"}]";
        let items: Vec<Item> = extract_array(reply).unwrap();
        assert_eq!(items, vec![Item { id: 7, label: "x".to_string() }]);
    }

    #[test]
    fn reports_missing_array() {
        let err = extract_array::<Item>("I could not generate a quiz, sorry.").unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }

    #[test]
    fn unterminated_array_is_not_found() {
        let err = extract_array::<Item>("[{\"id\": 1, \"label\": \"x\"}").unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }

    #[test]
    fn wrong_shape_fails_closed() {
        let err = extract_array::<Item>("[{\"id\": \"one\"}]").unwrap_err();
        assert!(matches!(err, ExtractError::Malformed(_)));
    }

    #[test]
    fn escaped_quotes_do_not_break_balancing() {
        let text = r#"{"label": "say \"}\" now", "id": 3} trailing"#;
        assert_eq!(balanced_region(text, 0), Some(r#"{"label": "say \"}\" now", "id": 3}"#));
        let item: Item = extract_object(text).unwrap();
        assert_eq!(item.id, 3);
    }

    #[test]
    fn mismatched_brackets_are_rejected() {
        assert_eq!(balanced_region("[}", 0), None);
        assert_eq!(balanced_region("x[]", 0), None);
    }
}
