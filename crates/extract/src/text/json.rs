use serde_json::Value;

use crate::{Chunk, Error};

/// Normalizes the document to pretty printed json with sorted keys.
pub fn process_json(data: &[u8], source: &str) -> Result<Vec<Chunk>, Error> {
    let value: Value = serde_json::from_slice(data)?;
    let pretty = serde_json::to_string_pretty(&value)?;
    Ok(vec![Chunk::new(pretty, source)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_prints() {
        let chunks = process_json(br#"{"key": "value"}"#, "https://example.com/data.json").unwrap();
        assert_eq!(
            chunks,
            vec![Chunk::new(
                "{\n  \"key\": \"value\"\n}",
                "https://example.com/data.json"
            )]
        );
    }

    #[test]
    fn keys_are_sorted() {
        let chunks = process_json(br#"{"b": 1, "a": [true, null]}"#, "x").unwrap();
        assert_eq!(
            chunks[0].content,
            "{\n  \"a\": [\n    true,\n    null\n  ],\n  \"b\": 1\n}"
        );
    }

    #[test]
    fn empty_object() {
        let chunks = process_json(b"{}", "https://example.com").unwrap();
        assert_eq!(chunks, vec![Chunk::new("{}", "https://example.com")]);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(process_json(b"", "x"), Err(Error::Json(_))));
    }
}
