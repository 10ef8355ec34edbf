use std::cmp::Ordering;

use serde_yaml::Value;

use crate::{Chunk, Error};

/// The document re-serialized, mapping keys sorted.
pub fn process_yaml(data: &[u8], source: &str) -> Result<Vec<Chunk>, Error> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let value: Value = serde_yaml::from_slice(data)?;
    let normalized = serde_yaml::to_string(&sort_keys(value))?;
    Ok(vec![Chunk::new(normalized, source)])
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Mapping(mapping) => {
            let mut entries: Vec<_> = mapping
                .into_iter()
                .map(|(key, value)| (key, sort_keys(value)))
                .collect();
            entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));
            Value::Mapping(entries.into_iter().collect())
        }
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(sort_keys).collect()),
        Value::Tagged(mut tagged) => {
            tagged.value = sort_keys(std::mem::take(&mut tagged.value));
            Value::Tagged(tagged)
        }
        other => other,
    }
}

/// Numbers first in numeric order, then everything else by its text.
fn compare_keys(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => key_text(a).cmp(&key_text(b)),
    }
}

fn key_text(key: &Value) -> String {
    match key {
        Value::String(text) => text.clone(),
        other => serde_yaml::to_string(other).unwrap_or_default(),
    }
}
