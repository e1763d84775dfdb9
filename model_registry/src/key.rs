use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one model version within an experiment lineage (`tag`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelKey {
    pub tag: String,
    pub version: u32,
}

impl ModelKey {
    pub fn new(tag: impl Into<String>, version: u32) -> Self {
        Self {
            tag: tag.into(),
            version,
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.tag, self.version)
    }
}

// Length-prefixed tag followed by the big-endian version, so that the keys
// of one tag form a contiguous, version-ordered range.

pub(crate) fn tag_prefix(tag: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(4 + tag.len() + 4);
    prefix.extend((tag.len() as u32).to_be_bytes());
    prefix.extend(tag.as_bytes());
    prefix
}

pub(crate) fn encode(key: &ModelKey) -> Vec<u8> {
    let mut bytes = tag_prefix(&key.tag);
    bytes.extend(key.version.to_be_bytes());
    bytes
}

pub(crate) fn decode(bytes: &[u8]) -> Option<ModelKey> {
    let tag_len = u32::from_be_bytes(bytes.get(..4)?.try_into().ok()?) as usize;
    let tag = std::str::from_utf8(bytes.get(4..4 + tag_len)?).ok()?;
    let version = bytes.get(4 + tag_len..8 + tag_len)?;
    if bytes.len() != 8 + tag_len {
        return None;
    }
    Some(ModelKey::new(tag, u32::from_be_bytes(version.try_into().ok()?)))
}

/// Key of the `index`-th audit row of `key`.
pub(crate) fn child(key: &ModelKey, index: u64) -> Vec<u8> {
    let mut bytes = encode(key);
    bytes.extend(index.to_be_bytes());
    bytes
}

pub(crate) fn child_index(bytes: &[u8]) -> Option<u64> {
    let index = bytes.get(bytes.len().checked_sub(8)?..)?;
    Some(u64::from_be_bytes(index.try_into().ok()?))
}

pub(crate) fn decode_count(bytes: &[u8]) -> Option<u64> {
    Some(u64::from_be_bytes(bytes.try_into().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_decode_and_order_by_version() {
        let key = ModelKey::new("tetris", 258);
        assert_eq!(decode(&encode(&key)), Some(key.clone()));
        assert!(encode(&ModelKey::new("tetris", 2)) < encode(&ModelKey::new("tetris", 256)));
        assert_eq!(child_index(&child(&key, 41)), Some(41));
    }

    #[test]
    fn tag_prefix_does_not_match_longer_tags() {
        let short = tag_prefix("run");
        assert!(encode(&ModelKey::new("run", 0)).starts_with(&short));
        assert!(!encode(&ModelKey::new("run2", 0)).starts_with(&short));
    }

    #[test]
    fn child_rows_are_not_model_keys() {
        assert_eq!(decode(&child(&ModelKey::new("a", 1), 3)), None);
    }
}
