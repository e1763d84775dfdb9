//! Compressed binary encoding used for every row written to the embedded
//! databases: bincode inside a zstd frame.

use file_io::has_data_left;
use serde::{de::DeserializeOwned, Serialize};
use std::io::{self, BufReader, Write};
use thiserror::Error;
use zstd::{Decoder, Encoder};

const COMPRESSION_LEVEL: i32 = 0;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("bincode: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("zstd: {0}")]
    Io(#[from] io::Error),
    #[error("state document: {0}")]
    Document(#[from] serde_json::Error),
    #[error("decoded value is followed by trailing bytes")]
    TrailingBytes,
}

pub type Result<T> = std::result::Result<T, CodecError>;

pub fn encode<T: ?Sized + Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut writer = Encoder::new(Vec::new(), COMPRESSION_LEVEL)?;
    bincode::serialize_into(&mut writer, value)?;
    writer.flush()?;
    Ok(writer.finish()?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut reader = BufReader::new(Decoder::new(bytes)?);
    let value = bincode::deserialize_from(&mut reader)?;
    if has_data_left(reader)? {
        return Err(CodecError::TrailingBytes);
    }
    Ok(value)
}

/// Text form of a state or action, as stored in the transition columns.
pub fn to_document<T: ?Sized + Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

pub fn from_document<T: DeserializeOwned>(document: &str) -> Result<T> {
    Ok(serde_json::from_str(document)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_trailing_values() {
        let mut writer = Encoder::new(Vec::new(), COMPRESSION_LEVEL).unwrap();
        bincode::serialize_into(&mut writer, &7u32).unwrap();
        bincode::serialize_into(&mut writer, &8u32).unwrap();
        let bytes = writer.finish().unwrap();

        assert!(matches!(decode::<u32>(&bytes), Err(CodecError::TrailingBytes)));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode::<u32>(b"not a zstd frame").is_err());
    }

    #[test]
    fn documents_are_json() {
        let doc = to_document(&vec![1, 2]).unwrap();
        assert_eq!(doc, "[1,2]");
        assert_eq!(from_document::<Vec<i32>>(&doc).unwrap(), vec![1, 2]);
    }
}
