// Big-endian keys so that sled's lexicographic order is numeric order.

pub fn row_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

pub fn validation_key(set_id: u64, move_index: u32) -> [u8; 12] {
    let mut key = [0; 12];
    key[..8].copy_from_slice(&set_id.to_be_bytes());
    key[8..].copy_from_slice(&move_index.to_be_bytes());
    key
}

pub fn validation_prefix(set_id: u64) -> [u8; 8] {
    set_id.to_be_bytes()
}

pub const LATEST_EPISODE: &[u8] = b"latest_episode";
pub const LATEST_VALIDATION_SET: &[u8] = b"latest_validation_set";

pub fn decode_u64(bytes: &[u8]) -> Option<u64> {
    Some(u64::from_be_bytes(bytes.try_into().ok()?))
}
