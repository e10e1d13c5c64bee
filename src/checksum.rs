//! CFDATA checksum for cabinet data blocks.

/// XOR-fold `data` as little-endian u32 words into `seed`.
///
/// A trailing partial word is packed big-end first, as the cabinet
/// format specifies.
pub fn fold(data: &[u8], seed: u32) -> u32 {
    let mut sum = seed;
    let mut words = data.chunks_exact(4);
    for word in words.by_ref() {
        sum ^= u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
    }

    let tail = words
        .remainder()
        .iter()
        .fold(0u32, |acc, &b| (acc << 8) | b as u32);
    sum ^ tail
}

/// Checksum of one CFDATA block: its payload, then the two size fields.
pub fn data_block_checksum(payload: &[u8], compressed_size: u16, uncompressed_size: u16) -> u32 {
    let mut sizes = [0u8; 4];
    sizes[..2].copy_from_slice(&compressed_size.to_le_bytes());
    sizes[2..].copy_from_slice(&uncompressed_size.to_le_bytes());
    fold(&sizes, fold(payload, 0))
}
