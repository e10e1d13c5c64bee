//! Byte and signature search over large buffers.
//!
//! SWAR scan: eight bytes per step using u64 arithmetic, no `unsafe`.

const LO: u64 = 0x0101_0101_0101_0101;
const HI: u64 = 0x8080_8080_8080_8080;

/// Find first occurrence of `needle` in `haystack`.
#[inline]
pub fn find_byte(haystack: &[u8], needle: u8) -> Option<usize> {
    let broadcast = LO.wrapping_mul(u64::from(needle));
    let mut chunks = haystack.chunks_exact(8);

    for (ci, chunk) in chunks.by_ref().enumerate() {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        let xored = u64::from_le_bytes(word) ^ broadcast;
        let has_match = xored.wrapping_sub(LO) & !xored & HI;
        if has_match != 0 {
            return Some(ci * 8 + (has_match.trailing_zeros() as usize / 8));
        }
    }

    let tail_start = haystack.len() - chunks.remainder().len();
    chunks
        .remainder()
        .iter()
        .position(|&b| b == needle)
        .map(|i| tail_start + i)
}

/// Offsets of every occurrence of `pattern` in `haystack`.
///
/// Overlapping matches are all reported.
pub fn find_all(haystack: &[u8], pattern: &[u8]) -> Vec<usize> {
    let mut found = Vec::new();
    let Some((&first, rest)) = pattern.split_first() else {
        return found;
    };

    let mut pos = 0;
    while pos + pattern.len() <= haystack.len() {
        let Some(i) = find_byte(&haystack[pos..=haystack.len() - pattern.len()], first) else {
            break;
        };
        let start = pos + i;
        if haystack[start + 1..start + pattern.len()] == *rest {
            found.push(start);
        }
        pos = start + 1;
    }
    found
}
