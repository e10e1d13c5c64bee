//! Stream builders shared by container tests.

/// One LZX uncompressed block holding `data`, as a single frame.
///
/// The first frame of a folder also carries the stream header bit.
pub fn lzx_stored(data: &[u8], first: bool) -> Vec<u8> {
    let mut bits = Vec::new();
    let mut push = |value: u32, n: u32| {
        for i in (0..n).rev() {
            bits.push((value >> i) & 1 == 1);
        }
    };
    if first {
        push(0, 1); // no E8 translation
    }
    push(3, 3);
    push(data.len() as u32, 24);
    let pad = 16 - bits.len() % 16;
    bits.extend(std::iter::repeat(false).take(pad));

    let mut out = Vec::new();
    for word in bits.chunks(16) {
        let word = word.iter().fold(0u16, |acc, &b| (acc << 1) | u16::from(b));
        out.extend_from_slice(&word.to_le_bytes());
    }
    for _ in 0..3 {
        out.extend_from_slice(&1u32.to_le_bytes());
    }
    out.extend_from_slice(data);
    if data.len() % 2 == 1 {
        out.push(0);
    }
    out
}
