#![no_main]
use libfuzzer_sys::fuzz_target;
use lzx_stream::LzxSession;

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    // First byte picks the window (2^15..=2^21), next two the frame length.
    let window_bits = 15 + u32::from(data[0]) % 7;
    let output_len = usize::from(u16::from_le_bytes([data[1], data[2]])) % 0x8001;

    let Ok(mut session) = LzxSession::new(1 << window_bits) else {
        return;
    };

    // Feed the rest as up to four consecutive frames.
    for frame in data[3..].chunks(data.len() / 4 + 1) {
        if session.decompress(frame, output_len).is_err() {
            break;
        }
    }
});
