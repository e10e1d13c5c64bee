#![no_main]
use libfuzzer_sys::fuzz_target;
use lzx_stream::{scan_cabinets, Cabinet};

fuzz_target!(|data: &[u8]| {
    let _ = scan_cabinets(data);

    let Ok(mut cabinet) = Cabinet::parse(data) else {
        return;
    };
    for index in 0..cabinet.files().len().min(16) {
        let _ = cabinet.extract(index);
    }
});
