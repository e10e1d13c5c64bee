#![no_main]
use libfuzzer_sys::fuzz_target;
use lzx_stream::parsing::RecoveryControlParser;

fuzz_target!(|data: &[u8]| {
    if let Ok(control) = RecoveryControlParser::parse(data) {
        for entry in &control.entries {
            let _ = control.short_path(entry);
            let _ = control.long_path(entry);
        }
    }
});
