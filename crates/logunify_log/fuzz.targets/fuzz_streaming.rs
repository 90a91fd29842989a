#![no_main]
use libfuzzer_sys::fuzz_target;
use logunify_core::VersionTag;
use logunify_log::{RecordReader, StreamOrigin};

fuzz_target!(|data: &[u8]| {
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    runtime.block_on(async {
        let mut reader = RecordReader::new(data, StreamOrigin::LocalFile);
        if reader.read_header(&VersionTag::new("fuzz")).await.is_err() {
            return;
        }
        // Every frame consumes input, so this terminates
        while let Ok(Some(_)) = reader.read_event().await {}
    });
});
