#![no_main]
use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use logunify_log::RecordCodec;
use tokio_util::codec::{Decoder, Encoder};

fuzz_target!(|data: &[u8]| {
    let mut codec = RecordCodec::new();
    let mut buf = BytesMut::from(data);

    // Any decoded record must survive a re-encode unchanged
    while let Ok(Some(record)) = codec.decode(&mut buf) {
        let mut encoded = BytesMut::new();
        codec.encode(record.borrowed(), &mut encoded).unwrap();
        let again = codec.decode(&mut encoded).unwrap();
        assert_eq!(again.as_ref(), Some(&record));
        assert!(encoded.is_empty());
    }
});
