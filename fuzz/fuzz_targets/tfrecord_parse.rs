//! Fuzz target for TFRecord framing.
//!
//! Arbitrary bytes must either split into records or fail with a framing
//! error; reading never panics or allocates beyond the record length cap.
//!
//! Run with:
//!   cargo +nightly fuzz run tfrecord_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use shardlabel::tfrecord::{records_from_slice, TfRecordWriter};

fuzz_target!(|data: &[u8]| {
    let _ = records_from_slice(data);

    // Anything written must read back unchanged.
    let mut writer = TfRecordWriter::new(Vec::new());
    writer.write_record(data).expect("write to Vec");
    let framed = writer.into_inner().expect("flush Vec");
    let records = records_from_slice(&framed).expect("own output parses");
    assert_eq!(records, vec![data.to_vec()]);
});
