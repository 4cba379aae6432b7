//! Fuzz target for record payload decoding and the schema check.
//!
//! Run with:
//!   cargo +nightly fuzz run example_schema_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use prost::Message;
use shardlabel::record::example::Example;
use shardlabel::record::Record;

fuzz_target!(|data: &[u8]| {
    if let Ok(example) = Example::decode(data) {
        if let Ok(record) = Record::from_example(&example) {
            // A record that passes the schema survives re-encoding byte for byte.
            let bytes = record.encode_to_vec();
            let again = Example::decode(bytes.as_slice()).expect("re-decode");
            let again = Record::from_example(&again).expect("re-check schema");
            assert_eq!(again.encode_to_vec(), bytes);
        }
    }
});
