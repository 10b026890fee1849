#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Stored bytes may be corrupt; decoding must fail cleanly, never panic.
    if let Ok(record) = kahukura_store_lmdb::codec::decode_record(data) {
        let bytes = kahukura_store_lmdb::codec::encode_record(&record).unwrap();
        let again = kahukura_store_lmdb::codec::decode_record(&bytes).unwrap();
        assert_eq!(record, again);
    }
    let _ = bincode::deserialize::<kahukura_types::ModerationLogEntry>(data);
});
