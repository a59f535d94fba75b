//! Fuzz test for the cache-key codec
//!
//! Feeds arbitrary byte sequences through both directions of the codec to
//! find:
//! - Panics or crashes in decode
//! - Round-trip violations for hostile field values
//!
//! Run with: cargo +nightly fuzz run key_codec_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use plotnav_storage::CacheKey;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    // Arbitrary bytes as a candidate storage key: decode must never panic,
    // and any key that decodes must re-encode to a key that decodes back
    // to the same pair.
    if let Ok(decoded) = CacheKey::decode(input) {
        let reencoded = decoded.encode();
        let again = CacheKey::decode(&reencoded).expect("re-encoded key must decode");
        assert_eq!(decoded, again, "decode/encode/decode must be stable");
    }

    // Arbitrary field pair: the round-trip must recover both fields exactly,
    // whatever bytes they contain.
    if let Some((repository, collection)) = input.split_once('\n') {
        let key = CacheKey::new(repository, collection);
        let decoded = CacheKey::decode(&key.encode()).expect("encoded key must decode");
        assert_eq!(decoded.repository(), repository);
        assert_eq!(decoded.collection(), collection);
    }
});
