#![no_main]

use embedfs::cipher;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte picks the key size, the rest is the ciphertext
    let Some((&selector, input)) = data.split_first() else {
        return;
    };
    let key_len = cipher::VALID_KEY_SIZES[selector as usize % 3];
    let key = vec![selector; key_len];

    // Arbitrary input must never panic and must never authenticate
    assert!(cipher::decrypt(&key, input).is_err());

    // Anything we seal ourselves must come back intact
    let sealed = cipher::encrypt(&key, input).expect("valid key size");
    let opened = cipher::decrypt(&key, &sealed).expect("roundtrip");
    assert_eq!(opened, input);
});
