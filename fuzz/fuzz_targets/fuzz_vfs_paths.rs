#![no_main]

use embedfs::{AssetStore, EmbedError, Whence};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let mut lines = text.lines();
    let Some(query) = lines.next() else {
        return;
    };

    // Remaining lines become keys; invalid ones are rejected, never panic
    let mut store = AssetStore::new();
    for line in lines {
        let _ = store.insert(line, line.as_bytes().to_vec());
    }

    let Ok(mut file) = store.open(query) else {
        return;
    };
    if file.is_dir() {
        loop {
            match file.read_dir(2) {
                Ok(page) => assert!(!page.is_empty() && page.len() <= 2),
                Err(EmbedError::EndOfListing) => break,
                Err(e) => panic!("unexpected listing error: {}", e),
            }
        }
    } else {
        let len = file.len() as u64;
        assert!(file.seek_to(i64::MIN, Whence::Current) == 0);
        assert!(file.seek_to(i64::MAX, Whence::End) == len);
    }
});
