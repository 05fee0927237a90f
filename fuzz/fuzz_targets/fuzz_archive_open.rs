#![no_main]
use assetpack::ArchiveReader;
use libfuzzer_sys::fuzz_target;

// Arbitrary bytes must either parse or fail with an error, never panic
fuzz_target!(|data: &[u8]| {
    let archive = match ArchiveReader::from_bytes(data.to_vec()) {
        Ok(a) => a,
        Err(_) => return,
    };

    for name in archive.list() {
        let _ = archive.read(&name);
    }
});
