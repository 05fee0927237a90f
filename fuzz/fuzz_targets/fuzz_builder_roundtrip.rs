#![no_main]
use arbitrary::Arbitrary;
use assetpack::{ArchiveBuilder, ArchiveReader, CompressionConfig};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    codec: u8,
    members: Vec<(String, Vec<u8>)>,
}

fuzz_target!(|input: Input| {
    let compression = match input.codec % 4 {
        0 => CompressionConfig::none(),
        1 => CompressionConfig::zlib(),
        2 => CompressionConfig::lz4(),
        _ => CompressionConfig::zstd(),
    };

    let mut builder = ArchiveBuilder::with_compression(compression);
    let mut added = Vec::new();
    for (name, data) in input.members {
        if builder.add_bytes(name.clone(), data.clone()).is_ok() {
            added.push((name, data));
        }
    }

    let mut bytes = Vec::new();
    builder.write_to(&mut bytes).unwrap();

    let archive = ArchiveReader::from_bytes(bytes).unwrap();
    assert_eq!(archive.len(), added.len());
    for (name, data) in &added {
        assert_eq!(&archive.read(name).unwrap(), data);
    }
});
