//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Deterministic, incompressible bytes.
pub fn noise(len: usize) -> Vec<u8> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

/// An archive laid out like the published NConvert download, with an
/// executable of `exe_len` bytes. Returns the archive and the executable.
pub fn nconvert_archive(exe_len: usize) -> (Vec<u8>, Vec<u8>) {
    let exe = noise(exe_len);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    writer.add_directory("NConvert/", options).unwrap();
    writer.start_file("NConvert/nconvert.exe", options).unwrap();
    writer.write_all(&exe).unwrap();
    writer.start_file("NConvert/ReadMe.txt", options).unwrap();
    writer.write_all(b"NConvert readme").unwrap();
    writer.add_directory("NConvert/Plugins/", options).unwrap();
    writer.start_file("NConvert/Plugins/webp.dll", options).unwrap();
    writer.write_all(b"plugin").unwrap();

    let archive = writer.finish().unwrap().into_inner();
    (archive, exe)
}
