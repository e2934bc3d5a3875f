/// Data acquisition.
///
/// Submodules:
/// - `radar` — radar composite download, checksum dedup and GIF decoding.

pub mod radar;
