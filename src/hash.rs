use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Chunk size for streaming file digests
const HASH_CHUNK_SIZE: usize = 8192;

/// Compute the MD5 digest of a file as a lowercase hex string.
///
/// The file is read in fixed-size chunks so arbitrarily large files
/// never have to fit in memory. The digest is only used for equality
/// comparison between sidecar images, not for anything cryptographic.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut context = md5::Context::new();
    let mut chunk = [0u8; HASH_CHUNK_SIZE];

    loop {
        let read = file.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        context.consume(&chunk[..read]);
    }

    Ok(format!("{:x}", context.finalize()))
}
