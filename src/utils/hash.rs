//! Content hashing for uploaded assets using blake3.
//!
//! The hash travels with every upload so the engine can skip objects
//! whose bytes did not change since the previous deploy.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use serde::{Serialize, Serializer};

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Hash in-memory bytes.
#[cfg(test)]
pub fn compute(data: impl AsRef<[u8]>) -> ContentHash {
    ContentHash::new(*blake3::hash(data.as_ref()).as_bytes())
}

/// Hash a file by streaming its contents.
pub fn compute_file(path: &Path) -> io::Result<ContentHash> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(64 * 1024, file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buffer[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(ContentHash::new(*hasher.finalize().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_file_hash_matches_bytes_hash() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("app.js");
        fs::write(&file, "console.log(1)").unwrap();

        assert_eq!(compute_file(&file).unwrap(), compute("console.log(1)"));
    }

    #[test]
    fn test_content_change_changes_hash() {
        assert_ne!(compute("a"), compute("b"));
        assert_eq!(compute("a").to_hex().len(), 64);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(compute_file(&dir.path().join("nope")).is_err());
    }
}
