// SPDX-License-Identifier: MIT

//! Compute a cryptographic digest of a file's contents.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use openssl::hash::{Hasher, MessageDigest};

use crate::error::ChecksumError;

/// The algorithm used when none is requested.
pub const DEFAULT_ALGORITHM: &str = "MD5";

/// Stream `path` through the named digest and return the lowercase hex form.
pub fn digest_file(path: &Path, algorithm: &str) -> Result<String, ChecksumError> {
    let digest = lookup(algorithm)?;
    let mut file = File::open(path).map_err(|source| ChecksumError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Hasher::new(digest)?;
    let mut chunk = [0_u8; 64 * 1024];
    loop {
        let count = file.read(&mut chunk).map_err(|source| ChecksumError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        if count == 0 {
            break;
        }
        hasher.update(&chunk[..count])?;
    }

    Ok(to_hex(&hasher.finish()?))
}

// OpenSSL's digest table accepts "md5" and "sha256" but not the "SHA-256"
// spelling people type; try the name as given, then a normalized form.
fn lookup(name: &str) -> Result<MessageDigest, ChecksumError> {
    let name = name.trim();
    MessageDigest::from_name(name)
        .or_else(|| MessageDigest::from_name(&name.to_ascii_lowercase().replace('-', "")))
        .ok_or_else(|| ChecksumError::UnknownAlgorithm(name.to_string()))
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
}
