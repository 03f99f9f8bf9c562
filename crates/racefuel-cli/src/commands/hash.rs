//! `racefuel hash` command implementation
//!
//! Prints the digest in `sha256sum` layout so it can be piped into the same
//! tooling.

use std::path::Path;

use racefuel_common::checksum;
use tracing::debug;

use super::read_file;
use crate::error::Result;

pub fn run(file: &Path) -> Result<()> {
    let digest = digest_file(file)?;
    println!("{}  {}", digest, file.display());
    Ok(())
}

/// Hex SHA-256 of the file's bytes, as stored in `gpxHash`
pub fn digest_file(file: &Path) -> Result<String> {
    let bytes = read_file(file)?;
    debug!(file = %file.display(), size = bytes.len(), "Hashing file");
    Ok(checksum::sha256_hex(&bytes))
}
