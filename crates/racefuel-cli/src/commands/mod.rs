//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod hash;
pub mod inspect;

use crate::error::{CliError, Result};
use std::path::Path;

/// Read a whole file, reporting a missing path as [`CliError::FileNotFound`]
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CliError::FileNotFound(path.display().to_string()),
        _ => CliError::Io(e),
    })
}
