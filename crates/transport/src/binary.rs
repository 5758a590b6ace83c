//! Capture binary resolution
//!
//! Capture children may only be launched from an explicit, ordered list of
//! allowed directories (`bin_paths` in the configuration). Resolution walks
//! the list and takes the first match; anything outside the list, including
//! path-qualified names, is refused.

use std::path::{Path, PathBuf};

use crate::error::TransportError;
use crate::Result;

/// Resolve a capture binary name against the allowed search paths
///
/// The first path containing an executable regular file named `name` wins.
///
/// # Errors
///
/// - [`TransportError::PathQualifiedName`] if `name` contains a separator
/// - [`TransportError::BinaryNotFound`] if no allowed path contains it
pub fn resolve_binary(name: &str, bin_paths: &[PathBuf]) -> Result<PathBuf> {
    if name.is_empty() || name.contains(std::path::MAIN_SEPARATOR) || name.contains('/') {
        return Err(TransportError::PathQualifiedName {
            name: name.to_string(),
        });
    }

    for dir in bin_paths {
        let candidate = dir.join(name);
        if is_executable_file(&candidate) {
            tracing::debug!(
                binary = name,
                path = %candidate.display(),
                "resolved capture binary"
            );
            return Ok(candidate);
        }
    }

    Err(TransportError::not_found(name, bin_paths))
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}
