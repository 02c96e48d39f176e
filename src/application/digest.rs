//! Content digest of an assembled output tree
//!
//! Two trees have the same digest exactly when they hold the same relative
//! file paths with the same bytes.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::application::{ApplicationResult, IoResultExt};
use crate::infrastructure::traits::FileSystem;

/// Compute the digest of every file below `dir`.
///
/// Files are visited in sorted order; each contributes its relative path
/// (with `/` separators), a NUL, its length and its bytes. Directories only
/// contribute through the files they contain.
///
/// # Errors
/// `Filesystem` if the tree cannot be walked or a file cannot be read.
pub fn tree_digest(fs: &dyn FileSystem, dir: &Path) -> ApplicationResult<String> {
    let mut hasher = Sha256::new();

    for path in fs
        .list_files(dir)
        .with_path_context("walk output tree", dir)?
    {
        let rel_path = path.strip_prefix(dir).unwrap_or(&path);
        let rel_name = rel_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let content = fs.read(&path).with_path_context("read for digest", &path)?;

        hasher.update(rel_name.as_bytes());
        hasher.update([0u8]);
        hasher.update((content.len() as u64).to_le_bytes());
        hasher.update(&content);
    }

    Ok(hex::encode(hasher.finalize()))
}
