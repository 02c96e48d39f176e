use std::path::{Path, PathBuf};

use crate::domain::{DomainError, DomainResult};

/// Resolve the repository root.
///
/// An explicit root wins and is made absolute against the current directory.
/// Otherwise the root is the grandparent of the running executable, i.e. the
/// parent of the directory the helper is installed in (`<root>/scripts/`).
pub fn resolve_repository_root(explicit: Option<&Path>) -> DomainResult<PathBuf> {
    match explicit {
        Some(root) => to_absolute(root),
        None => {
            let exe = std::env::current_exe().map_err(|e| DomainError::PathResolution {
                path: PathBuf::from("<current executable>"),
                reason: e.to_string(),
            })?;
            root_from_executable(&exe)
        }
    }
}

/// Grandparent directory of `exe`.
pub fn root_from_executable(exe: &Path) -> DomainResult<PathBuf> {
    exe.parent()
        .and_then(Path::parent)
        .filter(|root| !root.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .ok_or_else(|| DomainError::PathResolution {
            path: exe.to_path_buf(),
            reason: "executable has no grandparent directory".to_string(),
        })
}

fn to_absolute(path: &Path) -> DomainResult<PathBuf> {
    std::path::absolute(path).map_err(|e| DomainError::PathResolution {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
