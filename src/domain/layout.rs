//! Resolved filesystem layout of a documentation build

use std::path::{Component, Path, PathBuf};

use crate::domain::entities::FragmentKind;
use crate::domain::error::{DomainError, DomainResult};

/// Every path a build touches, derived from the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    pub repository_root: PathBuf,
    /// Authored documentation copied verbatim
    pub static_docs_dir: PathBuf,
    /// Build output, replaced on every run
    pub output_dir: PathBuf,
    /// Document handed to the renderer, inside `output_dir`
    pub entry_document: PathBuf,
}

impl BuildLayout {
    /// Resolve the layout below `repository_root`.
    ///
    /// All subpaths must be relative and may not climb out of the root.
    /// The output directory and the static tree must not overlap: resetting the
    /// output would otherwise delete authored sources.
    pub fn new(
        repository_root: &Path,
        output_subpath: &Path,
        static_docs_subpath: &Path,
        entry_document: &Path,
    ) -> DomainResult<Self> {
        let output_rel = normalize_relative("output_subpath", output_subpath)?;
        let static_rel = normalize_relative("static_docs_subpath", static_docs_subpath)?;
        let entry_rel = normalize_relative("entry_document", entry_document)?;

        if output_rel.starts_with(&static_rel) || static_rel.starts_with(&output_rel) {
            return Err(DomainError::InvalidLayout {
                field: "output_subpath",
                reason: format!(
                    "{} overlaps static docs {}",
                    output_rel.display(),
                    static_rel.display()
                ),
            });
        }

        let output_dir = repository_root.join(&output_rel);
        Ok(Self {
            repository_root: repository_root.to_path_buf(),
            static_docs_dir: repository_root.join(static_rel),
            entry_document: output_dir.join(entry_rel),
            output_dir,
        })
    }

    /// Where a fragment of `kind` is written.
    pub fn fragment_path(&self, kind: FragmentKind) -> PathBuf {
        self.output_dir.join(kind.file_name())
    }
}

/// Strip `.` components and reject anything that is not a plain relative path.
fn normalize_relative(field: &'static str, path: &Path) -> DomainResult<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(DomainError::InvalidLayout {
                    field,
                    reason: format!("{} escapes the repository root", path.display()),
                })
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(DomainError::InvalidLayout {
                    field,
                    reason: format!("{} must be relative", path.display()),
                })
            }
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(DomainError::InvalidLayout {
            field,
            reason: "path is empty".to_string(),
        });
    }
    Ok(normalized)
}
