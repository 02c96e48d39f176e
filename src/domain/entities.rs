//! Core domain entities

use std::fmt;
use std::path::PathBuf;

/// Kind of generated fragment embedded into the manual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// Reference of every node type
    NodeReference,
    /// Reference of the public C API
    CApi,
}

impl FragmentKind {
    /// Generation order. The node reference is always requested first.
    pub const ALL: [FragmentKind; 2] = [FragmentKind::NodeReference, FragmentKind::CApi];

    /// Fixed file name the entry document includes.
    pub fn file_name(self) -> &'static str {
        match self {
            FragmentKind::NodeReference => "node_reference.asciidoc",
            FragmentKind::CApi => "c_api.asciidoc",
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentKind::NodeReference => write!(f, "node reference"),
            FragmentKind::CApi => write!(f, "C API reference"),
        }
    }
}

/// Generated text blob, held in memory until it is written into the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub content: Vec<u8>,
}

impl Fragment {
    pub fn new(kind: FragmentKind, content: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }
}

/// Pipeline stages, entered strictly in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    ResolvingPaths,
    Generating,
    ResettingOutput,
    WritingFragments,
    Rendering,
    Done,
    Failed,
}

impl BuildStage {
    /// Stage following `self` on success. Terminal stages map to themselves.
    pub fn next(self) -> Self {
        match self {
            BuildStage::ResolvingPaths => BuildStage::Generating,
            BuildStage::Generating => BuildStage::ResettingOutput,
            BuildStage::ResettingOutput => BuildStage::WritingFragments,
            BuildStage::WritingFragments => BuildStage::Rendering,
            BuildStage::Rendering => BuildStage::Done,
            BuildStage::Done => BuildStage::Done,
            BuildStage::Failed => BuildStage::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BuildStage::Done | BuildStage::Failed)
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStage::ResolvingPaths => "resolving-paths",
            BuildStage::Generating => "generating",
            BuildStage::ResettingOutput => "resetting-output",
            BuildStage::WritingFragments => "writing-fragments",
            BuildStage::Rendering => "rendering",
            BuildStage::Done => "done",
            BuildStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a renderer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
    /// Entry document handed to the renderer
    pub entry_document: PathBuf,
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    /// Interleaved stdout and stderr
    pub combined_output: String,
}

impl RenderResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Summary of a completed assembly (steps up to writing fragments).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub output_dir: PathBuf,
    /// Fragment files in generation order
    pub fragment_files: Vec<PathBuf>,
}

/// Summary of a full build run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub assembly: Assembly,
    /// SHA-256 digest of the output tree right after assembly
    pub tree_digest: String,
    /// `None` when rendering was skipped
    pub render: Option<RenderResult>,
}

/// Current state of the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputStatus {
    pub output_dir: PathBuf,
    pub exists: bool,
    pub entry_document_present: bool,
    /// Fragment kinds whose file is present, in generation order
    pub fragments_present: Vec<FragmentKind>,
    /// `None` when the output directory does not exist
    pub tree_digest: Option<String>,
}

/// Expand `~`, `$VAR` and `${VAR}` in a string, leaving it unchanged on failure.
pub fn expand_env_vars(value: &str) -> String {
    shellexpand::full(value)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| value.to_string())
}
