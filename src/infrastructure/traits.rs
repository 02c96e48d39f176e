//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::domain::FragmentKind;
use crate::infrastructure::error::GeneratorError;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write bytes to file, replacing any existing content.
    fn write(&self, path: &Path, content: &[u8]) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a file.
    fn is_file(&self, path: &Path) -> bool;

    /// Check if path is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Remove a directory and all its contents.
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Copy directory recursively from source to destination.
    fn copy_dir(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Every regular file below `dir`, in sorted order, following symlinks.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// A fully described child process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    pub env: Vec<(String, OsString)>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null());
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }
        command
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Exit code and interleaved stdout/stderr of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub output: String,
}

/// External command runner abstraction.
pub trait CommandRunner: Send + Sync {
    /// Run a command, capturing stdout and stderr separately.
    fn run(&self, command: &CommandLine) -> io::Result<Output>;

    /// Run a command with stdout and stderr sharing one pipe.
    fn run_combined(&self, command: &CommandLine) -> io::Result<CombinedOutput>;
}

/// Source of the generated documentation fragments.
pub trait FragmentGenerator: Send + Sync {
    /// Verify the generator can be reached.
    /// Called once before any fragment is requested.
    fn acquire(&self) -> Result<(), GeneratorError>;

    /// Produce the complete content of one fragment.
    fn generate(&self, kind: FragmentKind) -> Result<Vec<u8>, GeneratorError>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir_all(path)
    }

    fn copy_dir(&self, from: &Path, to: &Path) -> io::Result<()> {
        use walkdir::WalkDir;

        if !from.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("not a directory: {}", from.display()),
            ));
        }

        std::fs::create_dir_all(to)?;
        // Symlinks are followed so the copy holds real files, never links
        // back into the source tree.
        for entry in WalkDir::new(from).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            let rel_path = entry
                .path()
                .strip_prefix(from)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
            let target = to.join(rel_path);

            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&target)?;
            } else {
                std::fs::copy(entry.path(), &target)?;
            }
        }
        Ok(())
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        use walkdir::WalkDir;

        let mut files = Vec::new();
        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Real command runner implementation.
#[derive(Debug, Default)]
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run(&self, command: &CommandLine) -> io::Result<Output> {
        command.to_command().output()
    }

    fn run_combined(&self, command: &CommandLine) -> io::Result<CombinedOutput> {
        let (mut reader, writer) = io::pipe()?;

        // The parent's write ends must be closed before reading, otherwise
        // the reader never sees EOF.
        let mut child = {
            let mut process = command.to_command();
            process.stdout(writer.try_clone()?).stderr(writer);
            process.spawn()?
        };

        let mut buffer = Vec::new();
        let read_result = reader.read_to_end(&mut buffer);
        let status = child.wait()?;
        read_result?;

        Ok(CombinedOutput {
            exit_code: status.code(),
            output: String::from_utf8_lossy(&buffer).into_owned(),
        })
    }
}
