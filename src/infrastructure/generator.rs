//! Documentation generator driven through external commands

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::config::GeneratorConfig;
use crate::domain::FragmentKind;
use crate::infrastructure::error::GeneratorError;
use crate::infrastructure::traits::{CommandLine, CommandRunner, FragmentGenerator};

/// Search path variable the generator module is resolved through.
const MODULE_PATH_VAR: &str = "PYTHONPATH";

/// Runs one configured command per fragment and takes its stdout as the content.
///
/// The generator module is located at an explicit path below the repository
/// root; the root is put first on the module search path of the child process
/// only, never on the search path of this process.
pub struct CommandGenerator {
    cmd: Arc<dyn CommandRunner>,
    config: GeneratorConfig,
    repository_root: PathBuf,
}

impl CommandGenerator {
    pub fn new(
        cmd: Arc<dyn CommandRunner>,
        config: GeneratorConfig,
        repository_root: &Path,
    ) -> Self {
        Self {
            cmd,
            config,
            repository_root: repository_root.to_path_buf(),
        }
    }

    fn argv(&self, kind: FragmentKind) -> &[String] {
        match kind {
            FragmentKind::NodeReference => &self.config.node_reference,
            FragmentKind::CApi => &self.config.c_api,
        }
    }

    /// Module search path with the repository root in front.
    fn module_search_path(&self) -> OsString {
        let existing = std::env::var_os(MODULE_PATH_VAR);
        let paths = std::iter::once(self.repository_root.clone())
            .chain(existing.iter().flat_map(|value| std::env::split_paths(value)));
        std::env::join_paths(paths)
            .unwrap_or_else(|_| self.repository_root.clone().into_os_string())
    }

    fn command_line(&self, kind: FragmentKind) -> Result<CommandLine, GeneratorError> {
        self.command_for(self.argv(kind)).ok_or_else(|| {
            GeneratorError::Unavailable(format!("no command configured for the {kind}"))
        })
    }

    /// `argv` run in the repository root with the module search path set.
    fn command_for(&self, argv: &[String]) -> Option<CommandLine> {
        let (program, args) = argv.split_first()?;
        Some(
            CommandLine::new(program.as_str())
                .args(args.iter().cloned())
                .current_dir(&self.repository_root)
                .env(MODULE_PATH_VAR, self.module_search_path()),
        )
    }

    /// Find the module as a package directory or a single `<module>.py`.
    fn locate_module(&self) -> Result<(), GeneratorError> {
        let package = self.repository_root.join(&self.config.module);
        let single_file = self
            .repository_root
            .join(format!("{}.py", self.config.module));
        if package.exists() || single_file.exists() {
            debug!(
                "acquire: found generator module below {}",
                self.repository_root.display()
            );
            Ok(())
        } else {
            Err(GeneratorError::Unavailable(format!(
                "module '{}' not found in {}",
                self.config.module,
                self.repository_root.display()
            )))
        }
    }

    /// Import the module without generating anything.
    fn load_module(&self) -> Result<(), GeneratorError> {
        let Some(command) = self.command_for(&self.config.load_check) else {
            debug!("acquire: load check disabled");
            return Ok(());
        };
        debug!("acquire: running {}", command);

        let output = self.cmd.run(&command).map_err(|e| {
            GeneratorError::Unavailable(format!("cannot start {}: {}", command.program, e))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GeneratorError::Unavailable(format!(
                "module '{}' failed to load: {}",
                self.config.module,
                stderr.trim_end()
            )));
        }
        Ok(())
    }
}

impl FragmentGenerator for CommandGenerator {
    fn acquire(&self) -> Result<(), GeneratorError> {
        if self.config.module.is_empty() {
            debug!("acquire: module check disabled");
            return Ok(());
        }
        self.locate_module()?;
        self.load_module()
    }

    #[instrument(skip(self))]
    fn generate(&self, kind: FragmentKind) -> Result<Vec<u8>, GeneratorError> {
        let command = self.command_line(kind)?;
        debug!("generate: running {}", command);

        let output = self.cmd.run(&command).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                GeneratorError::Unavailable(format!("cannot start {}: {}", command.program, e))
            }
            _ => GeneratorError::Failed(format!("run {}: {}", command.program, e)),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GeneratorError::Failed(format!(
                "{} exited with {}: {}",
                command.program,
                output.status,
                stderr.trim_end()
            )));
        }

        debug!("generate: {} produced {} bytes", kind, output.stdout.len());
        Ok(output.stdout)
    }
}
