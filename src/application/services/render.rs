//! External document renderer invocation

use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::RendererConfig;
use crate::domain::RenderResult;
use crate::infrastructure::traits::{CommandLine, CommandRunner};

/// Runs the configured renderer on an entry document.
pub struct RenderService {
    cmd: Arc<dyn CommandRunner>,
    config: RendererConfig,
}

impl RenderService {
    pub fn new(cmd: Arc<dyn CommandRunner>, config: RendererConfig) -> Self {
        Self { cmd, config }
    }

    /// Command line for `entry_document`: program, extra args, then the document.
    pub fn command_line(&self, entry_document: &Path) -> CommandLine {
        CommandLine::new(self.config.program.as_str())
            .args(self.config.args.iter().cloned())
            .arg(entry_document.to_string_lossy())
    }

    /// Render `entry_document`.
    ///
    /// No timeout applies: a hanging renderer blocks the caller.
    ///
    /// # Errors
    /// `Render` when the renderer cannot be spawned or exits unsuccessfully.
    /// The error carries the output captured so far.
    #[instrument(skip(self))]
    pub fn render(&self, entry_document: &Path) -> ApplicationResult<RenderResult> {
        let command = self.command_line(entry_document);
        debug!("render: running {}", command);

        let output = self
            .cmd
            .run_combined(&command)
            .map_err(|e| ApplicationError::Render {
                message: spawn_message(&command.program, &e),
                exit_code: None,
                output: String::new(),
                spawned: false,
            })?;

        let result = RenderResult {
            entry_document: entry_document.to_path_buf(),
            exit_code: output.exit_code,
            combined_output: output.output,
        };

        if !result.success() {
            let message = match result.exit_code {
                Some(code) => format!("{} exited with status {}", command.program, code),
                None => format!("{} was terminated by a signal", command.program),
            };
            return Err(ApplicationError::Render {
                message,
                exit_code: result.exit_code,
                output: result.combined_output,
                spawned: true,
            });
        }

        debug!(
            "render: {} finished, {} bytes of output",
            command.program,
            result.combined_output.len()
        );
        Ok(result)
    }
}

fn spawn_message(program: &str, error: &io::Error) -> String {
    match error.kind() {
        io::ErrorKind::NotFound => format!("{program} not found on PATH"),
        _ => format!("cannot start {program}: {error}"),
    }
}
