//! Documentation build pipeline
//!
//! Stages run strictly in order and any failure aborts the run without
//! rollback:
//!
//! 1. resolve paths: the layout is resolved and validated by
//!    `ServiceContainer` before a `BuildService` exists, inside its own
//!    `resolving-paths` span; `run` only records the resolved paths
//! 2. acquire the generator and produce both fragments
//! 3. replace the output directory with a copy of the static tree
//! 4. write the fragments into it
//! 5. render the entry document
//!
//! Generation completes before anything is deleted, so a generator failure
//! leaves an existing output directory untouched.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, info_span, instrument};

use crate::application::digest::tree_digest;
use crate::application::services::RenderService;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{
    Assembly, BuildLayout, BuildReport, BuildStage, Fragment, FragmentKind, OutputStatus,
    RenderResult,
};
use crate::infrastructure::traits::{FileSystem, FragmentGenerator};
use crate::infrastructure::GeneratorError;

/// Assembles and renders the documentation bundle.
pub struct BuildService {
    fs: Arc<dyn FileSystem>,
    generator: Arc<dyn FragmentGenerator>,
    renderer: RenderService,
    layout: BuildLayout,
}

impl BuildService {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        generator: Arc<dyn FragmentGenerator>,
        renderer: RenderService,
        layout: BuildLayout,
    ) -> Self {
        Self {
            fs,
            generator,
            renderer,
            layout,
        }
    }

    pub fn layout(&self) -> &BuildLayout {
        &self.layout
    }

    /// Run the whole pipeline. With `render == false` the run ends after the
    /// fragments are written.
    pub fn run(&self, render: bool) -> ApplicationResult<BuildReport> {
        let mut stage = BuildStage::ResolvingPaths;
        let result = self.run_stages(&mut stage, render);
        match &result {
            Ok(_) => info!("build finished"),
            Err(e) => {
                info!(failed_stage = %stage, "build aborted: {}", e);
                stage = BuildStage::Failed;
            }
        }
        debug_assert!(stage.is_terminal());
        debug!(final_stage = %stage, "run: done");
        result
    }

    fn run_stages(
        &self,
        stage: &mut BuildStage,
        render: bool,
    ) -> ApplicationResult<BuildReport> {
        in_stage(*stage, || {
            debug!(
                "root={} static={} output={}",
                self.layout.repository_root.display(),
                self.layout.static_docs_dir.display(),
                self.layout.output_dir.display()
            );
            Ok(())
        })?;

        *stage = stage.next();
        let fragments = in_stage(*stage, || self.generate())?;

        *stage = stage.next();
        in_stage(*stage, || self.reset_output())?;

        *stage = stage.next();
        let fragment_files = in_stage(*stage, || self.write_fragments(&fragments))?;

        let assembly = Assembly {
            output_dir: self.layout.output_dir.clone(),
            fragment_files,
        };
        let digest = tree_digest(self.fs.as_ref(), &self.layout.output_dir)?;
        info!(digest = %digest, "output assembled");

        let render_result = if render {
            *stage = stage.next();
            Some(in_stage(*stage, || self.render())?)
        } else {
            info!("rendering skipped");
            None
        };
        *stage = BuildStage::Done;

        Ok(BuildReport {
            assembly,
            tree_digest: digest,
            render: render_result,
        })
    }

    /// Assemble the output directory without rendering.
    pub fn assemble(&self) -> ApplicationResult<Assembly> {
        self.run(false).map(|report| report.assembly)
    }

    /// Acquire the generator and request every fragment, node reference first.
    #[instrument(skip(self))]
    pub fn generate(&self) -> ApplicationResult<Vec<Fragment>> {
        self.generator
            .acquire()
            .map_err(|e| ApplicationError::CollaboratorUnavailable {
                reason: e.to_string(),
            })?;

        FragmentKind::ALL
            .iter()
            .map(|&kind| -> ApplicationResult<Fragment> {
                let content = self.generator.generate(kind).map_err(|e| match e {
                    GeneratorError::Unavailable(reason) => {
                        ApplicationError::CollaboratorUnavailable { reason }
                    }
                    GeneratorError::Failed(message) => {
                        ApplicationError::Generation { kind, message }
                    }
                })?;
                debug!("generate: {} is {} bytes", kind, content.len());
                Ok(Fragment::new(kind, content))
            })
            .collect()
    }

    /// Delete the output directory if present, then copy the static tree into it.
    #[instrument(skip(self))]
    pub fn reset_output(&self) -> ApplicationResult<()> {
        let output = &self.layout.output_dir;
        if self.fs.exists(output) {
            debug!("reset_output: removing {}", output.display());
            self.fs
                .remove_dir_all(output)
                .with_path_context("remove output directory", output)?;
        }

        self.fs
            .ensure_parent(output)
            .with_path_context("create parent of output directory", output)?;
        self.fs
            .copy_dir(&self.layout.static_docs_dir, output)
            .with_path_context("copy static docs", &self.layout.static_docs_dir)?;
        Ok(())
    }

    /// Write each fragment to its fixed file name, replacing existing content.
    #[instrument(skip(self, fragments))]
    pub fn write_fragments(&self, fragments: &[Fragment]) -> ApplicationResult<Vec<PathBuf>> {
        fragments
            .iter()
            .map(|fragment| -> ApplicationResult<PathBuf> {
                let path = self.layout.fragment_path(fragment.kind);
                self.fs
                    .write(&path, &fragment.content)
                    .with_path_context("write fragment", &path)?;
                debug!("write_fragments: wrote {}", path.display());
                Ok(path)
            })
            .collect()
    }

    /// Render the entry document of the assembled output.
    pub fn render(&self) -> ApplicationResult<RenderResult> {
        self.renderer.render(&self.layout.entry_document)
    }

    /// Render an output directory assembled by an earlier run.
    ///
    /// # Errors
    /// `Filesystem` if the entry document does not exist.
    pub fn render_existing(&self) -> ApplicationResult<RenderResult> {
        let entry = &self.layout.entry_document;
        if !self.fs.is_file(entry) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "entry document missing, run a build first",
            ))
            .with_path_context("render", entry);
        }
        in_stage(BuildStage::Rendering, || self.render())
    }

    /// Remove the output directory. Returns whether anything was removed.
    pub fn clean(&self) -> ApplicationResult<bool> {
        let output = &self.layout.output_dir;
        if !self.fs.exists(output) {
            return Ok(false);
        }
        self.fs
            .remove_dir_all(output)
            .with_path_context("remove output directory", output)?;
        info!("removed {}", output.display());
        Ok(true)
    }

    /// Inspect the output directory without changing it.
    pub fn status(&self) -> ApplicationResult<OutputStatus> {
        let output = &self.layout.output_dir;
        let exists = self.fs.is_dir(output);
        let fragments_present = FragmentKind::ALL
            .iter()
            .copied()
            .filter(|&kind| self.fs.is_file(&self.layout.fragment_path(kind)))
            .collect();
        let tree_digest = if exists {
            Some(tree_digest(self.fs.as_ref(), output)?)
        } else {
            None
        };

        Ok(OutputStatus {
            output_dir: output.clone(),
            exists,
            entry_document_present: self.fs.is_file(&self.layout.entry_document),
            fragments_present,
            tree_digest,
        })
    }
}

/// Run `step` inside a tracing span named after `stage`.
fn in_stage<T>(
    stage: BuildStage,
    step: impl FnOnce() -> ApplicationResult<T>,
) -> ApplicationResult<T> {
    let _span = info_span!("stage", %stage).entered();
    info!("entering {}", stage);
    step()
}
