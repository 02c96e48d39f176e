//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info_span};

use crate::application::services::{BuildService, RenderService};
use crate::config::Settings;
use crate::domain::{BuildLayout, BuildStage, DomainResult};
use crate::infrastructure::generator::CommandGenerator;
use crate::infrastructure::traits::{
    CommandRunner, FileSystem, FragmentGenerator, RealCommandRunner, RealFileSystem,
};

/// Container holding the resolved layout and every I/O boundary.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Paths of this build
    pub layout: BuildLayout,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Command runner abstraction
    pub cmd: Arc<dyn CommandRunner>,

    /// Documentation generator
    pub generator: Arc<dyn FragmentGenerator>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    ///
    /// # Errors
    /// `InvalidLayout` if the configured subpaths are unusable.
    pub fn new(settings: Settings, repository_root: &Path) -> DomainResult<Self> {
        let cmd: Arc<dyn CommandRunner> = Arc::new(RealCommandRunner);
        let generator = Arc::new(CommandGenerator::new(
            Arc::clone(&cmd),
            settings.generator.clone(),
            repository_root,
        ));
        Self::with_deps(
            settings,
            repository_root,
            Arc::new(RealFileSystem),
            cmd,
            generator,
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        repository_root: &Path,
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
        generator: Arc<dyn FragmentGenerator>,
    ) -> DomainResult<Self> {
        let layout = {
            let _span = info_span!("stage", stage = %BuildStage::ResolvingPaths).entered();
            settings
                .layout_for(repository_root)
                .inspect_err(|e| debug!("layout rejected: {}", e))?
        };
        let settings = Arc::new(settings);

        Ok(Self {
            settings,
            layout,
            fs,
            cmd,
            generator,
        })
    }

    pub fn render_service(&self) -> RenderService {
        RenderService::new(Arc::clone(&self.cmd), self.settings.renderer.clone())
    }

    pub fn build_service(&self) -> BuildService {
        BuildService::new(
            Arc::clone(&self.fs),
            Arc::clone(&self.generator),
            self.render_service(),
            self.layout.clone(),
        )
    }
}
