//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/docbundle/docbundle.toml`
//! 3. Local config: `<repository_root>/.docbundle.toml`
//! 4. Environment variables: `DOCBUNDLE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{expand_env_vars, BuildLayout, DomainResult};

/// Where the build reads from and writes to, relative to the repository root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutConfig {
    /// Output directory (default: build/documentation)
    pub output_subpath: PathBuf,
    /// Authored documentation tree (default: documentation)
    pub static_docs_subpath: PathBuf,
    /// Entry document inside the output directory
    pub entry_document: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            output_subpath: PathBuf::from("build/documentation"),
            static_docs_subpath: PathBuf::from("documentation"),
            entry_document: PathBuf::from("libaudioverse_manual.asciidoc"),
        }
    }
}

/// Documentation generator invocation.
///
/// Each command is a full argv; the first element is the program.
/// Commands run in the repository root with the root prepended to `PYTHONPATH`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Generator module relative to the repository root (directory or `<module>.py`).
    /// Empty disables the availability check.
    pub module: String,
    /// Loads the module without generating anything. Empty skips loading.
    pub load_check: Vec<String>,
    pub node_reference: Vec<String>,
    pub c_api: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            module: "docgen".into(),
            load_check: vec!["python".into(), "-c".into(), "import docgen".into()],
            node_reference: python_call("make_node_reference"),
            c_api: python_call("make_c_api"),
        }
    }
}

fn python_call(function: &str) -> Vec<String> {
    vec![
        "python".into(),
        "-c".into(),
        format!("import sys, docgen; sys.stdout.write(docgen.{function}())"),
    ]
}

/// External document renderer invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RendererConfig {
    /// Renderer program (default: asciidoc)
    pub program: String,
    /// Extra arguments placed before the entry document
    pub args: Vec<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: "asciidoc".into(),
            args: vec![],
        }
    }
}

/// Raw layout config for intermediate parsing (`None` = not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawLayoutConfig {
    pub output_subpath: Option<PathBuf>,
    pub static_docs_subpath: Option<PathBuf>,
    pub entry_document: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawGeneratorConfig {
    pub module: Option<String>,
    pub load_check: Option<Vec<String>>,
    pub node_reference: Option<Vec<String>>,
    pub c_api: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawRendererConfig {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub layout: RawLayoutConfig,
    pub generator: RawGeneratorConfig,
    pub renderer: RawRendererConfig,
}

/// Unified configuration for docbundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    pub layout: LayoutConfig,
    pub generator: GeneratorConfig,
    pub renderer: RendererConfig,
}

/// Get the XDG config directory for docbundle.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "docbundle").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("docbundle.toml"))
}

/// Get the path to the local config file in a repository.
pub fn local_config_path(repository_root: &Path) -> PathBuf {
    repository_root.join(".docbundle.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Resolve the build layout below `repository_root`.
    pub fn layout_for(&self, repository_root: &Path) -> DomainResult<BuildLayout> {
        BuildLayout::new(
            repository_root,
            &self.layout.output_subpath,
            &self.layout.static_docs_subpath,
            &self.layout.entry_document,
        )
    }

    /// Expand shell variables and tilde in program names.
    fn expand_paths(&mut self) {
        self.renderer.program = expand_env_vars(&self.renderer.program);
        for argv in [
            &mut self.generator.load_check,
            &mut self.generator.node_reference,
            &mut self.generator.c_api,
        ] {
            if let Some(program) = argv.first_mut() {
                *program = expand_env_vars(program);
            }
        }
    }

    /// Overlay every field the raw layer specifies; keep the rest.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            layout: LayoutConfig {
                output_subpath: overlay
                    .layout
                    .output_subpath
                    .clone()
                    .unwrap_or_else(|| self.layout.output_subpath.clone()),
                static_docs_subpath: overlay
                    .layout
                    .static_docs_subpath
                    .clone()
                    .unwrap_or_else(|| self.layout.static_docs_subpath.clone()),
                entry_document: overlay
                    .layout
                    .entry_document
                    .clone()
                    .unwrap_or_else(|| self.layout.entry_document.clone()),
            },
            generator: GeneratorConfig {
                module: overlay
                    .generator
                    .module
                    .clone()
                    .unwrap_or_else(|| self.generator.module.clone()),
                load_check: overlay
                    .generator
                    .load_check
                    .clone()
                    .unwrap_or_else(|| self.generator.load_check.clone()),
                node_reference: overlay
                    .generator
                    .node_reference
                    .clone()
                    .unwrap_or_else(|| self.generator.node_reference.clone()),
                c_api: overlay
                    .generator
                    .c_api
                    .clone()
                    .unwrap_or_else(|| self.generator.c_api.clone()),
            },
            renderer: RendererConfig {
                program: overlay
                    .renderer
                    .program
                    .clone()
                    .unwrap_or_else(|| self.renderer.program.clone()),
                args: overlay
                    .renderer
                    .args
                    .clone()
                    .unwrap_or_else(|| self.renderer.args.clone()),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `repository_root` - Optional repository root holding `.docbundle.toml`
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/docbundle/docbundle.toml`
    /// 3. Local config: `<repository_root>/.docbundle.toml`
    /// 4. Environment variables: `DOCBUNDLE_*` prefix
    ///
    /// Every layer replaces only the fields it specifies; arrays are replaced whole.
    pub fn load(repository_root: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(root) = repository_root {
            let local_path = local_config_path(root);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;

        current.expand_paths();

        Ok(current)
    }

    /// Apply DOCBUNDLE_* environment variables as explicit overrides.
    ///
    /// Lists (`renderer.args`, generator commands) are comma separated.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("DOCBUNDLE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("renderer.args")
                .with_list_parse_key("generator.load_check")
                .with_list_parse_key("generator.node_reference")
                .with_list_parse_key("generator.c_api"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("layout.output_subpath") {
            settings.layout.output_subpath = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("layout.static_docs_subpath") {
            settings.layout.static_docs_subpath = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("layout.entry_document") {
            settings.layout.entry_document = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("generator.module") {
            settings.generator.module = val;
        }
        if let Some(val) = env_list(&config, "generator.load_check") {
            settings.generator.load_check = val;
        }
        if let Some(val) = env_list(&config, "generator.node_reference") {
            settings.generator.node_reference = val;
        }
        if let Some(val) = env_list(&config, "generator.c_api") {
            settings.generator.c_api = val;
        }
        if let Ok(val) = config.get_string("renderer.program") {
            settings.renderer.program = val;
        }
        if let Some(val) = env_list(&config, "renderer.args") {
            settings.renderer.args = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# docbundle configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/docbundle/docbundle.toml
#   Local:  <repository_root>/.docbundle.toml
#   Env:    DOCBUNDLE_* environment variables, e.g. DOCBUNDLE_RENDERER__PROGRAM
#
# Every layer replaces only the keys it sets.

[layout]
# Output directory, replaced on every build
# output_subpath = "build/documentation"

# Authored documentation copied into the output
# static_docs_subpath = "documentation"

# Document handed to the renderer (inside the output directory)
# entry_document = "libaudioverse_manual.asciidoc"

[generator]
# Generator module, checked before generation ("" disables the check)
# module = "docgen"

# Command that imports the module; a failure means the generator is unavailable
# load_check = ["python", "-c", "import docgen"]

# Commands printing each fragment on stdout (run in the repository root)
# node_reference = ["python", "-c", "import sys, docgen; sys.stdout.write(docgen.make_node_reference())"]
# c_api = ["python", "-c", "import sys, docgen; sys.stdout.write(docgen.make_c_api())"]

[renderer]
# program = "asciidoc"
# args = ["-b", "html5"]
"#
        .to_string()
    }
}

/// A comma separated list variable. A value without a comma may have been
/// parsed as a scalar; it becomes a one-element list.
fn env_list(config: &Config, key: &str) -> Option<Vec<String>> {
    config
        .get::<Vec<String>>(key)
        .ok()
        .or_else(|| config.get_string(key).ok().map(|value| vec![value]))
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
