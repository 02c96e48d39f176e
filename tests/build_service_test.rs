//! Tests for BuildService: the assemble-then-render pipeline

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use docbundle::application::digest::tree_digest;
use docbundle::application::services::BuildService;
use docbundle::application::ApplicationError;
use docbundle::cli::CliError;
use docbundle::config::Settings;
use docbundle::domain::{DomainError, FragmentKind};
use docbundle::exitcode;
use docbundle::infrastructure::di::ServiceContainer;
use docbundle::infrastructure::traits::{
    CombinedOutput, CommandLine, CommandRunner, FragmentGenerator, RealCommandRunner,
    RealFileSystem,
};
use docbundle::infrastructure::GeneratorError;
use docbundle::util::testing;

const ENTRY: &str = "libaudioverse_manual.asciidoc";

/// Generator returning canned fragments and recording requests.
struct FakeGenerator {
    available: bool,
    node_reference: Result<Vec<u8>, GeneratorError>,
    c_api: Result<Vec<u8>, GeneratorError>,
    requested: Mutex<Vec<FragmentKind>>,
}

impl FakeGenerator {
    fn returning(node_reference: &str, c_api: &str) -> Self {
        Self {
            available: true,
            node_reference: Ok(node_reference.as_bytes().to_vec()),
            c_api: Ok(c_api.as_bytes().to_vec()),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn failing_first() -> Self {
        Self {
            node_reference: Err(GeneratorError::Failed("Traceback: boom".into())),
            ..Self::returning("NODE", "CAPI")
        }
    }

    fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::returning("NODE", "CAPI")
        }
    }

    fn requested(&self) -> Vec<FragmentKind> {
        self.requested.lock().unwrap().clone()
    }
}

impl FragmentGenerator for FakeGenerator {
    fn acquire(&self) -> Result<(), GeneratorError> {
        if self.available {
            Ok(())
        } else {
            Err(GeneratorError::Unavailable("module 'docgen' not found".into()))
        }
    }

    fn generate(&self, kind: FragmentKind) -> Result<Vec<u8>, GeneratorError> {
        self.requested.lock().unwrap().push(kind);
        match kind {
            FragmentKind::NodeReference => self.node_reference.clone(),
            FragmentKind::CApi => self.c_api.clone(),
        }
    }
}

/// Renderer stand-in returning a fixed exit code and recording invocations.
struct MockRunner {
    exit_code: Option<i32>,
    output: String,
    calls: Mutex<Vec<CommandLine>>,
}

impl MockRunner {
    fn exiting(exit_code: i32, output: &str) -> Self {
        Self {
            exit_code: Some(exit_code),
            output: output.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<CommandLine> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, _command: &CommandLine) -> io::Result<Output> {
        Err(io::Error::new(io::ErrorKind::Other, "not used by the pipeline"))
    }

    fn run_combined(&self, command: &CommandLine) -> io::Result<CombinedOutput> {
        self.calls.lock().unwrap().push(command.clone());
        Ok(CombinedOutput {
            exit_code: self.exit_code,
            output: self.output.clone(),
        })
    }
}

/// Repository with a static tree holding the entry document and `a.asciidoc`.
fn create_repository() -> TempDir {
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("documentation");
    fs::create_dir_all(&docs).unwrap();
    fs::write(
        docs.join(ENTRY),
        "= Manual\ninclude::node_reference.asciidoc[]\ninclude::c_api.asciidoc[]\n",
    )
    .unwrap();
    fs::write(docs.join("a.asciidoc"), "== A\n").unwrap();
    temp
}

/// Log sink shared with a scoped tracing subscriber.
#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Run `f` with events at or above `level` written to this sink.
    fn capture<T>(&self, level: tracing::Level, f: impl FnOnce() -> T) -> T {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn output_dir(root: &Path) -> PathBuf {
    root.join("build").join("documentation")
}

fn service(
    root: &Path,
    generator: Arc<dyn FragmentGenerator>,
    runner: Arc<dyn CommandRunner>,
) -> BuildService {
    ServiceContainer::with_deps(
        Settings::default(),
        root,
        Arc::new(RealFileSystem),
        runner,
        generator,
    )
    .expect("valid layout")
    .build_service()
}

fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = walk(dir)
        .into_iter()
        .map(|p| {
            p.strip_prefix(dir)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    names.sort();
    names
}

fn walk(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files.extend(walk(&path));
        } else {
            files.push(path);
        }
    }
    files
}

// ============================================================
// Assembly
// ============================================================

#[test]
fn given_static_tree_and_fragments_when_assembling_then_output_holds_both() {
    // Arrange
    let repo = create_repository();
    let service = service(
        repo.path(),
        Arc::new(FakeGenerator::returning("NODE", "CAPI")),
        Arc::new(MockRunner::exiting(0, "")),
    );

    // Act
    let assembly = service.assemble().unwrap();

    // Assert
    let out = output_dir(repo.path());
    assert_eq!(assembly.output_dir, out);
    assert_eq!(service.layout().output_dir, out);
    assert_eq!(
        list_files(&out),
        vec![
            "a.asciidoc",
            "c_api.asciidoc",
            ENTRY,
            "node_reference.asciidoc"
        ]
    );
    assert_eq!(fs::read(out.join("node_reference.asciidoc")).unwrap(), b"NODE");
    assert_eq!(fs::read(out.join("c_api.asciidoc")).unwrap(), b"CAPI");
    assert_eq!(
        assembly.fragment_files,
        vec![
            out.join("node_reference.asciidoc"),
            out.join("c_api.asciidoc")
        ]
    );
}

#[test]
fn given_nested_static_tree_when_assembling_then_subtree_is_preserved() {
    // Arrange
    let repo = create_repository();
    let nested = repo.path().join("documentation/images/diagrams");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("graph.svg"), "<svg/>").unwrap();
    let service = service(
        repo.path(),
        Arc::new(FakeGenerator::returning("NODE", "CAPI")),
        Arc::new(MockRunner::exiting(0, "")),
    );

    // Act
    service.assemble().unwrap();

    // Assert
    let copied = output_dir(repo.path()).join("images/diagrams/graph.svg");
    assert_eq!(fs::read_to_string(copied).unwrap(), "<svg/>");
}

#[test]
fn given_stale_output_when_building_then_stale_file_is_removed() {
    // Arrange
    let repo = create_repository();
    let out = output_dir(repo.path());
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("old.asciidoc"), "stale").unwrap();
    let service = service(
        repo.path(),
        Arc::new(FakeGenerator::returning("NODE", "CAPI")),
        Arc::new(MockRunner::exiting(0, "")),
    );

    // Act
    service.run(true).unwrap();

    // Assert
    assert!(!out.join("old.asciidoc").exists());
    assert!(out.join("a.asciidoc").exists());
}

#[test]
fn given_static_tree_with_fragment_names_when_building_then_generated_content_wins() {
    // Arrange
    let repo = create_repository();
    fs::write(
        repo.path().join("documentation/c_api.asciidoc"),
        "placeholder",
    )
    .unwrap();
    let service = service(
        repo.path(),
        Arc::new(FakeGenerator::returning("NODE", "CAPI")),
        Arc::new(MockRunner::exiting(0, "")),
    );

    // Act
    service.assemble().unwrap();

    // Assert
    let out = output_dir(repo.path());
    assert_eq!(fs::read(out.join("c_api.asciidoc")).unwrap(), b"CAPI");
}

#[test]
fn given_binary_fragment_when_writing_then_bytes_are_kept_exactly() {
    // Arrange
    let repo = create_repository();
    let node = "line one\r\nline two\n\u{00e9}";
    let service = service(
        repo.path(),
        Arc::new(FakeGenerator::returning(node, "")),
        Arc::new(MockRunner::exiting(0, "")),
    );

    // Act
    service.assemble().unwrap();

    // Assert
    let out = output_dir(repo.path());
    assert_eq!(
        fs::read(out.join("node_reference.asciidoc")).unwrap(),
        node.as_bytes()
    );
    assert_eq!(fs::read(out.join("c_api.asciidoc")).unwrap(), b"");
}

#[test]
fn given_two_runs_when_inputs_unchanged_then_output_is_identical() {
    // Arrange
    let repo = create_repository();
    let service = service(
        repo.path(),
        Arc::new(FakeGenerator::returning("NODE", "CAPI")),
        Arc::new(MockRunner::exiting(0, "")),
    );

    // Act
    let first = service.run(true).unwrap();
    let second = service.run(true).unwrap();

    // Assert
    assert_eq!(first.tree_digest, second.tree_digest);
    assert_eq!(
        tree_digest(&RealFileSystem, &output_dir(repo.path())).unwrap(),
        first.tree_digest
    );
}

#[test]
fn given_generator_when_building_then_node_reference_is_requested_first() {
    // Arrange
    let repo = create_repository();
    let generator = Arc::new(FakeGenerator::returning("NODE", "CAPI"));
    let service = service(
        repo.path(),
        generator.clone(),
        Arc::new(MockRunner::exiting(0, "")),
    );

    // Act
    service.assemble().unwrap();

    // Assert
    assert_eq!(
        generator.requested(),
        vec![FragmentKind::NodeReference, FragmentKind::CApi]
    );
}

// ============================================================
// Failures before any mutation
// ============================================================

#[test]
fn given_generator_failing_on_first_call_when_building_then_existing_output_untouched() {
    // Arrange
    let repo = create_repository();
    let out = output_dir(repo.path());
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("old.asciidoc"), "previous build").unwrap();
    let before = tree_digest(&RealFileSystem, &out).unwrap();
    let generator = Arc::new(FakeGenerator::failing_first());
    let runner = Arc::new(MockRunner::exiting(0, ""));
    let service = service(repo.path(), generator.clone(), runner.clone());

    // Act
    let result = service.run(true);

    // Assert
    assert!(matches!(
        result,
        Err(ApplicationError::Generation {
            kind: FragmentKind::NodeReference,
            ..
        })
    ));
    assert_eq!(generator.requested(), vec![FragmentKind::NodeReference]);
    assert_eq!(tree_digest(&RealFileSystem, &out).unwrap(), before);
    assert!(runner.calls().is_empty());
}

#[test]
fn given_generator_failure_when_no_output_exists_then_nothing_is_created() {
    // Arrange
    let repo = create_repository();
    let service = service(
        repo.path(),
        Arc::new(FakeGenerator::failing_first()),
        Arc::new(MockRunner::exiting(0, "")),
    );

    // Act
    let result = service.run(true);

    // Assert
    assert!(result.is_err());
    assert!(!repo.path().join("build").exists());
}

#[test]
fn given_unavailable_generator_when_building_then_fails_before_generating() {
    // Arrange
    let repo = create_repository();
    let generator = Arc::new(FakeGenerator::unavailable());
    let service = service(
        repo.path(),
        generator.clone(),
        Arc::new(MockRunner::exiting(0, "")),
    );

    // Act
    let result = service.run(true);

    // Assert
    assert!(matches!(
        result,
        Err(ApplicationError::CollaboratorUnavailable { .. })
    ));
    assert!(generator.requested().is_empty());
    assert!(!output_dir(repo.path()).exists());
}

#[cfg(unix)]
#[test]
fn given_module_that_fails_to_load_when_building_then_unavailable_and_exit_69() {
    // Arrange
    let repo = create_repository();
    fs::write(repo.path().join("docgen.py"), "this is not python(").unwrap();
    let mut settings = Settings::default();
    settings.generator.load_check = vec![
        "sh".into(),
        "-c".into(),
        "echo 'SyntaxError: invalid syntax' 1>&2; exit 1".into(),
    ];
    let service = ServiceContainer::new(settings, repo.path())
        .unwrap()
        .build_service();

    // Act
    let error = service.run(false).unwrap_err();

    // Assert
    assert!(matches!(
        error,
        ApplicationError::CollaboratorUnavailable { .. }
    ));
    assert_eq!(CliError::from(error).exit_code(), exitcode::UNAVAILABLE);
    assert!(!output_dir(repo.path()).exists());
}

// ============================================================
// Filesystem failures
// ============================================================

#[test]
fn given_missing_static_tree_when_building_then_filesystem_error_and_old_output_gone() {
    // Arrange
    let repo = create_repository();
    fs::remove_dir_all(repo.path().join("documentation")).unwrap();
    let out = output_dir(repo.path());
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("old.asciidoc"), "previous build").unwrap();
    let service = service(
        repo.path(),
        Arc::new(FakeGenerator::returning("NODE", "CAPI")),
        Arc::new(MockRunner::exiting(0, "")),
    );

    // Act
    let result = service.run(true);

    // Assert: no rollback, the old output is already deleted
    assert!(matches!(result, Err(ApplicationError::Filesystem { .. })));
    assert!(!out.join("old.asciidoc").exists());
}

// ============================================================
// Rendering
// ============================================================

#[test]
fn given_assembled_output_when_rendering_then_entry_document_is_passed() {
    // Arrange
    let repo = create_repository();
    let runner = Arc::new(MockRunner::exiting(0, "rendered ok\n"));
    let service = service(
        repo.path(),
        Arc::new(FakeGenerator::returning("NODE", "CAPI")),
        runner.clone(),
    );

    // Act
    let report = service.run(true).unwrap();

    // Assert
    let entry = output_dir(repo.path()).join(ENTRY);
    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program, "asciidoc");
    assert_eq!(calls[0].args, vec![entry.to_string_lossy().to_string()]);
    let render = report.render.expect("render result");
    assert_eq!(render.entry_document, entry);
    assert_eq!(render.combined_output, "rendered ok\n");
}

#[test]
fn given_renderer_nonzero_exit_when_building_then_render_error_carries_output() {
    // Arrange
    let repo = create_repository();
    let service = service(
        repo.path(),
        Arc::new(FakeGenerator::returning("NODE", "CAPI")),
        Arc::new(MockRunner::exiting(1, "asciidoc: ERROR: include file not found")),
    );

    // Act
    let result = service.run(true);

    // Assert
    match result {
        Err(ApplicationError::Render {
            exit_code, output, ..
        }) => {
            assert_eq!(exit_code, Some(1));
            assert!(output.contains("include file not found"));
        }
        other => panic!("expected render error, got {:?}", other),
    }
    assert!(output_dir(repo.path()).join("c_api.asciidoc").exists());
}

#[test]
fn given_missing_renderer_binary_when_building_then_spawn_failure_after_full_assembly() {
    // Arrange
    let repo = create_repository();
    let mut settings = Settings::default();
    settings.renderer.program = "docbundle-test-no-such-renderer".into();
    let service = ServiceContainer::with_deps(
        settings,
        repo.path(),
        Arc::new(RealFileSystem),
        Arc::new(RealCommandRunner),
        Arc::new(FakeGenerator::returning("NODE", "CAPI")),
    )
    .unwrap()
    .build_service();

    // Act
    let result = service.run(true);

    // Assert
    assert!(matches!(
        result,
        Err(ApplicationError::Render {
            spawned: false,
            exit_code: None,
            ..
        })
    ));
    let out = output_dir(repo.path());
    assert_eq!(
        list_files(&out),
        vec![
            "a.asciidoc",
            "c_api.asciidoc",
            ENTRY,
            "node_reference.asciidoc"
        ]
    );
}

#[test]
fn given_no_render_when_building_then_renderer_is_not_invoked() {
    // Arrange
    let repo = create_repository();
    let runner = Arc::new(MockRunner::exiting(0, ""));
    let service = service(
        repo.path(),
        Arc::new(FakeGenerator::returning("NODE", "CAPI")),
        runner.clone(),
    );

    // Act
    let report = service.run(false).unwrap();

    // Assert
    assert!(report.render.is_none());
    assert!(runner.calls().is_empty());
}

#[test]
fn given_no_prior_build_when_render_existing_then_filesystem_error() {
    // Arrange
    let repo = create_repository();
    let runner = Arc::new(MockRunner::exiting(0, ""));
    let service = service(
        repo.path(),
        Arc::new(FakeGenerator::returning("NODE", "CAPI")),
        runner.clone(),
    );

    // Act
    let result = service.render_existing();

    // Assert
    assert!(matches!(result, Err(ApplicationError::Filesystem { .. })));
    assert!(runner.calls().is_empty());
}

#[test]
fn given_prior_build_when_render_existing_then_renders_without_regenerating() {
    // Arrange
    let repo = create_repository();
    let generator = Arc::new(FakeGenerator::returning("NODE", "CAPI"));
    let runner = Arc::new(MockRunner::exiting(0, ""));
    let service = service(repo.path(), generator.clone(), runner.clone());
    service.assemble().unwrap();

    // Act
    let result = service.render_existing().unwrap();

    // Assert
    assert!(result.success());
    assert_eq!(generator.requested().len(), 2);
    assert_eq!(runner.calls().len(), 1);
}

// ============================================================
// Clean / status
// ============================================================

#[test]
fn given_assembled_output_when_clean_then_output_removed_and_static_kept() {
    // Arrange
    let repo = create_repository();
    let service = service(
        repo.path(),
        Arc::new(FakeGenerator::returning("NODE", "CAPI")),
        Arc::new(MockRunner::exiting(0, "")),
    );
    service.assemble().unwrap();

    // Act
    let removed = service.clean().unwrap();
    let removed_again = service.clean().unwrap();

    // Assert
    assert!(removed);
    assert!(!removed_again);
    assert!(!output_dir(repo.path()).exists());
    assert!(repo.path().join("documentation").join(ENTRY).exists());
}

#[test]
fn given_assembled_output_when_status_then_reports_fragments_and_digest() {
    // Arrange
    let repo = create_repository();
    let service = service(
        repo.path(),
        Arc::new(FakeGenerator::returning("NODE", "CAPI")),
        Arc::new(MockRunner::exiting(0, "")),
    );
    let before = service.status().unwrap();
    let report = service.run(false).unwrap();

    // Act
    let after = service.status().unwrap();

    // Assert
    assert!(!before.exists);
    assert!(before.tree_digest.is_none());
    assert!(after.exists);
    assert!(after.entry_document_present);
    assert_eq!(
        after.fragments_present,
        vec![FragmentKind::NodeReference, FragmentKind::CApi]
    );
    assert_eq!(after.tree_digest, Some(report.tree_digest));
}

// ============================================================
// Layout validation
// ============================================================

#[test]
fn given_output_inside_static_tree_when_creating_container_then_invalid_layout() {
    // Arrange
    let repo = create_repository();
    let mut settings = Settings::default();
    settings.layout.output_subpath = PathBuf::from("documentation/build");

    // Act
    let result = ServiceContainer::with_deps(
        settings,
        repo.path(),
        Arc::new(RealFileSystem),
        Arc::new(MockRunner::exiting(0, "")),
        Arc::new(FakeGenerator::returning("NODE", "CAPI")),
    );

    // Assert
    assert!(matches!(result, Err(DomainError::InvalidLayout { .. })));
}

#[test]
fn given_invalid_layout_when_creating_container_then_rejection_is_traced_in_resolving_stage() {
    // Arrange
    let repo = create_repository();
    let mut settings = Settings::default();
    settings.layout.static_docs_subpath = PathBuf::from("build");
    let log = CapturedLog::default();

    // Act
    let result = log.capture(tracing::Level::DEBUG, || {
        ServiceContainer::with_deps(
            settings,
            repo.path(),
            Arc::new(RealFileSystem),
            Arc::new(MockRunner::exiting(0, "")),
            Arc::new(FakeGenerator::returning("NODE", "CAPI")),
        )
    });

    // Assert
    assert!(matches!(result, Err(DomainError::InvalidLayout { .. })));
    let text = log.text();
    assert!(text.contains("resolving-paths"), "log was: {text}");
    assert!(text.contains("layout rejected"), "log was: {text}");
}

// ============================================================
// Logging
// ============================================================

#[test]
fn given_failing_build_when_logging_at_warn_then_error_is_left_to_the_caller() {
    // Arrange
    let repo = create_repository();
    let service = service(
        repo.path(),
        Arc::new(FakeGenerator::failing_first()),
        Arc::new(MockRunner::exiting(0, "")),
    );
    let log = CapturedLog::default();

    // Act
    let result = log.capture(tracing::Level::WARN, || service.run(true));

    // Assert
    assert!(result.is_err());
    assert_eq!(log.text(), "");
}

#[test]
fn given_failing_build_when_logging_at_info_then_failed_stage_is_recorded() {
    // Arrange
    let repo = create_repository();
    let service = service(
        repo.path(),
        Arc::new(FakeGenerator::failing_first()),
        Arc::new(MockRunner::exiting(0, "")),
    );
    let log = CapturedLog::default();

    // Act
    let result = log.capture(tracing::Level::INFO, || service.run(true));

    // Assert
    assert!(result.is_err());
    let text = log.text();
    assert!(text.contains("build aborted"), "log was: {text}");
    assert!(text.contains("failed_stage=generating"), "log was: {text}");
}
