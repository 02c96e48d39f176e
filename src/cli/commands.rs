//! Command dispatch: resolves the repository, wires services, prints results

use std::io;
use std::path::PathBuf;

use clap::CommandFactory;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::FragmentKind;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;
use crate::util::resolve_repository_root;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        None => cmd_build(cli, false),
        Some(Commands::Build { no_render }) => cmd_build(cli, *no_render),
        Some(Commands::Render) => cmd_render(cli),
        Some(Commands::Clean) => cmd_clean(cli),
        Some(Commands::Status) => cmd_status(cli),
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => cmd_config_show(cli),
            ConfigCommands::Init => cmd_config_init(cli),
            ConfigCommands::Path => cmd_config_path(cli),
        },
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}

fn repository_root(cli: &Cli) -> CliResult<PathBuf> {
    let root = resolve_repository_root(cli.root.as_deref())?;
    debug!("repository root: {}", root.display());
    Ok(root)
}

fn create_container(cli: &Cli) -> CliResult<ServiceContainer> {
    let root = repository_root(cli)?;
    let settings = Settings::load(Some(&root))?;
    Ok(ServiceContainer::new(settings, &root)?)
}

#[instrument(skip(cli))]
fn cmd_build(cli: &Cli, no_render: bool) -> CliResult<()> {
    let container = create_container(cli)?;
    let service = container.build_service();

    output::header("Building documentation...");
    let report = service.run(!no_render)?;

    output::success_detail(&format!(
        "assembled {}",
        report.assembly.output_dir.display()
    ));
    for file in &report.assembly.fragment_files {
        output::success_detail(&format!("wrote {}", file.display()));
    }
    output::detail(&format!("digest {}", report.tree_digest));

    match &report.render {
        Some(render) => {
            output::passthrough(&render.combined_output);
            output::success(&format!("rendered {}", render.entry_document.display()));
        }
        None => output::success("assembled (rendering skipped)"),
    }
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_render(cli: &Cli) -> CliResult<()> {
    let container = create_container(cli)?;
    let result = container.build_service().render_existing()?;

    output::passthrough(&result.combined_output);
    output::success(&format!("rendered {}", result.entry_document.display()));
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_clean(cli: &Cli) -> CliResult<()> {
    let service = create_container(cli)?.build_service();
    let output_dir = service.layout().output_dir.clone();

    if service.clean()? {
        output::action("Removed", &output_dir.display());
    } else {
        output::warning(&format!("nothing to remove at {}", output_dir.display()));
    }
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_status(cli: &Cli) -> CliResult<()> {
    let service = create_container(cli)?.build_service();
    let layout = service.layout();
    let status = service.status()?;

    output::header("Layout");
    output::detail(&format!("root:   {}", layout.repository_root.display()));
    output::detail(&format!("static: {}", layout.static_docs_dir.display()));
    output::detail(&format!("output: {}", layout.output_dir.display()));
    output::detail(&format!("entry:  {}", layout.entry_document.display()));

    output::header("Output");
    if !status.exists {
        output::failure("output directory does not exist");
        return Ok(());
    }
    if status.entry_document_present {
        output::success_detail("entry document present");
    } else {
        output::failure("entry document missing");
    }
    for kind in FragmentKind::ALL {
        if status.fragments_present.contains(&kind) {
            output::success_detail(&format!("{} ({})", kind, kind.file_name()));
        } else {
            output::failure(&format!("{} ({}) missing", kind, kind.file_name()));
        }
    }
    if let Some(digest) = &status.tree_digest {
        output::detail(&format!("digest {}", digest));
    }
    Ok(())
}

fn cmd_config_show(cli: &Cli) -> CliResult<()> {
    let root = repository_root(cli)?;
    let settings = Settings::load(Some(&root))?;
    output::info(&settings.to_toml()?);
    Ok(())
}

fn cmd_config_init(cli: &Cli) -> CliResult<()> {
    let root = repository_root(cli)?;
    let path = local_config_path(&root);
    if path.exists() {
        return Err(CliError::Usage(format!(
            "config already exists: {}",
            path.display()
        )));
    }
    std::fs::write(&path, Settings::template())
        .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
    output::action("Created", &path.display());
    Ok(())
}

fn cmd_config_path(cli: &Cli) -> CliResult<()> {
    let root = repository_root(cli)?;
    let mut paths = vec![("local", local_config_path(&root))];
    if let Some(global) = global_config_path() {
        paths.insert(0, ("global", global));
    }

    for (label, path) in paths {
        let marker = if path.exists() { "" } else { " (not found)" };
        output::detail(&format!("{label}: {}{marker}", path.display()));
    }
    Ok(())
}
