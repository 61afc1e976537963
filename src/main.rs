//! valosync CLI entrypoint.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use valosync::cli::{Cli, Commands, KindArg, OutputFormatter, StateCommands};
use valosync::config::{Manifest, ManifestParser, ManifestValidator, find_manifest_file};
use valosync::error::{ConfigError, Result, ValosyncError};
use valosync::runner::{SyncRunner, lookup};
use valosync::state::{LocalStateStore, StateStore};
use valosync::valohai::{ApiCredentials, ValohaiClient};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => cmd_validate(cli.manifest.as_ref(), warnings, &formatter),
        Commands::Apply { yes } => cmd_apply(cli.manifest.as_ref(), yes, &formatter).await,
        Commands::Status => cmd_status(cli.manifest.as_ref(), &formatter).await,
        Commands::Lookup { kind, id } => {
            cmd_lookup(cli.manifest.as_ref(), kind, &id, &formatter).await
        }
        Commands::Destroy { yes } => cmd_destroy(cli.manifest.as_ref(), yes, &formatter).await,
        Commands::State { command } => cmd_state(cli.manifest.as_ref(), command, &formatter).await,
    }
}

/// Initialize a new project.
fn cmd_init(path: &PathBuf, force: bool) -> Result<()> {
    info!("Initializing new valosync project in: {}", path.display());

    let manifest_path = path.join("valosync.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    if !force && manifest_path.exists() {
        eprintln!("Manifest file already exists: {}", manifest_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    let manifest_template = include_str!("../templates/valosync.yaml");
    std::fs::write(&manifest_path, manifest_template)?;
    eprintln!("Created: {}", manifest_path.display());

    let env_template = include_str!("../templates/.env.example");
    std::fs::write(&env_path, env_template)?;
    eprintln!("Created: {}", env_path.display());

    let gitignore_content = ".env\n.valosync/\n";
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        if !existing.contains(".env") || !existing.contains(".valosync") {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# valosync")?;
            if !existing.contains(".env") {
                writeln!(file, ".env")?;
            }
            if !existing.contains(".valosync") {
                writeln!(file, ".valosync/")?;
            }
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, gitignore_content)?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nProject initialized.");
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env and set VALOHAI_API_TOKEN");
    eprintln!("  2. Edit valosync.yaml with your resources");
    eprintln!("  3. Run 'valosync validate' to check the manifest");
    eprintln!("  4. Run 'valosync apply' to synchronize");

    Ok(())
}

/// Validate the manifest.
fn cmd_validate(
    manifest_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (manifest, _) = load_manifest(manifest_path)?;

    let validator = ManifestValidator::new();
    let result = validator.validate(&manifest)?;

    eprint!("{}", formatter.format_validation(&result, show_warnings));
    Ok(())
}

/// Synchronize declared resources.
async fn cmd_apply(
    manifest_path: Option<&PathBuf>,
    yes: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (manifest, manifest_dir) = load_manifest(manifest_path)?;

    let validator = ManifestValidator::new();
    validator.validate(&manifest)?;

    if !yes
        && !confirm(&format!(
            "Synchronize {} declared resources?",
            manifest.resource_count()
        ))?
    {
        eprintln!("Aborted.");
        return Ok(());
    }

    let client = build_client(&manifest)?;
    let state_store = LocalStateStore::for_manifest_dir(&manifest_dir);
    let runner = SyncRunner::new(&manifest, &client, &state_store);

    let report = runner.apply().await?;
    eprint!("{}", formatter.format_report(&report));

    if report.success() {
        Ok(())
    } else {
        Err(ValosyncError::internal(format!(
            "{} resources failed to synchronize",
            report.errors.len()
        )))
    }
}

/// Show resource status.
async fn cmd_status(manifest_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (manifest, manifest_dir) = load_manifest(manifest_path)?;
    let client = build_client(&manifest)?;
    let state_store = LocalStateStore::for_manifest_dir(&manifest_dir);
    let runner = SyncRunner::new(&manifest, &client, &state_store);

    let statuses = runner.status().await?;
    eprint!("{}", formatter.format_status(&statuses));
    Ok(())
}

/// Read one resource by identifier.
async fn cmd_lookup(
    manifest_path: Option<&PathBuf>,
    kind: KindArg,
    id: &str,
    formatter: &OutputFormatter,
) -> Result<()> {
    let manifest = load_manifest_or_default(manifest_path)?;
    let client = build_client(&manifest)?;

    let kind = kind.into();
    match lookup(&client, kind, id).await? {
        Some(reconciled) => {
            eprint!("{}", formatter.format_lookup(kind, &reconciled));
            Ok(())
        }
        None => Err(ValosyncError::internal(format!(
            "{kind} {id} does not exist"
        ))),
    }
}

/// Delete every tracked resource.
async fn cmd_destroy(
    manifest_path: Option<&PathBuf>,
    yes: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (manifest, manifest_dir) = load_manifest(manifest_path)?;

    if !yes && !confirm("Delete every tracked resource?")? {
        eprintln!("Aborted.");
        return Ok(());
    }

    let client = build_client(&manifest)?;
    let state_store = LocalStateStore::for_manifest_dir(&manifest_dir);
    let runner = SyncRunner::new(&manifest, &client, &state_store);

    let report = runner.destroy().await?;
    eprint!("{}", formatter.format_report(&report));

    if report.success() {
        Ok(())
    } else {
        Err(ValosyncError::internal(format!(
            "{} resources failed to delete",
            report.errors.len()
        )))
    }
}

/// Manage the local state.
async fn cmd_state(
    manifest_path: Option<&PathBuf>,
    command: StateCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (_, manifest_dir) = load_manifest(manifest_path)?;
    let state_store = LocalStateStore::for_manifest_dir(&manifest_dir);

    match command {
        StateCommands::Show => {
            let state = state_store.load().await?;
            match state {
                Some(state) => eprint!("{}", formatter.format_state(&state)),
                None => eprintln!("No state recorded."),
            }
            Ok(())
        }
        StateCommands::Unlock => {
            match state_store.get_lock_info().await? {
                Some(lock) => {
                    state_store.release_lock(&lock.lock_id).await?;
                    eprintln!("Released lock held by {} ({})", lock.holder, lock.lock_id);
                }
                None => eprintln!("State is not locked."),
            }
            Ok(())
        }
    }
}

/// Resolves and parses the manifest, loading `.env` beforehand.
fn load_manifest(manifest_path: Option<&PathBuf>) -> Result<(Manifest, PathBuf)> {
    let path = match manifest_path {
        Some(path) => path.clone(),
        None => {
            let cwd = std::env::current_dir()?;
            find_manifest_file(cwd)?
        }
    };

    let dir = path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let parser = ManifestParser::new().with_base_path(&dir);
    parser.load_dotenv()?;
    let manifest = parser.load_file(&path)?;

    Ok((manifest, dir))
}

/// Like [`load_manifest`], but a missing manifest falls back to an empty
/// one (lookup works with just the token environment variable).
fn load_manifest_or_default(manifest_path: Option<&PathBuf>) -> Result<Manifest> {
    match load_manifest(manifest_path) {
        Ok((manifest, _)) => Ok(manifest),
        Err(ValosyncError::Config(ConfigError::FileNotFound { .. })) => Ok(Manifest::default()),
        Err(err) => Err(err),
    }
}

/// Builds the API client from resolved credentials.
fn build_client(manifest: &Manifest) -> Result<ValohaiClient> {
    let credentials = ApiCredentials::resolve(manifest.auth.token.as_deref())?;
    let mut client = ValohaiClient::new(credentials)?;
    if let Some(api_url) = &manifest.auth.api_url {
        client = client.with_base_url(api_url);
    }
    Ok(client)
}

/// Asks the user for confirmation on stderr.
fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt} [y/N]: ");
    std::io::stderr().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes"
    ))
}
