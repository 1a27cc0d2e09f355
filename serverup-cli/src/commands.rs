//! Command handlers.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serverup_core::server::{
    paths, AcquisitionManager, AutoConfirm, CacheRecord, DownloadProgress, DownloadPrompt,
    Platform,
};
use serverup_core::{Database, HostEnvironment, LogContext, Settings, VariableResolver};

use crate::cli::{Cli, Commands, ConfigArgs, ConfigCommands, EnvArgs, ServerPathArgs};
use crate::prompt::InquirePrompt;

/// Runs the parsed command.
pub async fn run(cli: Cli) -> Result<()> {
    let log = LogContext::new("serverup");

    let result = match &cli.command {
        Commands::Env(args) => env(&cli, args, &log),
        Commands::ServerPath(args) => server_path(&cli, args, &log).await,
        Commands::Status => status(&cli),
        Commands::Config(args) => config(&cli, args),
    };

    log.close();
    result
}

fn open_database(path: Option<&Path>) -> Result<Database> {
    let db = match path {
        Some(path) => Database::open_at(path.to_path_buf()),
        None => Database::open(),
    }
    .context("Failed to open database")?;
    db.migrate().context("Failed to migrate database")?;
    Ok(db)
}

fn bin_dir(cli: &Cli) -> Result<PathBuf> {
    match &cli.bin_dir {
        Some(dir) => Ok(dir.clone()),
        None => paths::bin_dir(),
    }
}

// =============================================================================
// env
// =============================================================================

fn env(cli: &Cli, args: &EnvArgs, log: &LogContext) -> Result<()> {
    let variables = match &args.file {
        Some(file) => read_variables(file)?,
        None => Settings::load(&open_database(cli.database.as_deref())?).extra_env,
    };

    let host = HostEnvironment::with_workspace_roots(cli.workspaces.iter().cloned());
    let resolver = VariableResolver::with_log(host, log.child("variables"));
    let resolved = resolver.resolve_json(&variables);

    print!("{}", render_env(&resolved));
    Ok(())
}

fn read_variables(path: &Path) -> Result<serde_json::Map<String, serde_json::Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => anyhow::bail!("{} must contain a JSON object", path.display()),
    }
}

fn render_env(resolved: &HashMap<String, String>) -> String {
    let sorted: BTreeMap<_, _> = resolved.iter().collect();
    sorted
        .into_iter()
        .map(|(key, value)| format!("{key}={value}\n"))
        .collect()
}

// =============================================================================
// server-path
// =============================================================================

async fn server_path(cli: &Cli, args: &ServerPathArgs, log: &LogContext) -> Result<()> {
    let db = open_database(cli.database.as_deref())?;
    let settings = Settings::load(&db);

    let prompt: Arc<dyn DownloadPrompt> = if args.yes {
        Arc::new(AutoConfirm)
    } else {
        Arc::new(InquirePrompt)
    };

    let manager = AcquisitionManager::for_host(&settings, db, &bin_dir(cli)?)
        .with_prompt(prompt)
        .with_progress(Arc::new(print_progress))
        .with_log(log.child("acquisition"));

    let outcome = manager.resolve().await;
    manager.close();

    let outcome = outcome?;
    tracing::debug!(state = %outcome.state, "Acquisition finished");
    let path = outcome.into_path()?;
    println!("{}", path.display());
    Ok(())
}

fn print_progress(progress: DownloadProgress) {
    let mut stderr = std::io::stderr();
    let _ = match progress.percent {
        Some(percent) => write!(stderr, "\rDownloading language server... {percent:>5.1}%"),
        None => write!(
            stderr,
            "\rDownloading language server... {} KB",
            progress.bytes_downloaded / 1024
        ),
    };
    if progress.total_bytes == Some(progress.bytes_downloaded) {
        let _ = writeln!(stderr);
    }
}

// =============================================================================
// status
// =============================================================================

fn status(cli: &Cli) -> Result<()> {
    let db = open_database(cli.database.as_deref())?;
    let settings = Settings::load(&db);
    let manager = AcquisitionManager::for_host(&settings, db, &bin_dir(cli)?);

    let record = manager.store().read()?;
    let binary = manager.artifact().map(|artifact| {
        (
            artifact.platform(),
            manager.store().binary_path(),
            manager.store().exists(),
        )
    });

    print!("{}", render_status(&settings, binary, &record));
    Ok(())
}

fn render_status(
    settings: &Settings,
    binary: Option<(Platform, &Path, bool)>,
    record: &CacheRecord,
) -> String {
    let mut lines = Vec::new();

    if let Some(configured) = &settings.server_path {
        lines.push(format!("configured path: {configured}"));
    }

    match binary {
        Some((platform, path, exists)) => {
            lines.push(format!("platform:        {platform}"));
            let missing = if exists { "" } else { " (missing)" };
            lines.push(format!("binary:          {}{missing}", path.display()));
        }
        None => lines.push("binary:          no build for this platform".to_string()),
    }

    lines.push(format!(
        "channel:         {}/{}@{}",
        settings.release_owner, settings.release_repo, settings.release_channel
    ));
    lines.push(format!("last check:      {}", format_timestamp(record.last_check_timestamp)));
    lines.push(format!(
        "release id:      {}",
        record
            .release_id
            .map_or_else(|| "none".to_string(), |id| id.to_string())
    ));

    lines.into_iter().map(|line| line + "\n").collect()
}

fn format_timestamp(seconds: f64) -> String {
    if seconds <= 0.0 {
        return "never".to_string();
    }
    chrono::DateTime::from_timestamp(seconds as i64, 0)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "invalid".to_string())
}

// =============================================================================
// config
// =============================================================================

fn config(cli: &Cli, args: &ConfigArgs) -> Result<()> {
    let db = open_database(cli.database.as_deref())?;

    match &args.command {
        ConfigCommands::Show => {
            let settings = Settings::load(&db);
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        ConfigCommands::Import { file } => {
            let text = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let settings = Settings::from_json(&text)
                .with_context(|| format!("Invalid settings in {}", file.display()))?;
            settings.save(&db)?;
            tracing::info!(path = %file.display(), "Settings imported");
        }
    }

    Ok(())
}
