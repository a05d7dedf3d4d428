use crate::api;
use crate::cli::args::{Cli, Commands};
use crate::config::Settings;
use crate::error::{ProcessingError, Result};
use crate::loaders::{HistoricalLoader, ImportConfirmation, IncrementalLoader};
use crate::readers::AqiApiClient;
use crate::storage::{Store, Table};
use crate::utils::progress::ProgressReporter;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use validator::Validate;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let mut settings = Settings::load()?;

    match cli.command {
        Commands::Sync { lookback_hours } => {
            if let Some(hours) = lookback_hours {
                settings.lookback_hours = hours;
                settings.validate()?;
            }
            sync(&settings).await
        }

        Commands::History {
            check,
            import,
            yes,
            dir,
        } => {
            let dir = dir.unwrap_or_else(|| settings.history_dir.clone());
            let loader = HistoricalLoader::new(dir, settings.chunk_size);
            if check {
                history_check(&loader)
            } else if import {
                history_import(&settings, &loader, yes)
            } else {
                Err(ProcessingError::InvalidParameter(
                    "one of --check or --import is required".to_string(),
                ))
            }
        }

        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| settings.server_host.clone());
            let port = port.unwrap_or(settings.server_port);
            let store = Store::open(settings.require_database()?)?;
            api::serve(store, &host, port).await
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the level picked by `--verbose`.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_directives = if verbose {
        "aqi_etl=debug,tower_http=debug"
    } else {
        "aqi_etl=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
    Ok(())
}

async fn sync(settings: &Settings) -> Result<()> {
    let db_path = settings.require_database()?;
    let client = AqiApiClient::new(settings)?;
    let mut store = Store::open(db_path)?;
    let loader = IncrementalLoader::new(client, settings.lookback_hours);

    println!("Syncing the last {} hours of readings...", settings.lookback_hours);
    let report = loader.run(&mut store).await;
    println!("\n{}", report.summary());

    if report.succeeded() {
        Ok(())
    } else {
        Err(ProcessingError::SyncFailed(
            report.error.unwrap_or_else(|| report.state.to_string()),
        ))
    }
}

fn snapshot_files_or_warn(loader: &HistoricalLoader) -> Result<Option<Vec<PathBuf>>> {
    let files = loader.snapshot_files()?;
    if files.is_empty() {
        tracing::warn!("No snapshot files found in {}", loader.dir().display());
        println!("No .json snapshot files found in {}", loader.dir().display());
        return Ok(None);
    }
    Ok(Some(files))
}

fn history_check(loader: &HistoricalLoader) -> Result<()> {
    let Some(files) = snapshot_files_or_warn(loader)? else {
        return Ok(());
    };

    println!("Checking {} snapshot files in {}", files.len(), loader.dir().display());
    let progress = ProgressReporter::new(files.len() as u64, "Checking snapshot files...", false);
    let report = loader.check(&progress)?;
    println!("\n{}", report.summary());
    Ok(())
}

fn history_import(settings: &Settings, loader: &HistoricalLoader, assume_yes: bool) -> Result<()> {
    let Some(files) = snapshot_files_or_warn(loader)? else {
        return Ok(());
    };
    let db_path = settings.require_database()?;

    let confirmation = if assume_yes {
        ImportConfirmation::assume_yes()
    } else {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        match ImportConfirmation::prompt(&mut stdin.lock(), &mut stdout, Table::Historical) {
            Ok(confirmation) => confirmation,
            Err(ProcessingError::Cancelled) => {
                println!("Import cancelled; nothing was changed.");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    };

    let mut store = Store::open(db_path)?;
    println!("Importing {} snapshot files into '{}'", files.len(), Table::Historical);
    let progress = ProgressReporter::new(files.len() as u64, "Importing snapshot files...", false);
    let report = loader.import(&mut store, confirmation, &progress)?;
    println!("\n{}", report.summary());

    if report.failed_chunks > 0 {
        println!(
            "⚠️  {} chunks failed and were skipped; see the log for details",
            report.failed_chunks
        );
    } else {
        println!("Import complete!");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::{DEFAULT_API_URL, DEFAULT_SERVER_HOST};
    use tempfile::TempDir;

    fn settings(database_path: PathBuf, api_key: Option<&str>) -> Settings {
        Settings {
            database_path: Some(database_path),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.map(str::to_string),
            lookback_hours: 25,
            row_limit: 5000,
            request_timeout_secs: 90,
            accept_invalid_certs: false,
            history_dir: PathBuf::from("history_records"),
            chunk_size: 5000,
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: 5000,
        }
    }

    #[tokio::test]
    async fn test_sync_without_api_key_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("data").join("aqi.db");

        let result = sync(&settings(db_path.clone(), None)).await;

        assert!(matches!(result, Err(ProcessingError::Config(_))));
        assert!(!db_path.exists());
        assert!(!dir.path().join("data").exists());
    }
}
