//! Tidemark Application Shell
//!
//! Thin composition layer: sets up logging, loads configuration, wires the
//! config store and executor into a [`BackupWorker`], and keeps it running
//! until ctrl-c. Scheduling and retention live in the `crates/` directory.

mod executor;

pub use executor::{FileCopyExecutor, MissingSourceExecutor};

use std::sync::Arc;
use std::time::Duration;
use tidemark_core::{AppConfig, GeneralConfig, SchedulerConfig};
use tidemark_scheduler::{BackupExecutor, BackupWorker, BackupWorkerState, TomlConfigStore};
use tracing::{debug, info, warn};

/// Initialize tracing subscriber for logging
///
/// `RUST_LOG` wins; otherwise `fallback` is used as the filter directive.
fn init_tracing(fallback: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Scheduler check period, never shorter than one second.
fn tick_period(config: &SchedulerConfig) -> Duration {
    Duration::from_secs(config.tick_interval_secs.max(1))
}

/// Executor for the configured data file.
fn executor_for(general: &GeneralConfig) -> Arc<dyn BackupExecutor> {
    match &general.data_file {
        Some(path) => Arc::new(FileCopyExecutor::new(path)),
        None => {
            warn!("No data file configured; backups will fail until general.data_file is set");
            Arc::new(MissingSourceExecutor)
        }
    }
}

fn log_state(state: &BackupWorkerState) {
    debug!(
        running = state.is_running,
        next = ?state.next_scheduled_backup,
        backups = state.backup_count,
        "backup state changed"
    );
}

/// Run the backup service until ctrl-c.
pub async fn run() -> anyhow::Result<()> {
    let store = TomlConfigStore::at_default_path()?;
    let mut config = AppConfig::load_from(store.path())?;
    config.apply_env_overrides();

    init_tracing(&config.general.log_filter);
    info!("Starting Tidemark v{}", env!("CARGO_PKG_VERSION"));
    info!("Using config file {}", store.path().display());

    let worker = Arc::new(
        BackupWorker::new(Arc::new(store), executor_for(&config.general))
            .with_tick_period(tick_period(&config.scheduler)),
    );
    let _subscription = worker.subscribe(log_state);

    if let Err(e) = config.backup.validate() {
        warn!("Backup configuration is incomplete: {}", e);
    }
    worker.apply_config(config.backup);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    if let Some(job) = worker.backup_on_close().await {
        info!(job_id = %job.id, status = %job.status, "backup on close finished");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tidemark_core::{BackupConfig, JobType};
    use tidemark_scheduler::BackupRequest;

    #[test]
    fn test_tick_period_has_floor() {
        assert_eq!(
            tick_period(&SchedulerConfig {
                tick_interval_secs: 0
            }),
            Duration::from_secs(1)
        );
        assert_eq!(
            tick_period(&SchedulerConfig::default()),
            Duration::from_secs(60)
        );
    }

    #[tokio::test]
    async fn test_executor_without_data_file_fails_jobs() {
        let tmp = TempDir::new().unwrap();
        let executor = executor_for(&GeneralConfig::default());
        let request = BackupRequest::new(
            &BackupConfig::default(),
            tmp.path().join("out.json"),
            JobType::Full,
            None,
        );
        let err = executor.execute(&request).await.unwrap_err();
        assert!(err.to_string().contains("no data file configured"));
    }

    #[tokio::test]
    async fn test_executor_with_data_file_copies() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data.json");
        std::fs::write(&data, b"[]").unwrap();

        let general = GeneralConfig {
            data_file: Some(data),
            ..GeneralConfig::default()
        };
        let config = BackupConfig {
            encrypt_backups: false,
            ..BackupConfig::default()
        };
        let out = tmp.path().join("out.json");
        let request = BackupRequest::new(&config, out.clone(), JobType::Full, None);
        executor_for(&general).execute(&request).await.unwrap();
        assert_eq!(std::fs::read(out).unwrap(), b"[]");
    }
}
