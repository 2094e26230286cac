//! Backup worker: job state machine and scheduler loop.
//!
//! The worker owns the single [`BackupWorkerState`]. Scheduled ticks,
//! manual "run now" requests and the shutdown hook all go through the same
//! guarded entry point, so at most one job is ever live. A second request
//! while a job runs is rejected with [`SchedulerError::AlreadyRunning`].
//!
//! Scheduling is a two-state machine: *idle* (no timer) and *armed* (a
//! periodic timer checks `next_scheduled_backup`). Every configuration
//! change cancels the timer and, if the new configuration is scheduled,
//! arms a fresh one with a freshly computed next run. Cancelling the timer
//! never cancels a job that is already running: each tick runs in its own
//! task.

use crate::bus::{NotificationBus, StateCallback, Subscription};
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, SchedulerError};
use crate::executor::{BackupExecutor, BackupRequest};
use crate::filename;
use crate::job::BackupJob;
use crate::policy::{self, Decision};
use crate::retention::{self, BackupArtifact};
use crate::schedule::{self, ScheduleZone};
use crate::state::BackupWorkerState;
use crate::store::ConfigStore;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tidemark_core::BackupConfig;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default period between scheduler checks.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(60);

/// Target for backup completion notifications.
const NOTIFY_TARGET: &str = "tidemark::notify";

/// Runs backup jobs and keeps the schedule armed.
///
/// Build it with [`BackupWorker::new`] and the `with_*` methods, then wrap
/// it in an `Arc`, since arming the timer needs a shared handle.
pub struct BackupWorker {
    store: Arc<dyn ConfigStore>,
    executor: Arc<dyn BackupExecutor>,
    clock: Arc<dyn Clock>,
    zone: ScheduleZone,
    tick_period: Duration,
    config: RwLock<BackupConfig>,
    state: Mutex<BackupWorkerState>,
    bus: NotificationBus,
    timer: Mutex<Option<CancellationToken>>,
}

impl BackupWorker {
    /// Create an idle worker using the system clock and local time.
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>, executor: Arc<dyn BackupExecutor>) -> Self {
        Self {
            store,
            executor,
            clock: Arc::new(SystemClock),
            zone: ScheduleZone::Local,
            tick_period: DEFAULT_TICK_PERIOD,
            config: RwLock::new(BackupConfig::default()),
            state: Mutex::new(BackupWorkerState::default()),
            bus: NotificationBus::new(),
            timer: Mutex::new(None),
        }
    }

    /// Use `clock` as the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Evaluate schedules in `zone`.
    #[must_use]
    pub fn with_schedule_zone(mut self, zone: ScheduleZone) -> Self {
        self.zone = zone;
        self
    }

    /// Set the period between scheduler checks.
    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> BackupWorkerState {
        self.state.lock().expect("worker state lock poisoned").clone()
    }

    /// Configuration currently in effect.
    #[must_use]
    pub fn config(&self) -> BackupConfig {
        self.config.read().expect("worker config lock poisoned").clone()
    }

    /// Whether the scheduler timer is active.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.timer.lock().expect("timer lock poisoned").is_some()
    }

    /// Receive a state snapshot now and after every change.
    ///
    /// Snapshots arrive in the order the changes were made. The callback
    /// runs with the worker state locked and must not call back into the
    /// worker.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&BackupWorkerState) + Send + Sync + 'static,
    {
        let callback: StateCallback = Arc::new(callback);
        let state = self.state.lock().expect("worker state lock poisoned");
        self.bus.subscribe(&state, callback)
    }

    /// Load the configuration from the store and arm the scheduler.
    ///
    /// Must be called within a Tokio runtime.
    pub async fn initialize(self: &Arc<Self>) -> Result<()> {
        let config = self.store.load().await?;
        info!(
            "Loaded backup config: enabled={}, frequency={}",
            config.enabled, config.frequency
        );
        self.apply_config(config);
        Ok(())
    }

    /// Validate, persist and apply a new configuration.
    ///
    /// Must be called within a Tokio runtime.
    pub async fn update_config(self: &Arc<Self>, config: BackupConfig) -> Result<()> {
        let config = config.normalized();
        config.validate()?;
        self.store.save(&config).await?;
        self.apply_config(config);
        Ok(())
    }

    /// Apply a configuration without persisting it, re-arming the scheduler.
    ///
    /// Any pending timer is cancelled and, if the configuration is
    /// scheduled, replaced by a new one with a freshly computed next run.
    /// A running job is left alone.
    ///
    /// Must be called within a Tokio runtime.
    pub fn apply_config(self: &Arc<Self>, config: BackupConfig) {
        let config = config.normalized();
        *self.config.write().expect("worker config lock poisoned") = config.clone();
        self.cancel_timer();

        if !config.is_scheduled() {
            debug!("Scheduler idle (enabled={}, frequency={})", config.enabled, config.frequency);
            self.mutate(|state| state.next_scheduled_backup = None);
            return;
        }

        let token = CancellationToken::new();
        *self.timer.lock().expect("timer lock poisoned") = Some(token.clone());

        let now = self.clock.now();
        self.mutate(|state| state.next_scheduled_backup = self.zone.next_run(&self.config(), now));
        if let Some(next) = self.state().next_scheduled_backup {
            info!("Next {} backup scheduled for {}", config.frequency, next);
        }
        tokio::spawn(Arc::clone(self).run_timer(token));
    }

    /// Stop the scheduler timer and clear the next run.
    ///
    /// A running job still finishes but does not schedule another run.
    pub fn stop(&self) {
        if self.cancel_timer() {
            self.mutate(|state| state.next_scheduled_backup = None);
            info!("Backup scheduler stopped");
        }
    }

    /// Check the schedule once and run a backup if one is due.
    ///
    /// Returns the finished job if a run happened. A tick while a job is
    /// live does nothing; the next tick tries again.
    pub async fn tick(&self) -> Option<BackupJob> {
        let now = self.clock.now();
        let config = self.config();
        if !config.is_scheduled() {
            return None;
        }

        let job = {
            let mut state = self.state.lock().expect("worker state lock poisoned");
            let next = state.next_scheduled_backup?;
            if !schedule::is_due(&next, &now) {
                return None;
            }
            if state.is_running {
                debug!("Scheduled backup due but a job is already running");
                return None;
            }
            let job = Self::claim(&mut state, &config, false, now);
            self.bus.publish(&state);
            job
        };

        info!("Running scheduled backup due at {}", job.start_time);
        Some(self.execute(job, config).await)
    }

    /// Run a backup immediately.
    ///
    /// Backup failures are reported on the returned job, not as an error.
    ///
    /// # Errors
    /// Returns `SchedulerError::AlreadyRunning` if a job is live; the live
    /// job and the state are left untouched.
    pub async fn run_now(&self, force_full: bool) -> Result<BackupJob> {
        let now = self.clock.now();
        let config = self.config();

        let job = {
            let mut state = self.state.lock().expect("worker state lock poisoned");
            if state.is_running {
                warn!("Manual backup rejected: a backup is already in progress");
                return Err(SchedulerError::AlreadyRunning);
            }
            let job = Self::claim(&mut state, &config, force_full, now);
            self.bus.publish(&state);
            job
        };

        info!("Running manual backup");
        Ok(self.execute(job, config).await)
    }

    /// Shutdown hook: run one last backup if the configuration asks for it.
    ///
    /// Stops the scheduler first. Returns `None` when nothing ran, either
    /// because `backup_on_close` is off or because a job was already live.
    pub async fn backup_on_close(&self) -> Option<BackupJob> {
        self.stop();
        if !self.config().backup_on_close {
            return None;
        }

        info!("Running backup on close");
        match self.run_now(false).await {
            Ok(job) => Some(job),
            Err(e) => {
                warn!("Backup on close skipped: {}", e);
                None
            }
        }
    }

    /// Artifacts in the destination directory, newest first.
    pub async fn list_backups(&self) -> Result<Vec<BackupArtifact>> {
        let config = self.config();
        if config.destination_path.as_os_str().is_empty() || !config.destination_path.exists() {
            return Ok(Vec::new());
        }
        Ok(retention::list_artifacts(&config.destination_path).await?)
    }

    /// Delete a single artifact by file name.
    ///
    /// # Errors
    /// Returns `SchedulerError::InvalidArtifact` for names that are not
    /// artifacts or that point outside the destination directory.
    pub async fn delete_backup(&self, file_name: &str) -> Result<()> {
        if file_name.contains(['/', '\\']) || filename::decode(file_name).is_none() {
            return Err(SchedulerError::InvalidArtifact(file_name.to_string()));
        }
        let config = self.config();
        if config.destination_path.as_os_str().is_empty() {
            return Err(SchedulerError::NoDestination);
        }

        tokio::fs::remove_file(config.destination_path.join(file_name)).await?;
        info!("Deleted backup {}", file_name);
        self.refresh_stats(&config).await;
        Ok(())
    }

    /// Create the pending job and take the running flag.
    fn claim(
        state: &mut BackupWorkerState,
        config: &BackupConfig,
        force_full: bool,
        now: DateTime<Utc>,
    ) -> BackupJob {
        let decision = policy::decide(config, state, force_full);
        match decision {
            Decision::Full(reason) => debug!("Full backup chosen: {:?}", reason),
            Decision::Differential => debug!(
                "Differential backup chosen ({} since last full)",
                state.differentials_since_full
            ),
        }

        let job = BackupJob::new(decision.job_type(), now);
        state.is_running = true;
        state.current_job = Some(job.clone());
        job
    }

    /// Drive a claimed job to completion or failure and record the outcome.
    async fn execute(&self, mut job: BackupJob, config: BackupConfig) -> BackupJob {
        job.start();
        self.update_job(&job);
        info!(job_id = %job.id, job_type = %job.job_type, "backup started");

        match self.write_artifact(&mut job, &config).await {
            Ok(path) => {
                if config.max_backups_to_keep > 0 {
                    retention::enforce(&config.destination_path, config.max_backups_to_keep).await;
                }
                job.complete(path, self.clock.now());
                info!(job_id = %job.id, "backup completed");
            }
            Err(message) => {
                job.fail(message, self.clock.now());
                error!(job_id = %job.id, error = ?job.error, "backup failed");
            }
        }

        let now = self.clock.now();
        let finished = job.clone();
        self.mutate(move |state| {
            state.finish_job(finished);
            state.next_scheduled_backup = if self.is_armed() {
                self.zone.next_run(&self.config(), now)
            } else {
                None
            };
        });
        self.refresh_stats(&config).await;

        if config.notify_on_backup {
            match &job.error {
                None => info!(target: NOTIFY_TARGET, "{} backup completed", job.job_type),
                Some(e) => error!(target: NOTIFY_TARGET, "{} backup failed: {}", job.job_type, e),
            }
        }
        job
    }

    /// Ensure the destination exists and hand the write to the executor.
    async fn write_artifact(
        &self,
        job: &mut BackupJob,
        config: &BackupConfig,
    ) -> std::result::Result<PathBuf, String> {
        let dir = &config.destination_path;
        if dir.as_os_str().is_empty() {
            return Err(SchedulerError::NoDestination.to_string());
        }
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| format!("failed to create backup directory {}: {}", dir.display(), e))?;
        job.set_progress(10);
        self.update_job(job);

        let path = dir.join(filename::encode(job.start_time, job.job_type, config));
        let since = self.state().last_backup_time;
        let request = BackupRequest::new(config, path.clone(), job.job_type, since);
        debug!(job_id = %job.id, "executing {:?}", request);

        self.executor
            .execute(&request)
            .await
            .map_err(|e| format!("{e:#}"))?;
        job.set_progress(90);
        self.update_job(job);
        Ok(path)
    }

    /// Recount artifacts in the destination directory.
    async fn refresh_stats(&self, config: &BackupConfig) {
        let dir = &config.destination_path;
        if dir.as_os_str().is_empty() {
            return;
        }
        match retention::list_artifacts(dir).await {
            Ok(artifacts) => {
                let count = u32::try_from(artifacts.len()).unwrap_or(u32::MAX);
                let size = artifacts.iter().map(|a| a.size_bytes).sum();
                self.mutate(|state| {
                    state.backup_count = count;
                    state.total_size_bytes = size;
                });
            }
            Err(e) => debug!("Could not refresh backup stats: {}", e),
        }
    }

    async fn run_timer(self: Arc<Self>, token: CancellationToken) {
        let mut interval = tokio::time::interval(self.tick_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => break,
                _ = interval.tick() => {
                    let worker = Arc::clone(&self);
                    tokio::spawn(async move {
                        worker.tick().await;
                    });
                }
            }
        }
        debug!("Scheduler timer cancelled");
    }

    /// Returns true if a timer was active.
    fn cancel_timer(&self) -> bool {
        match self.timer.lock().expect("timer lock poisoned").take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn update_job(&self, job: &BackupJob) {
        let job = job.clone();
        self.mutate(move |state| state.current_job = Some(job));
    }

    /// Apply `f` to the state and publish the result before unlocking,
    /// so subscribers see changes in the order they were made.
    fn mutate<F>(&self, f: F)
    where
        F: FnOnce(&mut BackupWorkerState),
    {
        let mut state = self.state.lock().expect("worker state lock poisoned");
        f(&mut state);
        self.bus.publish(&state);
    }
}

impl std::fmt::Debug for BackupWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupWorker")
            .field("zone", &self.zone)
            .field("tick_period", &self.tick_period)
            .field("armed", &self.is_armed())
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}
