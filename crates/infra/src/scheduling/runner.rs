//! Cron-driven runner for periodic maintenance passes.
//!
//! Lifecycle rules: join handles are tracked, cancellation is explicit, and
//! every run is wrapped in a timeout so a hung pass cannot pile up behind
//! the next tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};

/// A periodic maintenance pass the runner can drive.
#[async_trait]
pub trait MaintenancePass: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Execute one run. The returned string summarizes the outcome for the
    /// log line.
    async fn run_once(&self) -> slotwise_domain::Result<String>;
}

#[derive(Debug, Clone)]
pub struct PassSchedulerConfig {
    /// Six-field cron expression (seconds first).
    pub cron_expression: String,
    /// Timeout applied to a single run.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for PassSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: "0 */2 * * * *".into(), // every 2 minutes
            job_timeout: Duration::from_secs(120),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl PassSchedulerConfig {
    pub fn with_cron(cron_expression: impl Into<String>) -> Self {
        Self { cron_expression: cron_expression.into(), ..Self::default() }
    }
}

/// Runs one [`MaintenancePass`] on a cron schedule with explicit lifecycle
/// management.
pub struct PassScheduler {
    config: PassSchedulerConfig,
    pass: Arc<dyn MaintenancePass>,
    scheduler: Option<JobScheduler>,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
}

impl PassScheduler {
    pub fn new(config: PassSchedulerConfig, pass: Arc<dyn MaintenancePass>) -> Self {
        Self {
            config,
            pass,
            scheduler: None,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    #[instrument(skip(self), fields(pass = self.pass.name()))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;
        tokio::time::timeout(start_timeout, scheduler.start())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?
            .map_err(|e| SchedulerError::StartFailed(e.to_string()))?;
        self.scheduler = Some(scheduler);

        let cancel = self.cancellation.clone();
        let name = self.pass.name();
        self.monitor_handle = Some(tokio::spawn(async move {
            cancel.cancelled().await;
            debug!(pass = name, "scheduler monitor cancelled");
        }));

        info!(pass = self.pass.name(), cron = %self.config.cron_expression, "scheduler started");
        Ok(())
    }

    #[instrument(skip(self), fields(pass = self.pass.name()))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let mut scheduler = self.scheduler.take().ok_or(SchedulerError::NotRunning)?;

        self.cancellation.cancel();

        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, scheduler.shutdown())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?
            .map_err(|e| SchedulerError::StopFailed(e.to_string()))?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|e| SchedulerError::TaskJoinFailed(e.to_string()))?;
        }

        info!(pass = self.pass.name(), "scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::CreationFailed(e.to_string()))?;

        let pass = self.pass.clone();
        let job_timeout = self.config.job_timeout;

        let job = Job::new_async(self.config.cron_expression.as_str(), move |_id, _lock| {
            let pass = pass.clone();
            Box::pin(async move {
                let started = Instant::now();
                match tokio::time::timeout(job_timeout, pass.run_once()).await {
                    Ok(Ok(summary)) => {
                        debug!(
                            pass = pass.name(),
                            %summary,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "pass finished"
                        );
                    }
                    Ok(Err(err)) => {
                        error!(pass = pass.name(), error = %err, "pass failed");
                    }
                    Err(_) => {
                        warn!(
                            pass = pass.name(),
                            timeout_secs = job_timeout.as_secs(),
                            "pass timed out"
                        );
                    }
                }
            })
        })
        .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        scheduler
            .add(job)
            .await
            .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        Ok(scheduler)
    }
}

impl Drop for PassScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!(pass = self.pass.name(), "scheduler dropped while running, cancelling tasks");
            self.cancellation.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingPass {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl MaintenancePass for CountingPass {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run_once(&self) -> slotwise_domain::Result<String> {
            let n = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("run {n}"))
        }
    }

    fn every_second() -> PassSchedulerConfig {
        PassSchedulerConfig::with_cron("* * * * * *")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lifecycle_runs_the_pass() {
        let pass = Arc::new(CountingPass { runs: AtomicUsize::new(0) });
        let mut scheduler = PassScheduler::new(every_second(), pass.clone());

        scheduler.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        scheduler.stop().await.unwrap();

        assert!(!scheduler.is_running());
        assert!(pass.runs.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn double_start_is_rejected() {
        let pass = Arc::new(CountingPass { runs: AtomicUsize::new(0) });
        let mut scheduler = PassScheduler::new(every_second(), pass);

        scheduler.start().await.unwrap();
        assert!(matches!(scheduler.start().await, Err(SchedulerError::AlreadyRunning)));
        scheduler.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_without_start_is_rejected() {
        let pass = Arc::new(CountingPass { runs: AtomicUsize::new(0) });
        let mut scheduler = PassScheduler::new(every_second(), pass);
        assert!(matches!(scheduler.stop().await, Err(SchedulerError::NotRunning)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn restart_after_stop_succeeds() {
        let pass = Arc::new(CountingPass { runs: AtomicUsize::new(0) });
        let mut scheduler = PassScheduler::new(every_second(), pass);

        scheduler.start().await.unwrap();
        scheduler.stop().await.unwrap();
        scheduler.start().await.unwrap();
        scheduler.stop().await.unwrap();
    }
}
