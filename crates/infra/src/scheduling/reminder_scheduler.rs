//! Cron wiring for the reminder pass.

use std::sync::Arc;

use async_trait::async_trait;
use slotwise_core::ReminderService;

use super::error::SchedulerResult;
use super::runner::{MaintenancePass, PassScheduler, PassSchedulerConfig};

struct ReminderPass(Arc<ReminderService>);

#[async_trait]
impl MaintenancePass for ReminderPass {
    fn name(&self) -> &'static str {
        "reminder"
    }

    async fn run_once(&self) -> slotwise_domain::Result<String> {
        let sent = self.0.run_once().await?;
        Ok(format!("sent={sent}"))
    }
}

/// Runs [`ReminderService::run_once`] on a cron schedule.
pub struct ReminderScheduler {
    inner: PassScheduler,
}

impl ReminderScheduler {
    pub fn new(config: PassSchedulerConfig, service: Arc<ReminderService>) -> Self {
        Self { inner: PassScheduler::new(config, Arc::new(ReminderPass(service))) }
    }

    pub async fn start(&mut self) -> SchedulerResult<()> {
        self.inner.start().await
    }

    pub async fn stop(&mut self) -> SchedulerResult<()> {
        self.inner.stop().await
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }
}
