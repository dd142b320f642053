//! Cron wiring for the reconciliation sweep.

use std::sync::Arc;

use async_trait::async_trait;
use slotwise_core::ReconciliationService;

use super::error::SchedulerResult;
use super::runner::{MaintenancePass, PassScheduler, PassSchedulerConfig};

struct ReconcilePass(Arc<ReconciliationService>);

#[async_trait]
impl MaintenancePass for ReconcilePass {
    fn name(&self) -> &'static str {
        "reconcile"
    }

    async fn run_once(&self) -> slotwise_domain::Result<String> {
        let report = self.0.run_once().await?;
        Ok(format!("expired={} cancelled={}", report.expired, report.cancelled))
    }
}

/// Runs [`ReconciliationService::run_once`] on a cron schedule.
pub struct ReconcileScheduler {
    inner: PassScheduler,
}

impl ReconcileScheduler {
    pub fn new(config: PassSchedulerConfig, service: Arc<ReconciliationService>) -> Self {
        Self { inner: PassScheduler::new(config, Arc::new(ReconcilePass(service))) }
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
