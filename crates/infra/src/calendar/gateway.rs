//! CalendarGateway port implementation over a vendor API client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use slotwise_common::{retry_with_policy, RetryConfig};
use slotwise_core::{CalendarGateway, EventMetadata};
use slotwise_domain::{BusyInterval, EventRef, Result, SchedulingError, TimeSlot};
use tracing::{debug, instrument};

use super::providers::CalendarApi;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Adapts a raw [`CalendarApi`] to the gateway port: bounded retries on
/// transient faults, an overall per-call timeout, and idempotent create via
/// caller-chosen event ids.
pub struct HttpCalendarGateway {
    api: Arc<dyn CalendarApi>,
    retry: RetryConfig,
    call_timeout: Duration,
}

impl HttpCalendarGateway {
    pub fn new(api: Arc<dyn CalendarApi>) -> Self {
        Self { api, retry: RetryConfig::default(), call_timeout: DEFAULT_CALL_TIMEOUT }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Retry transient errors, then bound the whole exchange with a timeout.
    async fn call<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let attempt = retry_with_policy(&self.retry, &SchedulingError::is_transient, operation);
        match tokio::time::timeout(self.call_timeout, attempt).await {
            Ok(result) => result.map_err(|e| e.into_source()),
            Err(_) => Err(SchedulingError::CalendarUnavailable(format!(
                "calendar call exceeded {:?}",
                self.call_timeout
            ))),
        }
    }
}

#[async_trait]
impl CalendarGateway for HttpCalendarGateway {
    async fn list_busy(&self, window: TimeSlot) -> Result<Vec<BusyInterval>> {
        let events = self.call(|| self.api.list_events(window)).await?;
        Ok(events
            .into_iter()
            .map(|e| BusyInterval::with_event_ref(e.start, e.end, e.id))
            .collect())
    }

    #[instrument(skip(self, metadata), fields(key = idempotency_key))]
    async fn create_event(
        &self,
        slot: TimeSlot,
        metadata: &EventMetadata,
        idempotency_key: &str,
    ) -> Result<EventRef> {
        let inserted = self
            .call(|| self.api.insert_event(idempotency_key, slot, metadata))
            .await;

        match inserted {
            Ok(event) => Ok(EventRef::new(event.id)),
            // A refusal may be a replay of an earlier successful create; the
            // event id is ours, so look it up before giving up.
            Err(SchedulingError::CalendarRejected(reason)) => {
                match self.call(|| self.api.get_event(idempotency_key)).await? {
                    Some(existing) => {
                        debug!("create replayed, reusing existing event");
                        Ok(EventRef::new(existing.id))
                    }
                    None => Err(SchedulingError::CalendarRejected(reason)),
                }
            }
            Err(other) => Err(other),
        }
    }

    async fn delete_event(&self, event_ref: &EventRef) -> Result<()> {
        self.call(|| self.api.delete_event(event_ref.as_str())).await
    }
}
