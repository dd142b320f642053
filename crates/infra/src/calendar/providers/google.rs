//! Google Calendar v3 API client.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use slotwise_core::EventMetadata;
use slotwise_domain::{CalendarConfig, Result, SchedulingError, TimeSlot};
use tracing::warn;

use super::{CalendarApi, ProviderEvent};
use crate::calendar::token::AccessTokenProvider;
use crate::errors::InfraError;

const API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const PAGE_SIZE: u32 = 250;

pub struct GoogleCalendarApi {
    http: Client,
    base_url: String,
    calendar_id: String,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl GoogleCalendarApi {
    pub fn new(http: Client, config: &CalendarConfig, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self {
            http,
            base_url: API_BASE.to_string(),
            calendar_id: config.calendar_id.clone(),
            tokens,
        }
    }

    /// Point the client at a different API root (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.base_url, self.calendar_id)
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), event_id)
    }

    async fn bearer(&self) -> Result<String> {
        self.tokens.access_token().await
    }
}

/// Map a non-success provider status onto the domain taxonomy. Rate limiting
/// and server faults are transient; everything else is a refusal.
fn status_to_error(status: StatusCode, body: &str) -> SchedulingError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        SchedulingError::CalendarUnavailable(format!("provider returned {status}: {body}"))
    } else {
        SchedulingError::CalendarRejected(format!("provider returned {status}: {body}"))
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendarApi {
    async fn list_events(&self, window: TimeSlot) -> Result<Vec<ProviderEvent>> {
        let token = self.bearer().await?;
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("timeMin", window.start.to_rfc3339()),
                ("timeMax", window.end.to_rfc3339()),
                ("singleEvents", "true".into()),
                ("orderBy", "startTime".into()),
                ("maxResults", PAGE_SIZE.to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .http
                .get(self.events_url())
                .bearer_auth(&token)
                .query(&query)
                .send()
                .await
                .map_err(InfraError::from)?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(status_to_error(status, &body));
            }

            let page: EventsPage = response.json().await.map_err(InfraError::from)?;
            for item in page.items {
                // Skips cancelled entries and events without usable times.
                if let Some(event) = item.into_provider_event() {
                    events.push(event);
                }
            }

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(events)
    }

    async fn insert_event(
        &self,
        event_id: &str,
        slot: TimeSlot,
        metadata: &EventMetadata,
    ) -> Result<ProviderEvent> {
        let token = self.bearer().await?;
        let body = json!({
            "id": event_id,
            "summary": metadata.summary,
            "description": metadata.description,
            "start": { "dateTime": slot.start.to_rfc3339() },
            "end": { "dateTime": slot.end.to_rfc3339() },
        });

        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(InfraError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body));
        }

        let event: EventResource = response.json().await.map_err(InfraError::from)?;
        event
            .into_provider_event()
            .ok_or_else(|| SchedulingError::CalendarRejected("created event has no times".into()))
    }

    async fn get_event(&self, event_id: &str) -> Result<Option<ProviderEvent>> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(self.event_url(event_id))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(InfraError::from)?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => Ok(None),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(status_to_error(status, &body))
            }
            _ => {
                let event: EventResource = response.json().await.map_err(InfraError::from)?;
                Ok(event.into_provider_event())
            }
        }
    }

    async fn delete_event(&self, event_id: &str) -> Result<()> {
        let token = self.bearer().await?;
        let response = self
            .http
            .delete(self.event_url(event_id))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(InfraError::from)?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => Ok(()),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(status_to_error(status, &body))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventsPage {
    #[serde(default)]
    items: Vec<EventResource>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventResource {
    id: String,
    #[serde(default)]
    status: Option<String>,
    start: Option<EventTime>,
    end: Option<EventTime>,
}

#[derive(Debug, Deserialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

impl EventTime {
    /// Timed events carry RFC 3339 `dateTime`; all-day events carry a bare
    /// `date`, which we widen to local midnight UTC.
    fn resolve(&self) -> Option<DateTime<Utc>> {
        if let Some(dt) = &self.date_time {
            return DateTime::parse_from_rfc3339(dt).ok().map(|dt| dt.with_timezone(&Utc));
        }
        let date: NaiveDate = self.date.as_deref()?.parse().ok()?;
        Some(DateTime::from_naive_utc_and_offset(date.and_hms_opt(0, 0, 0)?, Utc))
    }
}

impl EventResource {
    fn into_provider_event(self) -> Option<ProviderEvent> {
        if self.status.as_deref() == Some("cancelled") {
            return None;
        }
        let start = self.start.as_ref().and_then(EventTime::resolve);
        let end = self.end.as_ref().and_then(EventTime::resolve);
        match (start, end) {
            (Some(start), Some(end)) => Some(ProviderEvent { id: self.id, start, end }),
            _ => {
                warn!(event_id = %self.id, "event missing start or end, skipped");
                None
            }
        }
    }
}
