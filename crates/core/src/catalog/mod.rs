//! Service catalog and candidate slot computation.
//!
//! Pure read-only configuration plus availability arithmetic: no I/O, no
//! shared mutable state. Candidate slots are recomputed on every call.

use chrono::{DateTime, Duration, NaiveTime, Utc, Weekday};
use chrono::{Datelike, LocalResult, TimeZone};
use chrono_tz::Tz;
use slotwise_common::time::ceil_to_granularity;
use slotwise_domain::{Config, Result, SchedulingError, Service, ServiceId, TimeSlot};
use tracing::instrument;

/// Offered services, opening hours, and slot granularity.
#[derive(Debug, Clone)]
pub struct SlotCatalog {
    services: Vec<Service>,
    timezone: Tz,
    open: NaiveTime,
    close: NaiveTime,
    closed_days: Vec<Weekday>,
    granularity_minutes: u32,
}

impl SlotCatalog {
    /// Build the catalog from loaded configuration. Fails on malformed hours
    /// or an empty service list.
    pub fn from_config(config: &Config) -> Result<Self> {
        let services: Vec<Service> = config.services.iter().map(Service::from).collect();
        if services.is_empty() {
            return Err(SchedulingError::Config("no services configured".into()));
        }
        let open = config.hours.open_time()?;
        let close = config.hours.close_time()?;
        if open >= close {
            return Err(SchedulingError::Config(format!(
                "opening hours are empty: {open} >= {close}"
            )));
        }
        Ok(Self {
            services,
            timezone: config.hours.timezone()?,
            open,
            close,
            closed_days: config.hours.closed_weekdays()?,
            granularity_minutes: config.scheduling.granularity_minutes.max(1),
        })
    }

    /// All services in configured display order.
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Look up one service, failing with `UnknownService`.
    pub fn service(&self, id: &ServiceId) -> Result<&Service> {
        self.services
            .iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| SchedulingError::UnknownService(id.to_string()))
    }

    /// Every slot of the right length for `service_id`, aligned to the
    /// configured granularity, fully inside opening hours and fully inside
    /// `window`. Earliest first; finite; deterministic for identical input.
    #[instrument(skip(self), fields(service = %service_id))]
    pub fn candidate_slots(&self, service_id: &ServiceId, window: TimeSlot) -> Result<Vec<TimeSlot>> {
        let service = self.service(service_id)?;
        let length = service.slot_duration();
        if window.start >= window.end || length <= Duration::zero() {
            return Ok(Vec::new());
        }

        let mut slots = Vec::new();
        // Walk the local calendar days the window touches; each open day
        // contributes one [open, close) range intersected with the window.
        let mut day = window.start.with_timezone(&self.timezone).date_naive();
        let last_day = window.end.with_timezone(&self.timezone).date_naive();

        while day <= last_day {
            if !self.closed_days.contains(&day.weekday()) {
                if let (Some(day_open), Some(day_close)) =
                    (self.local_instant(day, self.open), self.local_instant(day, self.close))
                {
                    let range_start = day_open.max(window.start);
                    let range_end = day_close.min(window.end);

                    let mut cursor = ceil_to_granularity(range_start, self.granularity_minutes);
                    let step = Duration::minutes(i64::from(self.granularity_minutes));
                    while cursor + length <= range_end {
                        slots.push(TimeSlot::from_start(cursor, length));
                        cursor += step;
                    }
                }
            }
            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        Ok(slots)
    }

    /// Resolve a local wall-clock time to UTC, skipping times that do not
    /// exist on DST transition days.
    fn local_instant(&self, day: chrono::NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
        match self.timezone.from_local_datetime(&day.and_time(time)) {
            LocalResult::Single(t) => Some(t.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
            LocalResult::None => None,
        }
    }
}
