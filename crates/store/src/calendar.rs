//! Calendar sources.

use async_trait::async_trait;
use chrono::NaiveDate;
use orcas_core::calendar::{CalendarEvent, CalendarSource};
use orcas_core::error::CalendarError;

/// A fixed list of events.
#[derive(Debug, Clone, Default)]
pub struct StaticCalendar {
    events: Vec<CalendarEvent>,
}

impl StaticCalendar {
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl CalendarSource for StaticCalendar {
    async fn events_for_date(&self, date: NaiveDate) -> Result<Vec<CalendarEvent>, CalendarError> {
        let mut events: Vec<CalendarEvent> = self
            .events
            .iter()
            .filter(|e| e.occurs_on(date))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.start_date.cmp(&b.start_date));
        Ok(events)
    }
}

/// A calendar that cannot be read, e.g. when access was never granted.
#[derive(Debug, Clone)]
pub struct UnavailableCalendar {
    reason: String,
}

impl UnavailableCalendar {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CalendarSource for UnavailableCalendar {
    async fn events_for_date(&self, _date: NaiveDate) -> Result<Vec<CalendarEvent>, CalendarError> {
        Err(CalendarError::Unavailable(self.reason.clone()))
    }
}
