//! Calendar source: read-only access to the user's calendar events.
//!
//! Calendar access is optional and permissioned; callers are expected to
//! degrade gracefully when a source reports an error.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    /// RFC 3339 start timestamp
    pub start_date: String,
    /// RFC 3339 end timestamp
    pub end_date: String,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<String>,
    pub calendar_id: String,
}

impl CalendarEvent {
    /// Whether the event overlaps the given calendar day.
    ///
    /// Timestamps that do not start with a `YYYY-MM-DD` date never match.
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        let day = |s: &str| s.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        match (day(&self.start_date), day(&self.end_date)) {
            (Some(start), Some(end)) => start <= date && date <= end,
            (Some(start), None) => start == date,
            _ => false,
        }
    }
}

#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Events overlapping `date`, ordered by start time.
    async fn events_for_date(&self, date: NaiveDate) -> Result<Vec<CalendarEvent>, CalendarError>;
}
