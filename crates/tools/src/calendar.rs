//! Calendar lookup tool.
//!
//! Calendar access is optional, so a failing source produces an explanation
//! the model can relay instead of an error result.

use async_trait::async_trait;
use chrono::NaiveDate;
use orcas_core::calendar::{CalendarEvent, CalendarSource};
use orcas_core::error::ToolError;
use orcas_core::tool::{Tool, ToolContext, required_str};
use serde_json::{Value, json};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::warn;

pub struct GetCalendarEventsTool {
    calendar: Arc<dyn CalendarSource>,
}

impl GetCalendarEventsTool {
    pub fn new(calendar: Arc<dyn CalendarSource>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl Tool for GetCalendarEventsTool {
    fn name(&self) -> &str {
        "get_calendar_events"
    }

    fn description(&self) -> &str {
        "List the user's calendar events on a given day."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "date": {
                    "type": "string",
                    "description": "The day to look up, formatted YYYY-MM-DD"
                }
            },
            "required": ["date"]
        })
    }

    async fn execute(&self, input: &Value, _ctx: &ToolContext) -> Result<String, ToolError> {
        let raw = required_str(input, "date")?;
        let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
            ToolError::InvalidArguments(format!("'date' must be formatted YYYY-MM-DD, got \"{raw}\""))
        })?;

        let events = match self.calendar.events_for_date(date).await {
            Ok(events) => events,
            Err(e) => {
                warn!(%date, error = %e, "Calendar lookup failed");
                return Ok(format!(
                    "Calendar events for {date} are not available ({e}). \
                     Continue without calendar information."
                ));
            }
        };

        if events.is_empty() {
            return Ok(format!("No calendar events on {date}."));
        }

        let mut out = format!("{} event(s) on {date}:\n", events.len());
        for event in &events {
            let _ = write!(out, "- {} {}", time_range(event), event.title);
            if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
                let _ = write!(out, " @ {location}");
            }
            if !event.attendees.is_empty() {
                let _ = write!(out, " (with {})", event.attendees.join(", "));
            }
            out.push('\n');
        }
        Ok(out.trim_end().to_string())
    }
}

/// `09:00-09:30`, or `All day`.
fn time_range(event: &CalendarEvent) -> String {
    if event.is_all_day {
        return "All day".into();
    }
    let clock = |s: &str| s.get(11..16).map(str::to_string);
    match (clock(&event.start_date), clock(&event.end_date)) {
        (Some(start), Some(end)) => format!("{start}-{end}"),
        (Some(start), None) => start,
        _ => event.start_date.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orcas_store::{StaticCalendar, UnavailableCalendar};

    fn standup() -> CalendarEvent {
        CalendarEvent {
            id: "e1".into(),
            title: "Standup".into(),
            start_date: "2025-06-02T09:00:00Z".into(),
            end_date: "2025-06-02T09:15:00Z".into(),
            is_all_day: false,
            location: Some("Room 4".into()),
            notes: None,
            url: None,
            attendees: vec!["Ana".into(), "Raj".into()],
            calendar_id: "work".into(),
        }
    }

    #[tokio::test]
    async fn lists_events_for_day() {
        let tool = GetCalendarEventsTool::new(Arc::new(StaticCalendar::new(vec![standup()])));
        let out = tool
            .execute(&json!({"date": "2025-06-02"}), &ToolContext::new())
            .await
            .unwrap();
        assert!(out.contains("- 09:00-09:15 Standup @ Room 4 (with Ana, Raj)"));

        let empty = tool
            .execute(&json!({"date": "2025-06-03"}), &ToolContext::new())
            .await
            .unwrap();
        assert_eq!(empty, "No calendar events on 2025-06-03.");
    }

    #[tokio::test]
    async fn unavailable_calendar_degrades_to_text() {
        let tool = GetCalendarEventsTool::new(Arc::new(UnavailableCalendar::new("access denied")));
        let out = tool
            .execute(&json!({"date": "2025-06-02"}), &ToolContext::new())
            .await
            .unwrap();
        assert!(out.contains("not available"));
        assert!(out.contains("access denied"));
    }

    #[tokio::test]
    async fn bad_date_rejected() {
        let tool = GetCalendarEventsTool::new(Arc::new(StaticCalendar::default()));
        let err = tool
            .execute(&json!({"date": "next tuesday"}), &ToolContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
