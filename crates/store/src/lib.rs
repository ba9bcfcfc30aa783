//! Workspace store and calendar source implementations for Orcas.

pub mod calendar;
pub mod in_memory;
pub mod sqlite;

pub use calendar::{StaticCalendar, UnavailableCalendar};
pub use in_memory::InMemoryStore;
pub use sqlite::{NewTask, SqliteStore};
