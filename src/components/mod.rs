// Export components
pub mod alarms;
pub mod google_calendar;

// Re-export the calendar seam
pub use google_calendar::{CalendarService, GoogleCalendarClient};
