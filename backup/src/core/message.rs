//! Default commit message for backup commits.

use chrono::{DateTime, Local, TimeZone};

pub const MESSAGE_PREFIX: &str = "Backup";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `Backup: YYYY-MM-DD HH:MM:SS` in the timestamp's own zone.
pub fn default_commit_message<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{MESSAGE_PREFIX}: {}", now.format(TIMESTAMP_FORMAT))
}

/// Default message stamped with the current local time.
pub fn commit_message_now() -> String {
    default_commit_message(&Local::now())
}
