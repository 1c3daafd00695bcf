use crate::domain::indicators::SessionTag;
use chrono::{DateTime, Timelike, Utc};

/// Killzone windows in UTC hours, `[start, end)`. Non-overlapping.
const SESSION_WINDOWS: [(u32, u32, SessionTag); 4] = [
    (2, 5, SessionTag::London),
    (13, 16, SessionTag::NewYorkAm),
    (19, 20, SessionTag::NewYorkPm),
    (20, 24, SessionTag::Asian),
];

/// Session tag for a UTC hour of day; `None` outside every window
pub fn session_for_hour(hour: u32) -> Option<SessionTag> {
    SESSION_WINDOWS
        .iter()
        .find(|(start, end, _)| hour >= *start && hour < *end)
        .map(|(_, _, tag)| *tag)
}

pub fn session_at(now: DateTime<Utc>) -> Option<SessionTag> {
    session_for_hour(now.hour())
}
