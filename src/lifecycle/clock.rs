//! Wall-clock helper.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::rules::Timestamp;

/// Current time in seconds since the Unix epoch.
pub fn now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
