/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Wall-clock helpers shared by the cache engine and the remote facade.

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current UTC time in nanoseconds since the Unix epoch.
///
/// Clocks set before the epoch report `0` rather than failing; entry
/// timestamps are informational and never participate in ordering.
#[must_use]
pub fn current_time_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Returns the current UTC time in milliseconds since the Unix epoch, or
/// `None` when the system clock reads earlier than the epoch.
#[must_use]
pub fn current_time_millis() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| u64::try_from(d.as_millis()).ok())
}
