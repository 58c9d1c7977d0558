//! UTC wall-clock instants carried by token payloads.

use std::fmt;

use bincode::{Decode, Encode};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// An instant as (seconds, nanoseconds) since the Unix epoch, UTC.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
    Encode, Decode, Serialize, Deserialize,
)]
pub struct Timestamp {
    /// Whole seconds since the epoch.
    pub seconds: i64,
    /// Sub-second nanoseconds.
    pub nanos: u32,
}

impl Timestamp {
    /// The current instant.
    #[must_use]
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    /// The instant `offset_secs` seconds from now, saturating at the far
    /// end of the representable range instead of overflowing.
    #[must_use]
    pub fn from_now(offset_secs: u64) -> Self {
        let at = i64::try_from(offset_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|offset| Utc::now().checked_add_signed(offset))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::from(at)
    }

    /// Convert back to a `chrono` datetime, if representable.
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanos)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self {
            seconds: at.timestamp(),
            nanos: at.timestamp_subsec_nanos(),
        }
    }
}

impl fmt::Display for Timestamp {
    /// `YYYY-MM-DD HH:MM:SS.mmm`, millisecond precision.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(at) => write!(f, "{}", at.format("%Y-%m-%d %H:%M:%S%.3f")),
            None => write!(f, "<out-of-range timestamp>"),
        }
    }
}
