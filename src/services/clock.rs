//! Time source for path resolution.

use chrono::{Local, NaiveDateTime};
use uuid::Uuid;

/// A single reading taken once per request.
///
/// Holding the local wall clock, the epoch time and a random nonce together
/// keeps path resolution a pure function of its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    /// Local wall-clock date and time.
    pub local: NaiveDateTime,
    /// Milliseconds since the Unix epoch.
    pub epoch_millis: i64,
    pub nonce: Uuid,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> Stamp;
}

/// Reads the host clock and draws a fresh v4 nonce.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Stamp {
        let now = Local::now();
        Stamp {
            local: now.naive_local(),
            epoch_millis: now.timestamp_millis(),
            nonce: Uuid::new_v4(),
        }
    }
}

/// Always returns the same reading.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Stamp);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> Stamp {
        self.0
    }
}
