//! Wall clock access, abstracted so deadline checks can be tested

use chrono::Utc;

/// A source of the current unix time
pub trait Clock: Send + Sync {
    /// The current unix timestamp in seconds
    fn now_unix(&self) -> u64;
}

/// The system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        u64::try_from(Utc::now().timestamp()).unwrap_or_default()
    }
}
