//! # Clock Collaborator
//!
//! The engine reads time only at decision points (the `close` timeout
//! check and event timestamps). Recorded readings must never go
//! backwards.
//!
//! - [`SystemClock`]: wall time; only as monotonic as the host clock.
//! - [`ManualClock`]: fixed time that only moves when told to; tests.
//! - [`OffsetClock`]: [`SystemClock`] plus a persisted forward offset;
//!   the devnet's equivalent of `chain.sleep()`. It also persists the
//!   latest marked reading, so a wall clock stepping backwards
//!   cannot move it behind time already recorded.

use serde::{Deserialize, Serialize};

use selfescrow_core::{CoreError, Timestamp};

/// Source of the current time.
pub trait Clock {
    /// The current time.
    fn now(&self) -> Timestamp;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that stands still until advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualClock {
    now: Timestamp,
}

impl ManualClock {
    /// Start the clock at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self { now: start }
    }

    /// Move the clock forward by `secs`.
    pub fn advance(&mut self, secs: u64) -> Result<Timestamp, CoreError> {
        self.now = self.now.checked_add_secs(secs).ok_or_else(|| {
            CoreError::InvalidTimestamp(format!("advancing {} by {secs}s overflows", self.now))
        })?;
        Ok(self.now)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now
    }
}

/// Wall time shifted forward by an accumulated offset.
///
/// `now` never returns less than the last [`OffsetClock::mark`]ed
/// reading. Between marks it follows the wall clock, so callers that
/// persist the clock must mark it after every reading they record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetClock {
    offset_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    high_water: Option<Timestamp>,
}

impl OffsetClock {
    /// A clock with the given starting offset.
    pub fn with_offset(offset_secs: u64) -> Self {
        Self {
            offset_secs,
            high_water: None,
        }
    }

    /// Read the clock and pin the reading as its new floor.
    pub fn mark(&mut self) -> Timestamp {
        let now = self.now();
        self.high_water = Some(now);
        now
    }

    /// Total seconds added to wall time.
    pub fn offset_secs(&self) -> u64 {
        self.offset_secs
    }

    /// Add `secs` to the offset.
    pub fn sleep(&mut self, secs: u64) -> Result<(), CoreError> {
        self.offset_secs = self.offset_secs.checked_add(secs).ok_or_else(|| {
            CoreError::InvalidTimestamp(format!("clock offset overflows adding {secs}s"))
        })?;
        Ok(())
    }
}

impl Clock for OffsetClock {
    fn now(&self) -> Timestamp {
        let wall = SystemClock.now();
        let shifted = wall.checked_add_secs(self.offset_secs).unwrap_or(wall);
        match self.high_water {
            Some(floor) => shifted.max(floor),
            None => shifted,
        }
    }
}
