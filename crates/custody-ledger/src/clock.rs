use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use custody_types::{AccountId, Timestamp};

/// Source of logical time for building [`Call`]s.
pub trait Clock: Send + Sync {
    /// Current logical time. Successive readings never decrease.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time that never runs backwards.
///
/// If the system clock is stepped back, readings hold at the highest value
/// seen so far until wall time catches up.
pub struct SystemClock {
    high_water: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            high_water: AtomicU64::new(0),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = Timestamp::now().as_secs();
        let previous = self.high_water.fetch_max(wall, Ordering::SeqCst);
        Timestamp::from_secs(previous.max(wall))
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Default)]
pub struct ManualClock {
    secs: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            secs: AtomicU64::new(start.as_secs()),
        }
    }

    /// Move time forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let secs = delta.as_secs();
        let _ = self
            .secs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                Some(cur.saturating_add(secs))
            });
    }

    /// Jump to `to`. Earlier values are ignored so time stays monotonic.
    pub fn set(&self, to: Timestamp) {
        self.secs.fetch_max(to.as_secs(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_secs(self.secs.load(Ordering::SeqCst))
    }
}

/// Host-supplied inputs to one ledger operation: who is calling, and when.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub caller: AccountId,
    pub now: Timestamp,
}

impl Call {
    pub fn new(caller: AccountId, now: Timestamp) -> Self {
        Self { caller, now }
    }

    /// A call by `caller` stamped with a single reading of `clock`.
    pub fn at(caller: AccountId, clock: &dyn Clock) -> Self {
        Self {
            caller,
            now: clock.now(),
        }
    }
}
