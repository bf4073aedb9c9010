use chrono::Utc;
use std::fmt;

/// Moment a photo entered the grid. Unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UploadStamp(u64);

impl UploadStamp {
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }
}

impl fmt::Display for UploadStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of upload stamps. Every call must return a stamp strictly greater
/// than the previous one.
pub trait UploadClock: Send {
    fn now(&mut self) -> UploadStamp;
}

/// Wall-clock milliseconds, bumped by one whenever two uploads land in the
/// same millisecond or the system clock steps backwards.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Option<u64>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UploadClock for MonotonicClock {
    fn now(&mut self) -> UploadStamp {
        let wall = Utc::now().timestamp_millis().max(0) as u64;
        let next = match self.last {
            Some(last) if wall <= last => last + 1,
            _ => wall,
        };
        self.last = Some(next);
        UploadStamp(next)
    }
}

/// Deterministic clock for tests: starts at `start`, advances by `step`.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    next: u64,
    step: u64,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: u64, step: u64) -> Self {
        Self { next: start, step }
    }
}

#[cfg(test)]
impl UploadClock for ManualClock {
    fn now(&mut self) -> UploadStamp {
        let stamp = UploadStamp(self.next);
        self.next += self.step;
        stamp
    }
}
