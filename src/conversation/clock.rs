//! Time source for message timestamps

use chrono::{DateTime, Duration, Local};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Deterministic clock that advances by a fixed step on every reading
#[derive(Debug)]
pub struct FixedClock {
    next: Mutex<DateTime<Local>>,
    step: Duration,
}

impl FixedClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self::with_step(start, Duration::seconds(1))
    }

    pub fn with_step(start: DateTime<Local>, step: Duration) -> Self {
        Self {
            next: Mutex::new(start),
            step,
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        let mut next = self.next.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let current = *next;
        *next = current + self.step;
        current
    }
}
