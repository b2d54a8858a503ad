//! Clock port
//!
//! Abstracts wall-clock UTC plus IANA time-zone lookup so the evaluator is
//! deterministic under test, per §6 ("Clock: wall-clock UTC and IANA
//! time-zone resolution"). The source's timezone validity caches
//! (`get_timezone`'s module-level valid/invalid maps) are ported here as a
//! process-level memoization per the "global mutable caches -> process-level
//! memoization" design note (§9): a `OnceLock`-backed append-only cache of
//! previously-resolved zone names, read without ever mutating through a
//! shared reference once populated.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use crate::domain::error::SchedulerError;

pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A fixed instant, used by evaluator tests that need deterministic time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

fn invalid_zone_cache() -> &'static Mutex<HashSet<String>> {
    static CACHE: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Resolves an IANA zone name, short-circuiting with a cached rejection for
/// names already known to be invalid. `chrono_tz`'s own `Tz::from_str`
/// already memoizes the valid side via its static lookup table, so only the
/// invalid side needs a cache here.
pub fn resolve_timezone(name: &str) -> Result<Tz, SchedulerError> {
    if invalid_zone_cache().lock().unwrap().contains(name) {
        return Err(SchedulerError::InvalidTimeZone(name.to_string()));
    }
    name.parse::<Tz>().map_err(|_| {
        invalid_zone_cache().lock().unwrap().insert(name.to_string());
        SchedulerError::InvalidTimeZone(name.to_string())
    })
}
