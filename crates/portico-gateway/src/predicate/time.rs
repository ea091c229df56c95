//! Clock-based predicates: daily window, monthly recurrence, absolute range.
//!
//! Wall-clock kinds evaluate against local time; the absolute range uses
//! UTC instants.  Each predicate exposes a `matches_at` used by the trait
//! impl with the current time, which is also what the tests drive.

use crate::container::{bind_params, BuildError};
use chrono::{DateTime, Datelike, Local, NaiveTime, Utc};
use portico_kernel::gateway::{PluginParams, Predicate, RequestContext};
use serde::Deserialize;

// ─────────────────────────────────────────────────────────────────────────────
// Daily window
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct DailyConfig {
    begin: NaiveTime,
    end: NaiveTime,
}

/// Matches between `begin` and `end` wall-clock time on the same local day,
/// boundaries inclusive.  Windows crossing midnight are not supported and
/// are rejected at configuration time.
pub struct DailyPredicate {
    begin: NaiveTime,
    end: NaiveTime,
}

impl DailyPredicate {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: DailyConfig = bind_params(params)?;
        if config.begin > config.end {
            return Err(BuildError::invalid(
                "daily window must not cross midnight (begin > end)",
            ));
        }
        Ok(Self {
            begin: config.begin,
            end: config.end,
        })
    }

    fn matches_at(&self, now: NaiveTime) -> bool {
        self.begin <= now && now <= self.end
    }
}

impl Predicate for DailyPredicate {
    fn matches(&self, _ctx: &RequestContext) -> bool {
        self.matches_at(Local::now().time())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Monthly recurrence
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct MonthlyConfig {
    months: Vec<u32>,
}

/// Matches when the current month is among the configured set (1–12).
pub struct MonthlyPredicate {
    months: Vec<u32>,
}

impl MonthlyPredicate {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: MonthlyConfig = bind_params(params)?;
        if config.months.is_empty() {
            return Err(BuildError::invalid("'months' must not be empty"));
        }
        if let Some(bad) = config.months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(BuildError::invalid(format!("invalid month {bad}")));
        }
        Ok(Self {
            months: config.months,
        })
    }

    fn matches_at(&self, month: u32) -> bool {
        self.months.contains(&month)
    }
}

impl Predicate for MonthlyPredicate {
    fn matches(&self, _ctx: &RequestContext) -> bool {
        self.matches_at(Local::now().month())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Absolute time range
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TimeRangeConfig {
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Matches strictly between two absolute instants.
pub struct TimeRangePredicate {
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRangePredicate {
    pub fn from_params(params: &PluginParams) -> Result<Self, BuildError> {
        let config: TimeRangeConfig = bind_params(params)?;
        if config.begin > config.end {
            return Err(BuildError::invalid("'begin' must not be after 'end'"));
        }
        Ok(Self {
            begin: config.begin,
            end: config.end,
        })
    }

    fn matches_at(&self, now: DateTime<Utc>) -> bool {
        self.begin < now && now < self.end
    }
}

impl Predicate for TimeRangePredicate {
    fn matches(&self, _ctx: &RequestContext) -> bool {
        self.matches_at(Utc::now())
    }
}
