//! Next due date computation.
//!
//! # Responsibility
//! - Turn a recurrence rule, a reference instant and chore history into the
//!   next due instant.
//! - Pick the reference instant for rolling vs fixed cadence.
//!
//! # Invariants
//! - Pure: no clock reads, no I/O, no shared mutable state.
//! - `Once`, `NoRepeat` and `Trigger` never produce a calendar due date.
//! - Calendar steps run in the rule's zone (engine default when unset).

use crate::config::{EngineConfig, MIN_ADAPTIVE_WINDOW};
use crate::model::history::{recent_completion_times, ChoreHistory};
use crate::model::recurrence::{IntervalUnit, Recurrence, RecurrenceRule, RuleError};
use crate::schedule::calendar::{
    add_days, add_months, local_to_utc, next_day_of_month, next_weekday_in, utc_to_local,
    with_time_of_day,
};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;

const DAYS_PER_WEEK: u64 = 7;
const MONTHS_PER_YEAR: u32 = 12;

/// Computes next due dates for recurrence rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueDateCalculator {
    default_timezone: Tz,
    adaptive_window: usize,
}

impl Default for DueDateCalculator {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl DueDateCalculator {
    /// Creates a calculator; `adaptive_window` is raised to at least 2.
    pub fn new(default_timezone: Tz, adaptive_window: usize) -> Self {
        Self {
            default_timezone,
            adaptive_window: adaptive_window.max(MIN_ADAPTIVE_WINDOW),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.default_timezone, config.adaptive_window)
    }

    pub fn default_timezone(&self) -> Tz {
        self.default_timezone
    }

    /// Computes the due date following an event performed at `performed_at`.
    ///
    /// # Contract
    /// - Rolling rules step from `performed_at`.
    /// - Fixed rules step once from `previous_due`, so an overdue chore lands
    ///   on the slot after the missed one; with no previous due date they
    ///   fall back to `performed_at`.
    pub fn next_due_date(
        &self,
        rule: &RecurrenceRule,
        previous_due: Option<DateTime<Utc>>,
        performed_at: DateTime<Utc>,
        history: &[ChoreHistory],
    ) -> Result<Option<DateTime<Utc>>, RuleError> {
        let reference = reference_time(rule, previous_due, performed_at);
        self.compute_next_due_date(rule, reference, history)
    }

    /// Computes the due date that follows `reference`.
    ///
    /// `history` is read only by adaptive rules; pass it most-recent-first.
    ///
    /// # Errors
    /// - Any `RuleError` from `RecurrenceRule::validate`.
    /// - `DateOutOfRange` when the result cannot be represented.
    pub fn compute_next_due_date(
        &self,
        rule: &RecurrenceRule,
        reference: DateTime<Utc>,
        history: &[ChoreHistory],
    ) -> Result<Option<DateTime<Utc>>, RuleError> {
        rule.validate()?;
        let tz = rule.timezone.unwrap_or(self.default_timezone);
        let local = utc_to_local(tz, reference);

        let next_local = match &rule.recurrence {
            Recurrence::Once | Recurrence::NoRepeat | Recurrence::Trigger => return Ok(None),
            Recurrence::Daily { every } => add_days(local, u64::from(*every)),
            Recurrence::Weekly { every } => add_days(local, u64::from(*every) * DAYS_PER_WEEK),
            Recurrence::Monthly { every } => add_months(local, *every),
            Recurrence::Yearly { every } => years_later(local, *every),
            Recurrence::Interval { every, unit } => match unit {
                IntervalUnit::Hours => {
                    return reference
                        .checked_add_signed(Duration::hours(i64::from(*every)))
                        .map(Some)
                        .ok_or(RuleError::DateOutOfRange);
                }
                IntervalUnit::Days => add_days(local, u64::from(*every)),
                IntervalUnit::Weeks => add_days(local, u64::from(*every) * DAYS_PER_WEEK),
                IntervalUnit::Months => add_months(local, *every),
                IntervalUnit::Years => years_later(local, *every),
            },
            Recurrence::DaysOfTheWeek { days } => next_weekday_in(local, days),
            Recurrence::DayOfTheMonth { day, months } => next_day_of_month(local, *day, months),
            Recurrence::Adaptive => {
                if let Some(due) = self.adaptive_due_date(history)? {
                    return Ok(Some(due));
                }
                // Not enough history yet: behave like `daily` every 1.
                add_days(local, 1)
            }
        }
        .ok_or(RuleError::DateOutOfRange)?;

        let next_local = with_time_of_day(next_local, rule.time_of_day);
        local_to_utc(tz, next_local)
            .map(Some)
            .ok_or(RuleError::DateOutOfRange)
    }

    /// Last completion plus the mean gap between the most recent
    /// `adaptive_window` completions. `None` with fewer than two completions.
    fn adaptive_due_date(
        &self,
        history: &[ChoreHistory],
    ) -> Result<Option<DateTime<Utc>>, RuleError> {
        let completions = recent_completion_times(history, self.adaptive_window);
        let (Some(latest), Some(oldest)) = (completions.first(), completions.last()) else {
            return Ok(None);
        };
        if completions.len() < MIN_ADAPTIVE_WINDOW {
            return Ok(None);
        }

        let gaps = completions.len() as i64 - 1;
        let mean_seconds = latest.signed_duration_since(*oldest).num_seconds() / gaps;
        if mean_seconds <= 0 {
            return Ok(None);
        }
        latest
            .checked_add_signed(Duration::seconds(mean_seconds))
            .map(Some)
            .ok_or(RuleError::DateOutOfRange)
    }
}

/// Reference instant for the next step of `rule`.
pub fn reference_time(
    rule: &RecurrenceRule,
    previous_due: Option<DateTime<Utc>>,
    performed_at: DateTime<Utc>,
) -> DateTime<Utc> {
    if rule.is_rolling {
        performed_at
    } else {
        previous_due.unwrap_or(performed_at)
    }
}

fn years_later(local: NaiveDateTime, years: u32) -> Option<NaiveDateTime> {
    add_months(local, years.checked_mul(MONTHS_PER_YEAR)?)
}
