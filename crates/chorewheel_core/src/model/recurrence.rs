//! Recurrence rule model.
//!
//! # Responsibility
//! - Define the typed recurrence rule embedded in every chore.
//! - Convert between the persisted wire shape (`frequencyType` + `frequency`
//!   + `frequencyMetadata`) and the typed shape.
//! - Migrate legacy v1 frequency metadata into the current structure.
//!
//! # Invariants
//! - A rule decoded from the wire shape has already passed `validate()`.
//! - `Once` and `NoRepeat` are terminal: nothing is due after the first
//!   completion.
//! - Weekday and month sets are stored sorted and de-duplicated.

use chrono::{DateTime, NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Latest frequency metadata layout understood by this crate.
pub const CURRENT_METADATA_VERSION: u32 = 2;

const MAX_DAY_OF_MONTH: i64 = 31;

/// Persisted recurrence kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrequencyType {
    Once,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Adaptive,
    Interval,
    DaysOfTheWeek,
    DayOfTheMonth,
    Trigger,
    NoRepeat,
}

impl FrequencyType {
    /// Stable string id used in persisted rows.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Adaptive => "adaptive",
            Self::Interval => "interval",
            Self::DaysOfTheWeek => "days_of_the_week",
            Self::DayOfTheMonth => "day_of_the_month",
            Self::Trigger => "trigger",
            Self::NoRepeat => "no_repeat",
        }
    }

    /// Parses a persisted frequency type string.
    pub fn parse(value: &str) -> Result<Self, RuleError> {
        match value.trim() {
            "once" => Ok(Self::Once),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "adaptive" => Ok(Self::Adaptive),
            "interval" => Ok(Self::Interval),
            "days_of_the_week" => Ok(Self::DaysOfTheWeek),
            "day_of_the_month" => Ok(Self::DayOfTheMonth),
            "trigger" => Ok(Self::Trigger),
            "no_repeat" => Ok(Self::NoRepeat),
            other => Err(RuleError::UnknownFrequencyType(other.to_string())),
        }
    }
}

impl Display for FrequencyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time unit for `interval` rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalUnit {
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl IntervalUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hours => "hours",
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
            Self::Years => "years",
        }
    }

    pub fn parse(value: &str) -> Result<Self, RuleError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hour" | "hours" => Ok(Self::Hours),
            "day" | "days" => Ok(Self::Days),
            "week" | "weeks" => Ok(Self::Weeks),
            "month" | "months" => Ok(Self::Months),
            "year" | "years" => Ok(Self::Years),
            _ => Err(RuleError::UnknownIntervalUnit(value.to_string())),
        }
    }
}

/// How a chore repeats, with the data each kind needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    /// One-off chore; terminal after first completion.
    Once,
    /// Never repeats; terminal after first completion.
    NoRepeat,
    /// Scheduled by an external event, never by the calendar.
    Trigger,
    Daily { every: u32 },
    Weekly { every: u32 },
    /// Day-of-month is clamped to the target month's last day.
    Monthly { every: u32 },
    /// Feb 29 clamps to Feb 28 in non-leap years.
    Yearly { every: u32 },
    Interval { every: u32, unit: IntervalUnit },
    /// Next date whose weekday is listed. Never empty once validated.
    DaysOfTheWeek { days: Vec<Weekday> },
    /// Configured day of month (1..=31) in the listed months (1..=12).
    /// An empty month list means every month.
    DayOfTheMonth { day: u32, months: Vec<u32> },
    /// Cadence derived from the observed completion history.
    Adaptive,
}

impl Recurrence {
    pub fn frequency_type(&self) -> FrequencyType {
        match self {
            Self::Once => FrequencyType::Once,
            Self::NoRepeat => FrequencyType::NoRepeat,
            Self::Trigger => FrequencyType::Trigger,
            Self::Daily { .. } => FrequencyType::Daily,
            Self::Weekly { .. } => FrequencyType::Weekly,
            Self::Monthly { .. } => FrequencyType::Monthly,
            Self::Yearly { .. } => FrequencyType::Yearly,
            Self::Interval { .. } => FrequencyType::Interval,
            Self::DaysOfTheWeek { .. } => FrequencyType::DaysOfTheWeek,
            Self::DayOfTheMonth { .. } => FrequencyType::DayOfTheMonth,
            Self::Adaptive => FrequencyType::Adaptive,
        }
    }

    /// Returns whether the chore is done for good after one completion.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Once | Self::NoRepeat)
    }
}

/// Immutable description of how a chore repeats.
///
/// Serialized through [`FrequencySpec`], so decoding always validates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FrequencySpec", into = "FrequencySpec")]
pub struct RecurrenceRule {
    pub recurrence: Recurrence,
    /// `true`: next due is computed from the completion time.
    /// `false`: next due is computed from the previous due date.
    pub is_rolling: bool,
    /// Wall-clock time applied to day-granular due dates.
    pub time_of_day: Option<NaiveTime>,
    /// Zone for calendar arithmetic; the engine default applies when unset.
    pub timezone: Option<Tz>,
}

impl RecurrenceRule {
    /// Creates a fixed-cadence rule with no time-of-day or zone override.
    pub fn new(recurrence: Recurrence) -> Self {
        Self {
            recurrence,
            is_rolling: false,
            time_of_day: None,
            timezone: None,
        }
    }

    pub fn rolling(mut self, is_rolling: bool) -> Self {
        self.is_rolling = is_rolling;
        self
    }

    pub fn at_time(mut self, time_of_day: NaiveTime) -> Self {
        self.time_of_day = Some(time_of_day);
        self
    }

    pub fn in_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = Some(timezone);
        self
    }

    pub fn frequency_type(&self) -> FrequencyType {
        self.recurrence.frequency_type()
    }

    pub fn is_terminal(&self) -> bool {
        self.recurrence.is_terminal()
    }

    /// Validates variant parameters.
    ///
    /// Rules built in code bypass wire decoding, so the calculator re-checks
    /// them through this method before doing any arithmetic.
    pub fn validate(&self) -> Result<(), RuleError> {
        let frequency_type = self.frequency_type();
        match &self.recurrence {
            Recurrence::Daily { every }
            | Recurrence::Weekly { every }
            | Recurrence::Monthly { every }
            | Recurrence::Yearly { every }
            | Recurrence::Interval { every, .. } => {
                if *every == 0 {
                    return Err(RuleError::InvalidFrequency {
                        frequency_type,
                        value: 0,
                    });
                }
            }
            Recurrence::DaysOfTheWeek { days } => {
                if days.is_empty() {
                    return Err(RuleError::MissingMetadata {
                        frequency_type,
                        field: "days",
                    });
                }
            }
            Recurrence::DayOfTheMonth { day, months } => {
                if *day == 0 || i64::from(*day) > MAX_DAY_OF_MONTH {
                    return Err(RuleError::InvalidDayOfMonth(i64::from(*day)));
                }
                if let Some(month) = months.iter().find(|m| !(1..=12).contains(*m)) {
                    return Err(RuleError::UnknownMonth(month.to_string()));
                }
            }
            Recurrence::Once
            | Recurrence::NoRepeat
            | Recurrence::Trigger
            | Recurrence::Adaptive => {}
        }
        Ok(())
    }
}

/// Wire shape of a recurrence rule as stored next to a chore row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencySpec {
    pub frequency_type: String,
    #[serde(default)]
    pub frequency: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_metadata: Option<FrequencyMetadata>,
    #[serde(default)]
    pub is_rolling: bool,
}

/// Versioned structured metadata for the wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyMetadata {
    #[serde(default = "current_metadata_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub months: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl Default for FrequencyMetadata {
    fn default() -> Self {
        Self {
            version: CURRENT_METADATA_VERSION,
            days: Vec::new(),
            months: Vec::new(),
            unit: None,
            time: None,
            timezone: None,
        }
    }
}

fn current_metadata_version() -> u32 {
    CURRENT_METADATA_VERSION
}

/// v1 layout: a JSON document stored in a text column, with nullable list
/// entries and an empty string meaning "no time".
#[derive(Debug, Default, Deserialize)]
struct LegacyFrequencyMetadata {
    #[serde(default)]
    days: Vec<Option<String>>,
    #[serde(default)]
    months: Vec<Option<String>>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
}

impl From<LegacyFrequencyMetadata> for FrequencyMetadata {
    fn from(value: LegacyFrequencyMetadata) -> Self {
        Self {
            version: CURRENT_METADATA_VERSION,
            days: value.days.into_iter().flatten().collect(),
            months: value.months.into_iter().flatten().collect(),
            unit: non_blank(value.unit),
            time: non_blank(value.time),
            timezone: non_blank(value.timezone),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolves the metadata to use for a stored chore.
///
/// The structured column wins when present. Otherwise the legacy JSON text
/// column is decoded and lifted to the current version.
///
/// # Errors
/// - `UnsupportedMetadataVersion` when the structured column is newer than
///   this crate understands.
/// - `MalformedLegacyMetadata` when the legacy text is not valid JSON.
pub fn migrate_frequency_metadata(
    legacy: Option<&str>,
    current: Option<FrequencyMetadata>,
) -> Result<Option<FrequencyMetadata>, RuleError> {
    if let Some(current) = current {
        ensure_supported_version(current.version)?;
        return Ok(Some(current));
    }

    let Some(legacy) = legacy.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let decoded: LegacyFrequencyMetadata = serde_json::from_str(legacy)
        .map_err(|err| RuleError::MalformedLegacyMetadata(err.to_string()))?;
    Ok(Some(decoded.into()))
}

fn ensure_supported_version(version: u32) -> Result<(), RuleError> {
    if version > CURRENT_METADATA_VERSION {
        return Err(RuleError::UnsupportedMetadataVersion {
            found: version,
            latest: CURRENT_METADATA_VERSION,
        });
    }
    Ok(())
}

impl TryFrom<FrequencySpec> for RecurrenceRule {
    type Error = RuleError;

    fn try_from(wire: FrequencySpec) -> Result<Self, Self::Error> {
        let frequency_type = FrequencyType::parse(wire.frequency_type.as_str())?;
        let metadata = wire.frequency_metadata.unwrap_or_default();
        ensure_supported_version(metadata.version)?;

        let recurrence = match frequency_type {
            FrequencyType::Once => Recurrence::Once,
            FrequencyType::NoRepeat => Recurrence::NoRepeat,
            FrequencyType::Trigger => Recurrence::Trigger,
            FrequencyType::Adaptive => Recurrence::Adaptive,
            FrequencyType::Daily => Recurrence::Daily {
                every: positive_frequency(frequency_type, wire.frequency)?,
            },
            FrequencyType::Weekly => Recurrence::Weekly {
                every: positive_frequency(frequency_type, wire.frequency)?,
            },
            FrequencyType::Monthly => Recurrence::Monthly {
                every: positive_frequency(frequency_type, wire.frequency)?,
            },
            FrequencyType::Yearly => Recurrence::Yearly {
                every: positive_frequency(frequency_type, wire.frequency)?,
            },
            FrequencyType::Interval => {
                let unit = metadata.unit.as_deref().ok_or(RuleError::MissingMetadata {
                    frequency_type,
                    field: "unit",
                })?;
                Recurrence::Interval {
                    every: positive_frequency(frequency_type, wire.frequency)?,
                    unit: IntervalUnit::parse(unit)?,
                }
            }
            FrequencyType::DaysOfTheWeek => Recurrence::DaysOfTheWeek {
                days: parse_weekdays(&metadata.days)?,
            },
            FrequencyType::DayOfTheMonth => {
                if !(1..=MAX_DAY_OF_MONTH).contains(&wire.frequency) {
                    return Err(RuleError::InvalidDayOfMonth(wire.frequency));
                }
                Recurrence::DayOfTheMonth {
                    day: wire.frequency as u32,
                    months: parse_months(&metadata.months)?,
                }
            }
        };

        let rule = Self {
            recurrence,
            is_rolling: wire.is_rolling,
            time_of_day: metadata
                .time
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(parse_time_of_day)
                .transpose()?,
            timezone: metadata
                .timezone
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(parse_timezone)
                .transpose()?,
        };
        rule.validate()?;
        Ok(rule)
    }
}

impl From<RecurrenceRule> for FrequencySpec {
    fn from(rule: RecurrenceRule) -> Self {
        let mut metadata = FrequencyMetadata {
            time: rule
                .time_of_day
                .map(|time| time.format("%H:%M:%S%.f").to_string()),
            timezone: rule.timezone.map(|tz| tz.name().to_string()),
            ..FrequencyMetadata::default()
        };

        let frequency = match &rule.recurrence {
            Recurrence::Once
            | Recurrence::NoRepeat
            | Recurrence::Trigger
            | Recurrence::Adaptive => 0,
            Recurrence::Daily { every }
            | Recurrence::Weekly { every }
            | Recurrence::Monthly { every }
            | Recurrence::Yearly { every } => i64::from(*every),
            Recurrence::Interval { every, unit } => {
                metadata.unit = Some(unit.as_str().to_string());
                i64::from(*every)
            }
            Recurrence::DaysOfTheWeek { days } => {
                metadata.days = days.iter().map(|d| weekday_name(*d).to_string()).collect();
                0
            }
            Recurrence::DayOfTheMonth { day, months } => {
                metadata.months = months
                    .iter()
                    .filter_map(|m| month_name(*m))
                    .map(str::to_string)
                    .collect();
                i64::from(*day)
            }
        };

        let has_metadata = metadata != FrequencyMetadata::default();
        Self {
            frequency_type: rule.frequency_type().as_str().to_string(),
            frequency,
            frequency_metadata: has_metadata.then_some(metadata),
            is_rolling: rule.is_rolling,
        }
    }
}

fn positive_frequency(frequency_type: FrequencyType, value: i64) -> Result<u32, RuleError> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or(RuleError::InvalidFrequency {
            frequency_type,
            value,
        })
}

/// Parses weekday names (`monday`, `mon`, case-insensitive).
pub fn parse_weekdays(values: &[String]) -> Result<Vec<Weekday>, RuleError> {
    let mut days = values
        .iter()
        .map(|value| parse_weekday(value))
        .collect::<Result<Vec<_>, _>>()?;
    days.sort_by_key(|d| d.num_days_from_monday());
    days.dedup();
    if days.is_empty() {
        return Err(RuleError::MissingMetadata {
            frequency_type: FrequencyType::DaysOfTheWeek,
            field: "days",
        });
    }
    Ok(days)
}

fn parse_weekday(value: &str) -> Result<Weekday, RuleError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "monday" | "mon" => Ok(Weekday::Mon),
        "tuesday" | "tue" => Ok(Weekday::Tue),
        "wednesday" | "wed" => Ok(Weekday::Wed),
        "thursday" | "thu" => Ok(Weekday::Thu),
        "friday" | "fri" => Ok(Weekday::Fri),
        "saturday" | "sat" => Ok(Weekday::Sat),
        "sunday" | "sun" => Ok(Weekday::Sun),
        _ => Err(RuleError::UnknownWeekday(value.to_string())),
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Parses month names into month numbers (1..=12). Accepts full names and
/// three-letter abbreviations, case-insensitive.
pub fn parse_months(values: &[String]) -> Result<Vec<u32>, RuleError> {
    let mut months = Vec::with_capacity(values.len());
    for value in values {
        let normalized = value.trim().to_ascii_lowercase();
        let position = MONTH_NAMES
            .iter()
            .position(|name| {
                *name == normalized || (normalized.len() == 3 && name.starts_with(&normalized))
            })
            .ok_or_else(|| RuleError::UnknownMonth(value.clone()))?;
        months.push(position as u32 + 1);
    }
    months.sort_unstable();
    months.dedup();
    Ok(months)
}

fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month.checked_sub(1)? as usize).copied()
}

/// Parses `HH:MM`, `HH:MM:SS` (with optional fraction), or an RFC 3339
/// timestamp (its local wall-clock time is used).
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, RuleError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f"))
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed).map(|dt| dt.time()))
        .map_err(|_| RuleError::InvalidTimeOfDay(value.to_string()))
}

/// Parses an IANA zone name such as `Europe/Berlin`.
pub fn parse_timezone(value: &str) -> Result<Tz, RuleError> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|_| RuleError::UnknownTimezone(value.to_string()))
}

/// Malformed or incomplete recurrence configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    UnknownFrequencyType(String),
    InvalidFrequency {
        frequency_type: FrequencyType,
        value: i64,
    },
    InvalidDayOfMonth(i64),
    MissingMetadata {
        frequency_type: FrequencyType,
        field: &'static str,
    },
    UnknownWeekday(String),
    UnknownMonth(String),
    UnknownIntervalUnit(String),
    InvalidTimeOfDay(String),
    UnknownTimezone(String),
    UnsupportedMetadataVersion {
        found: u32,
        latest: u32,
    },
    MalformedLegacyMetadata(String),
    /// Only `trigger` chores can be scheduled by an external event.
    NotTriggerBased(FrequencyType),
    /// Calendar arithmetic left the representable date range.
    DateOutOfRange,
}

impl Display for RuleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownFrequencyType(value) => write!(f, "unknown frequency type: {value}"),
            Self::InvalidFrequency {
                frequency_type,
                value,
            } => write!(f, "{frequency_type} frequency must be >= 1, got {value}"),
            Self::InvalidDayOfMonth(value) => {
                write!(f, "day of month must be within 1..=31, got {value}")
            }
            Self::MissingMetadata {
                frequency_type,
                field,
            } => write!(f, "{frequency_type} rule requires metadata `{field}`"),
            Self::UnknownWeekday(value) => write!(f, "unknown weekday: {value}"),
            Self::UnknownMonth(value) => write!(f, "unknown month: {value}"),
            Self::UnknownIntervalUnit(value) => write!(f, "unknown interval unit: {value}"),
            Self::InvalidTimeOfDay(value) => write!(f, "invalid time of day: {value}"),
            Self::UnknownTimezone(value) => write!(f, "unknown timezone: {value}"),
            Self::UnsupportedMetadataVersion { found, latest } => write!(
                f,
                "frequency metadata version {found} is newer than supported {latest}"
            ),
            Self::MalformedLegacyMetadata(message) => {
                write!(f, "legacy frequency metadata is not valid JSON: {message}")
            }
            Self::NotTriggerBased(frequency_type) => {
                write!(f, "{frequency_type} chores cannot be scheduled by trigger")
            }
            Self::DateOutOfRange => write!(f, "computed due date is out of range"),
        }
    }
}

impl Error for RuleError {}
