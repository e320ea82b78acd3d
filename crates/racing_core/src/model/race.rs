//! Race domain model.
//!
//! # Responsibility
//! - Define the race record and its create payload.
//! - Derive lifecycle status from the advertised start time.
//!
//! # Invariants
//! - `id` is assigned by storage and never supplied by callers.
//! - `status` is `Open` only while `advertised_start_time` is strictly in the future.
//! - `name` is non-empty.
//! - `advertised_start_time` falls in years 0000 through 9999.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-assigned race identifier.
pub type RaceId = i64;

/// Lifecycle state derived at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RaceStatus {
    /// Advertised start is still ahead.
    Open,
    /// Advertised start has been reached or passed.
    Closed,
}

impl RaceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }
}

impl Display for RaceStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives race status for the instant `now`.
///
/// The boundary is exclusive on the open side: a race starting exactly at
/// `now` is already closed.
pub fn derive_status(advertised_start_time: DateTime<Utc>, now: DateTime<Utc>) -> RaceStatus {
    if advertised_start_time > now {
        RaceStatus::Open
    } else {
        RaceStatus::Closed
    }
}

/// Race record as returned by list and point lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Race {
    pub id: RaceId,
    /// Opaque owning meeting identifier.
    pub meeting_id: i64,
    pub name: String,
    /// Position within the meeting.
    pub number: i64,
    pub visible: bool,
    pub advertised_start_time: DateTime<Utc>,
    /// Computed from `advertised_start_time` when the row was read.
    pub status: RaceStatus,
}

/// Storage keeps start times as four-digit-year text.
const MIN_START_YEAR: i32 = 0;
const MAX_START_YEAR: i32 = 9999;

/// Create payload for a race.
///
/// Carries neither `id` nor `status`: the first is assigned by storage and
/// the second is derived on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRace {
    pub meeting_id: i64,
    pub name: String,
    pub number: i64,
    pub visible: bool,
    pub advertised_start_time: DateTime<Utc>,
}

impl NewRace {
    /// Creates a visible race payload.
    pub fn new(
        meeting_id: i64,
        name: impl Into<String>,
        number: i64,
        advertised_start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            meeting_id,
            name: name.into(),
            number,
            visible: true,
            advertised_start_time,
        }
    }

    /// Returns a copy with the given visibility.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Validates field-level invariants before persistence.
    pub fn validate(&self) -> Result<(), RaceValidationError> {
        if self.name.trim().is_empty() {
            return Err(RaceValidationError::EmptyName);
        }
        let year = self.advertised_start_time.year();
        if !(MIN_START_YEAR..=MAX_START_YEAR).contains(&year) {
            return Err(RaceValidationError::StartYearOutOfRange(year));
        }
        Ok(())
    }
}

/// Field-level validation failure for [`NewRace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceValidationError {
    EmptyName,
    StartYearOutOfRange(i32),
}

impl Display for RaceValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "race name must not be empty"),
            Self::StartYearOutOfRange(year) => write!(
                f,
                "advertised start year {year} is outside {MIN_START_YEAR}..={MAX_START_YEAR}"
            ),
        }
    }
}

impl Error for RaceValidationError {}

#[cfg(test)]
mod tests {
    use super::{derive_status, NewRace, RaceStatus, RaceValidationError};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn status_is_open_only_strictly_before_start() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();

        assert_eq!(
            derive_status(start, start - Duration::seconds(1)),
            RaceStatus::Open
        );
        assert_eq!(derive_status(start, start), RaceStatus::Closed);
        assert_eq!(
            derive_status(start, start + Duration::seconds(1)),
            RaceStatus::Closed
        );
    }

    #[test]
    fn blank_name_is_rejected() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        let race = NewRace::new(1, "   ", 1, start);
        assert_eq!(race.validate(), Err(RaceValidationError::EmptyName));
    }

    #[test]
    fn start_year_must_fit_four_digits() {
        let far_future = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            NewRace::new(1, "Far", 1, far_future).validate(),
            Err(RaceValidationError::StartYearOutOfRange(10000))
        );

        let before_year_zero = Utc.with_ymd_and_hms(-1, 12, 31, 23, 0, 0).unwrap();
        assert_eq!(
            NewRace::new(1, "Ancient", 1, before_year_zero).validate(),
            Err(RaceValidationError::StartYearOutOfRange(-1))
        );

        let last_valid = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(NewRace::new(1, "Edge", 1, last_valid).validate(), Ok(()));
    }

    #[test]
    fn status_serializes_in_upper_case() {
        assert_eq!(
            serde_json::to_string(&RaceStatus::Closed).unwrap(),
            "\"CLOSED\""
        );
    }
}
