//! Race repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide list/get/create APIs over the `races` table.
//! - Map stored rows into `Race` records with read-time status.
//! - Seed demonstration data exactly once per repository.
//!
//! # Invariants
//! - List queries are built only through `query::race_query`.
//! - Stored timestamps that cannot be decoded are reported, never masked.
//! - Storage failures are returned to the caller without retry.

use crate::db::DbError;
use crate::model::race::{derive_status, NewRace, Race, RaceId, RaceValidationError};
use crate::query::race_query::{
    build_list_query, build_list_query_strict, QueryValidationError, RaceListFilter,
    RACE_SELECT_SQL,
};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use log::{debug, error, info};
use once_cell::sync::OnceCell;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use super::seed::seed_demo_races;

pub type RepoResult<T> = Result<T, RepoError>;

/// Coarse error category used by callers that map errors to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoErrorKind {
    Validation,
    NotFound,
    Storage,
    Timestamp,
}

/// Repository error for race persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Sort input rejected by strict list construction.
    InvalidQuery(QueryValidationError),
    /// Create payload failed field validation.
    InvalidRace(RaceValidationError),
    NotFound(RaceId),
    Storage(DbError),
    /// Stored `advertised_start_time` could not be decoded.
    Timestamp {
        race_id: RaceId,
        value: String,
        message: String,
    },
}

impl RepoError {
    pub fn kind(&self) -> RepoErrorKind {
        match self {
            Self::InvalidQuery(_) | Self::InvalidRace(_) => RepoErrorKind::Validation,
            Self::NotFound(_) => RepoErrorKind::NotFound,
            Self::Storage(_) => RepoErrorKind::Storage,
            Self::Timestamp { .. } => RepoErrorKind::Timestamp,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery(err) => write!(f, "{err}"),
            Self::InvalidRace(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "race not found: {id}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::Timestamp {
                race_id,
                value,
                message,
            } => write!(
                f,
                "invalid advertised_start_time `{value}` for race {race_id}: {message}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidQuery(err) => Some(err),
            Self::InvalidRace(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Storage(err) => Some(err),
            Self::Timestamp { .. } => None,
        }
    }
}

impl From<QueryValidationError> for RepoError {
    fn from(value: QueryValidationError) -> Self {
        Self::InvalidQuery(value)
    }
}

impl From<RaceValidationError> for RepoError {
    fn from(value: RaceValidationError) -> Self {
        Self::InvalidRace(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Storage(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(DbError::Sqlite(value))
    }
}

/// Repository interface for race operations.
pub trait RaceRepository {
    /// Seeds demonstration races once; later calls replay the first outcome.
    fn init(&self) -> RepoResult<()>;

    /// Lists races, defaulting unrecognized sort input.
    fn list_races(
        &self,
        filter: Option<&RaceListFilter>,
        sort_field: &str,
        sort_direction: &str,
    ) -> RepoResult<Vec<Race>>;

    /// Lists races, rejecting unrecognized non-blank sort input.
    fn list_races_strict(
        &self,
        filter: Option<&RaceListFilter>,
        sort_field: &str,
        sort_direction: &str,
    ) -> RepoResult<Vec<Race>>;

    fn get_race_by_id(&self, id: RaceId) -> RepoResult<Race>;

    /// Inserts a race and returns the storage-assigned id.
    fn create_race(&self, race: &NewRace) -> RepoResult<RaceId>;
}

impl<R: RaceRepository + ?Sized> RaceRepository for Arc<R> {
    fn init(&self) -> RepoResult<()> {
        (**self).init()
    }

    fn list_races(
        &self,
        filter: Option<&RaceListFilter>,
        sort_field: &str,
        sort_direction: &str,
    ) -> RepoResult<Vec<Race>> {
        (**self).list_races(filter, sort_field, sort_direction)
    }

    fn list_races_strict(
        &self,
        filter: Option<&RaceListFilter>,
        sort_field: &str,
        sort_direction: &str,
    ) -> RepoResult<Vec<Race>> {
        (**self).list_races_strict(filter, sort_field, sort_direction)
    }

    fn get_race_by_id(&self, id: RaceId) -> RepoResult<Race> {
        (**self).get_race_by_id(id)
    }

    fn create_race(&self, race: &NewRace) -> RepoResult<RaceId> {
        (**self).create_race(race)
    }
}

/// SQLite-backed race repository.
///
/// Owns its connection; statements from concurrent callers are serialized
/// on the connection lock.
pub struct SqliteRaceRepository {
    conn: Mutex<Connection>,
    seeded: OnceCell<Result<usize, String>>,
}

impl SqliteRaceRepository {
    /// Wraps a connection returned by `db::open_db*` (migrations applied).
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            seeded: OnceCell::new(),
        }
    }

    /// Returns whether `init` has run to completion, successfully or not.
    pub fn is_initialized(&self) -> bool {
        self.seeded.get().is_some()
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RepoError::Storage(DbError::ConnectionPoisoned))
    }

    fn seed(&self) -> RepoResult<usize> {
        let started_at = Instant::now();
        let mut conn = self.lock()?;
        match seed_demo_races(&mut conn, Utc::now()) {
            Ok(inserted) => {
                info!(
                    "event=race_seed module=repo status=ok inserted={} duration_ms={}",
                    inserted,
                    started_at.elapsed().as_millis()
                );
                Ok(inserted)
            }
            Err(err) => {
                error!(
                    "event=race_seed module=repo status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }

    fn query_races(&self, sql: &str, params: Vec<Value>) -> RepoResult<Vec<Race>> {
        let started_at = Instant::now();
        let result = self.lock().and_then(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let mut rows = stmt.query(params_from_iter(params))?;
            let now = Utc::now();
            let mut races = Vec::new();

            while let Some(row) = rows.next()? {
                races.push(parse_race_row(row, now)?);
            }

            Ok(races)
        });

        match &result {
            Ok(races) => debug!(
                "event=race_list module=repo status=ok count={} duration_ms={}",
                races.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=race_list module=repo status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}

impl RaceRepository for SqliteRaceRepository {
    fn init(&self) -> RepoResult<()> {
        let mut first_error = None;
        let outcome = self.seeded.get_or_init(|| match self.seed() {
            Ok(inserted) => Ok(inserted),
            Err(err) => {
                let message = err.to_string();
                first_error = Some(err);
                Err(message)
            }
        });

        if let Some(err) = first_error {
            return Err(err);
        }

        match outcome {
            Ok(_) => Ok(()),
            Err(message) => Err(RepoError::Storage(DbError::SeedFailed(message.clone()))),
        }
    }

    fn list_races(
        &self,
        filter: Option<&RaceListFilter>,
        sort_field: &str,
        sort_direction: &str,
    ) -> RepoResult<Vec<Race>> {
        let (sql, params) = build_list_query(filter, sort_field, sort_direction);
        self.query_races(&sql, params)
    }

    fn list_races_strict(
        &self,
        filter: Option<&RaceListFilter>,
        sort_field: &str,
        sort_direction: &str,
    ) -> RepoResult<Vec<Race>> {
        let (sql, params) = build_list_query_strict(filter, sort_field, sort_direction)?;
        self.query_races(&sql, params)
    }

    fn get_race_by_id(&self, id: RaceId) -> RepoResult<Race> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{RACE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;

        if let Some(row) = rows.next()? {
            return parse_race_row(row, Utc::now());
        }

        debug!("event=race_get module=repo status=not_found race_id={id}");
        Err(RepoError::NotFound(id))
    }

    fn create_race(&self, race: &NewRace) -> RepoResult<RaceId> {
        race.validate()?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO races (
                meeting_id,
                name,
                number,
                visible,
                advertised_start_time
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                race.meeting_id,
                race.name.as_str(),
                race.number,
                race.visible,
                format_timestamp(race.advertised_start_time),
            ],
        )?;

        let id = conn.last_insert_rowid();
        info!("event=race_create module=repo status=ok race_id={id}");
        Ok(id)
    }
}

/// Storage text form of a start time: RFC 3339, UTC, nanoseconds.
///
/// Fixed width for years 0000 through 9999, which `NewRace::validate`
/// enforces, so lexical order equals chronological order.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Decodes a stored start time.
///
/// Accepts RFC 3339 text, `YYYY-MM-DD HH:MM:SS[.f][±HH:MM]` text (UTC when no
/// offset is given) and integer unix seconds.
pub fn parse_timestamp(value: ValueRef<'_>) -> Result<DateTime<Utc>, String> {
    match value {
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|err| err.to_string())?;
            parse_timestamp_text(text.trim())
        }
        ValueRef::Integer(seconds) => DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| "unix seconds out of range".to_string()),
        ValueRef::Null => Err("value is NULL".to_string()),
        ValueRef::Real(_) | ValueRef::Blob(_) => Err("unsupported storage type".to_string()),
    }
}

fn parse_timestamp_text(text: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|err| err.to_string())
}

fn parse_race_row(row: &Row<'_>, now: DateTime<Utc>) -> RepoResult<Race> {
    let id: RaceId = row.get("id")?;
    let raw_start = row.get_ref("advertised_start_time")?;
    let advertised_start_time =
        parse_timestamp(raw_start).map_err(|message| RepoError::Timestamp {
            race_id: id,
            value: describe_value(raw_start),
            message,
        })?;

    Ok(Race {
        id,
        meeting_id: row.get("meeting_id")?,
        name: row.get("name")?,
        number: row.get("number")?,
        visible: row.get("visible")?,
        advertised_start_time,
        status: derive_status(advertised_start_time, now),
    })
}

fn describe_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(number) => number.to_string(),
        ValueRef::Real(number) => number.to_string(),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Blob(bytes) => format!("<blob {} bytes>", bytes.len()),
    }
}
