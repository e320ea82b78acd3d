//! Demonstration race data.
//!
//! Rows use fixed ids so repeated seeding of the same database is a no-op.

use chrono::{DateTime, Duration, DurationRound, Utc};
use rusqlite::{params, Connection};

use super::race_repo::format_timestamp;

const DEMO_RACE_COUNT: i64 = 100;

const DEMO_MEETINGS: i64 = 10;

const VENUE_NAMES: &[&str] = &[
    "Flemington",
    "Randwick",
    "Caulfield",
    "Eagle Farm",
    "Morphettville",
    "Ascot",
    "Rosehill",
    "Moonee Valley",
    "Doomben",
    "Ellerslie",
    "Sandown",
    "Warwick Farm",
];

/// Inserts the demo races inside one transaction.
///
/// Start times are spread from two days before `anchor` to two days after it.
/// Returns the number of rows actually inserted.
pub(crate) fn seed_demo_races(conn: &mut Connection, anchor: DateTime<Utc>) -> rusqlite::Result<usize> {
    let anchor = anchor
        .duration_trunc(Duration::hours(1))
        .unwrap_or(anchor);

    let tx = conn.transaction()?;
    let mut inserted = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO races (
                id,
                meeting_id,
                name,
                number,
                visible,
                advertised_start_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        )?;

        for id in 1..=DEMO_RACE_COUNT {
            let venue = VENUE_NAMES[(id as usize * 5) % VENUE_NAMES.len()];
            let offset_minutes = (id * 577) % (96 * 60) - 48 * 60;
            let start = anchor + Duration::minutes(offset_minutes);

            inserted += stmt.execute(params![
                id,
                (id - 1) % DEMO_MEETINGS + 1,
                format!("{venue} Race {}", (id * 7) % 12 + 1),
                (id * 7) % 12 + 1,
                id % 3 != 0,
                format_timestamp(start),
            ])?;
        }
    }
    tx.commit()?;

    Ok(inserted)
}
