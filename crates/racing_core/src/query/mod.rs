//! SQL query construction for race listing.
//!
//! # Responsibility
//! - Translate filter and sort requests into parameterized SQL.
//! - Keep allow-list validation of sort input in one place.
//!
//! # Invariants
//! - Caller-supplied values reach SQL only as bound parameters.
//! - Only allow-listed column names and `ASC`/`DESC` are written into SQL text.

pub mod race_query;
