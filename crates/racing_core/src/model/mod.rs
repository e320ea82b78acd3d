//! Domain model for race records.
//!
//! # Responsibility
//! - Define canonical data structures returned by the repository.
//! - Own the read-time status derivation rule.
//!
//! # Invariants
//! - Every race is identified by a storage-assigned `RaceId`.
//! - `RaceStatus` is derived on read and never persisted.

pub mod race;
