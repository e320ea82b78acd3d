//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the race data access contract.
//! - Isolate SQLite query details from the service layer.
//!
//! # Invariants
//! - Caller-supplied writes must enforce `NewRace::validate()` before
//!   persistence. Demo seeding in `seed.rs` is the one exception: it writes
//!   fixed rows that satisfy the same invariants by construction.
//! - Repository APIs return semantic errors (`NotFound`) in addition to
//!   storage errors.

pub mod race_repo;
mod seed;
