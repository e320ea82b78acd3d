//! Race repository core.
//!
//! Stores race records in SQLite, builds filtered and sorted list queries,
//! and derives each race's open/closed status at read time.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use config::{DatabaseConfig, LoggingConfig, RacingConfig, SeedConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::race::{derive_status, NewRace, Race, RaceId, RaceStatus, RaceValidationError};
pub use query::race_query::{
    build_list_query, build_list_query_strict, QueryValidationError, RaceListFilter,
    RaceListQuery, RaceSort, SortDirection, SortField,
};
pub use repo::race_repo::{
    RaceRepository, RepoError, RepoErrorKind, RepoResult, SqliteRaceRepository,
};
pub use service::racing_service::{
    CreateRaceRequest, CreateRaceResponse, GetRaceRequest, GetRaceResponse, ListRacesRequest,
    ListRacesResponse, RacingService, ServiceError, ServiceResult, SortRequest, StatusCode,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
