//! Racing use-case service.
//!
//! # Responsibility
//! - Apply request-level sort defaults before calling the repository.
//! - Map `RepoError` kinds onto `StatusCode`s.
//!
//! # Invariants
//! - `NotFound` maps to `StatusCode::NotFound`; validation maps to
//!   `StatusCode::InvalidArgument`; everything else is `StatusCode::Internal`.
//! - The underlying error message is preserved for diagnostics.

use crate::model::race::{NewRace, Race, RaceId};
use crate::query::race_query::RaceListFilter;
use crate::repo::race_repo::{RaceRepository, RepoError, RepoErrorKind};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const DEFAULT_SORT_FIELD: &str = "advertised_start_time";

/// Transport status attached to a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    InvalidArgument,
    NotFound,
    Internal,
}

/// Failed service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub code: StatusCode,
    pub message: String,
}

impl ServiceError {
    fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn from_repo(context: &str, err: RepoError) -> Self {
        let code = match err.kind() {
            RepoErrorKind::Validation => StatusCode::InvalidArgument,
            RepoErrorKind::NotFound => StatusCode::NotFound,
            RepoErrorKind::Storage | RepoErrorKind::Timestamp => StatusCode::Internal,
        };
        Self::new(code, format!("{context}: {err}"))
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for ServiceError {}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Requested ordering as it arrives on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRequest {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub direction: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRacesRequest {
    #[serde(default)]
    pub filter: Option<RaceListFilter>,
    #[serde(default)]
    pub sort: Option<SortRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRacesResponse {
    pub races: Vec<Race>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRaceRequest {
    pub id: RaceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRaceResponse {
    pub race: Race,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRaceRequest {
    pub race: NewRace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRaceResponse {
    pub id: RaceId,
}

/// Use-case service wrapper for race operations.
pub struct RacingService<R: RaceRepository> {
    repo: R,
}

impl<R: RaceRepository> RacingService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Seeds the repository; call once before serving traffic.
    pub fn init(&self) -> ServiceResult<()> {
        self.repo
            .init()
            .map_err(|err| ServiceError::from_repo("failed to initialise races", err))
    }

    /// Lists races.
    ///
    /// # Contract
    /// - Missing sort selects `advertised_start_time ASC`.
    /// - Blank field selects `advertised_start_time`.
    /// - Direction is `DESC` only when it says so (any case), else `ASC`.
    pub fn list_races(&self, request: &ListRacesRequest) -> ServiceResult<ListRacesResponse> {
        let (field, direction) = resolve_sort(request.sort.as_ref());
        let races = self
            .repo
            .list_races(request.filter.as_ref(), field, direction)
            .map_err(|err| ServiceError::from_repo("failed to list races", err))?;
        Ok(ListRacesResponse { races })
    }

    /// Fetches one race by id.
    pub fn get_race(&self, request: &GetRaceRequest) -> ServiceResult<GetRaceResponse> {
        match self.repo.get_race_by_id(request.id) {
            Ok(race) => Ok(GetRaceResponse { race }),
            Err(RepoError::NotFound(id)) => Err(ServiceError::new(
                StatusCode::NotFound,
                format!("race {id} not found"),
            )),
            Err(err) => Err(ServiceError::from_repo("error fetching race", err)),
        }
    }

    /// Creates a race and returns its assigned id.
    pub fn create_race(&self, request: &CreateRaceRequest) -> ServiceResult<CreateRaceResponse> {
        let id = self
            .repo
            .create_race(&request.race)
            .map_err(|err| ServiceError::from_repo("failed to create race", err))?;
        Ok(CreateRaceResponse { id })
    }
}

fn resolve_sort(sort: Option<&SortRequest>) -> (&str, &'static str) {
    let Some(sort) = sort else {
        return (DEFAULT_SORT_FIELD, "ASC");
    };

    let field = if sort.field.is_empty() {
        DEFAULT_SORT_FIELD
    } else {
        sort.field.as_str()
    };
    let direction = if sort.direction.eq_ignore_ascii_case("desc") {
        "DESC"
    } else {
        "ASC"
    };
    (field, direction)
}

#[cfg(test)]
mod tests {
    use super::{resolve_sort, SortRequest};

    #[test]
    fn missing_sort_uses_start_time_ascending() {
        assert_eq!(resolve_sort(None), ("advertised_start_time", "ASC"));
    }

    #[test]
    fn blank_field_and_odd_direction_fall_back() {
        let sort = SortRequest {
            field: String::new(),
            direction: "sideways".to_string(),
        };
        assert_eq!(resolve_sort(Some(&sort)), ("advertised_start_time", "ASC"));
    }

    #[test]
    fn desc_is_case_insensitive() {
        let sort = SortRequest {
            field: "number".to_string(),
            direction: "Desc".to_string(),
        };
        assert_eq!(resolve_sort(Some(&sort)), ("number", "DESC"));
    }
}
