//! Race list query builder.
//!
//! # Responsibility
//! - Build `(sql, params)` for race listing from an optional filter and a sort.
//! - Offer a tolerant mode (silent defaults) and a strict mode (errors).
//!
//! # Invariants
//! - Every rendered query ends with exactly one `ORDER BY` clause.
//! - Start-time ordering is chronological whatever the stored encoding.
//! - `params` order matches placeholder order left to right.
//! - The builder performs no I/O.

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Column list shared by every race read path.
pub const RACE_SELECT_SQL: &str = "SELECT
    id,
    meeting_id,
    name,
    number,
    visible,
    advertised_start_time
FROM races";

/// Restriction criteria for listing races.
///
/// The default value restricts nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceListFilter {
    /// When non-empty, only races from these meetings are returned.
    #[serde(default)]
    pub meeting_ids: Vec<i64>,
    /// When true, only visible races are returned.
    #[serde(default)]
    pub only_visible: bool,
}

/// Sortable race column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortField {
    #[default]
    AdvertisedStartTime,
    Name,
    Number,
}

impl SortField {
    /// Parses an allow-listed field name, ignoring case and surrounding space.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "advertised_start_time" => Some(Self::AdvertisedStartTime),
            "name" => Some(Self::Name),
            "number" => Some(Self::Number),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::AdvertisedStartTime => "advertised_start_time",
            Self::Name => "name",
            Self::Number => "number",
        }
    }

    /// `ORDER BY` terms for this field in `direction`.
    ///
    /// Start times are compared as instants, not as stored text, so rows in
    /// different timestamp encodings still order chronologically. The raw
    /// column breaks ties below SQLite's millisecond date resolution.
    pub fn order_terms(self, direction: SortDirection) -> String {
        let keyword = direction.keyword();
        match self {
            Self::AdvertisedStartTime => {
                format!("{START_TIME_INSTANT_SQL} {keyword}, advertised_start_time {keyword}")
            }
            Self::Name | Self::Number => format!("{} {keyword}", self.column()),
        }
    }
}

/// Start time as a julian day, for integer unix seconds and text encodings.
const START_TIME_INSTANT_SQL: &str = "CASE typeof(advertised_start_time) \
WHEN 'integer' THEN julianday(advertised_start_time, 'unixepoch') \
ELSE julianday(advertised_start_time) END";

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Parses `asc`/`desc` in any case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Ascending),
            "desc" => Some(Self::Descending),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Validated sort specification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RaceSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl RaceSort {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Builds a sort, substituting defaults for anything unrecognized.
    pub fn tolerant(field: &str, direction: &str) -> Self {
        Self {
            field: SortField::parse(field).unwrap_or_default(),
            direction: SortDirection::parse(direction).unwrap_or_default(),
        }
    }

    /// Builds a sort, rejecting values outside the allow-lists.
    ///
    /// Blank values still select the defaults.
    pub fn strict(field: &str, direction: &str) -> Result<Self, QueryValidationError> {
        let field = if field.trim().is_empty() {
            SortField::default()
        } else {
            SortField::parse(field)
                .ok_or_else(|| QueryValidationError::InvalidSortField(field.to_string()))?
        };
        let direction = if direction.trim().is_empty() {
            SortDirection::default()
        } else {
            SortDirection::parse(direction)
                .ok_or_else(|| QueryValidationError::InvalidSortDirection(direction.to_string()))?
        };
        Ok(Self { field, direction })
    }
}

/// Sort input rejected by strict construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValidationError {
    InvalidSortField(String),
    InvalidSortDirection(String),
}

impl Display for QueryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSortField(value) => write!(
                f,
                "invalid sort field `{value}`; expected advertised_start_time|name|number"
            ),
            Self::InvalidSortDirection(value) => {
                write!(f, "invalid sort direction `{value}`; expected asc|desc")
            }
        }
    }
}

impl Error for QueryValidationError {}

/// Intermediate form of a race list query.
///
/// Predicates and parameters are accumulated together so placeholder order
/// always matches parameter order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaceListQuery {
    predicates: Vec<String>,
    params: Vec<Value>,
    sort: RaceSort,
}

impl RaceListQuery {
    /// Creates a query over all races with the given sort.
    pub fn new(sort: RaceSort) -> Self {
        Self {
            predicates: Vec::new(),
            params: Vec::new(),
            sort,
        }
    }

    /// Adds the predicates implied by `filter`.
    pub fn filter(mut self, filter: Option<&RaceListFilter>) -> Self {
        let Some(filter) = filter else {
            return self;
        };

        if !filter.meeting_ids.is_empty() {
            let placeholders = vec!["?"; filter.meeting_ids.len()].join(", ");
            self.predicates.push(format!("meeting_id IN ({placeholders})"));
            self.params
                .extend(filter.meeting_ids.iter().copied().map(Value::Integer));
        }

        if filter.only_visible {
            self.predicates.push("visible = TRUE".to_string());
        }

        self
    }

    /// Renders SQL text for the accumulated query.
    pub fn to_sql(&self) -> String {
        let mut sql = String::from(RACE_SELECT_SQL);
        if !self.predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.predicates.join(" AND "));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&self.sort.field.order_terms(self.sort.direction));
        sql
    }

    /// Consumes the query into SQL text and bound parameters.
    pub fn into_parts(self) -> (String, Vec<Value>) {
        let sql = self.to_sql();
        (sql, self.params)
    }
}

/// Builds a list query, defaulting unrecognized sort input.
pub fn build_list_query(
    filter: Option<&RaceListFilter>,
    sort_field: &str,
    sort_direction: &str,
) -> (String, Vec<Value>) {
    RaceListQuery::new(RaceSort::tolerant(sort_field, sort_direction))
        .filter(filter)
        .into_parts()
}

/// Builds a list query, rejecting unrecognized non-blank sort input.
pub fn build_list_query_strict(
    filter: Option<&RaceListFilter>,
    sort_field: &str,
    sort_direction: &str,
) -> Result<(String, Vec<Value>), QueryValidationError> {
    let sort = RaceSort::strict(sort_field, sort_direction)?;
    Ok(RaceListQuery::new(sort).filter(filter).into_parts())
}

#[cfg(test)]
mod tests {
    use super::{
        build_list_query, build_list_query_strict, QueryValidationError, RaceListFilter,
        RaceSort, SortDirection, SortField, RACE_SELECT_SQL, START_TIME_INSTANT_SQL,
    };
    use rusqlite::types::Value;

    #[test]
    fn no_filter_still_orders_by_start_time() {
        let (sql, params) = build_list_query(None, "", "");
        assert_eq!(
            sql,
            format!(
                "{RACE_SELECT_SQL} ORDER BY {START_TIME_INSTANT_SQL} ASC, advertised_start_time ASC"
            )
        );
        assert!(params.is_empty());
    }

    #[test]
    fn meeting_ids_become_one_placeholder_each_in_input_order() {
        let filter = RaceListFilter {
            meeting_ids: vec![5, 2, 9],
            only_visible: false,
        };
        let (sql, params) = build_list_query(Some(&filter), "number", "desc");

        assert!(sql.ends_with(" WHERE meeting_id IN (?, ?, ?) ORDER BY number DESC"));
        assert_eq!(
            params,
            vec![Value::Integer(5), Value::Integer(2), Value::Integer(9)]
        );
    }

    #[test]
    fn only_visible_adds_literal_predicate_without_param() {
        let filter = RaceListFilter {
            meeting_ids: vec![1],
            only_visible: true,
        };
        let (sql, params) = build_list_query(Some(&filter), "name", "ASC");

        assert!(sql.ends_with(" WHERE meeting_id IN (?) AND visible = TRUE ORDER BY name ASC"));
        assert_eq!(params, vec![Value::Integer(1)]);
    }

    #[test]
    fn empty_meeting_ids_add_no_predicate() {
        let (sql, params) = build_list_query(Some(&RaceListFilter::default()), "name", "asc");
        assert!(!sql.contains("WHERE"));
        assert!(params.is_empty());
    }

    #[test]
    fn start_time_orders_by_instant_then_raw_text() {
        assert_eq!(
            SortField::AdvertisedStartTime.order_terms(SortDirection::Descending),
            format!("{START_TIME_INSTANT_SQL} DESC, advertised_start_time DESC")
        );
        assert_eq!(
            SortField::Name.order_terms(SortDirection::Descending),
            "name DESC"
        );
    }

    #[test]
    fn tolerant_sort_defaults_unknown_values() {
        assert_eq!(
            RaceSort::tolerant("id; DROP TABLE races", "sideways"),
            RaceSort::new(SortField::AdvertisedStartTime, SortDirection::Ascending)
        );
        assert_eq!(
            RaceSort::tolerant(" NAME ", "DeSc"),
            RaceSort::new(SortField::Name, SortDirection::Descending)
        );
    }

    #[test]
    fn injected_field_never_reaches_sql_text() {
        let (sql, _) = build_list_query(None, "name; DROP TABLE races", "asc; --");
        assert!(!sql.contains("DROP"));
        assert!(sql.ends_with("advertised_start_time ASC"));
    }

    #[test]
    fn strict_sort_rejects_unknown_values_but_defaults_blanks() {
        assert_eq!(
            RaceSort::strict("venue", "asc"),
            Err(QueryValidationError::InvalidSortField("venue".to_string()))
        );
        assert_eq!(
            RaceSort::strict("name", "up"),
            Err(QueryValidationError::InvalidSortDirection("up".to_string()))
        );
        assert_eq!(RaceSort::strict("", " "), Ok(RaceSort::default()));
    }

    #[test]
    fn strict_builder_matches_tolerant_output_for_valid_input() {
        let filter = RaceListFilter {
            meeting_ids: vec![3],
            only_visible: true,
        };
        let strict = build_list_query_strict(Some(&filter), "number", "Desc").unwrap();
        let tolerant = build_list_query(Some(&filter), "number", "Desc");
        assert_eq!(strict, tolerant);
    }
}
