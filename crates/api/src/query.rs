//! Shared query parameter types for API handlers.
//!
//! Query strings use camelCase keys. `serde(flatten)` is avoided because
//! `serde_urlencoded` cannot parse numbers and booleans through it.

use chrono::NaiveDate;
use printdesk_core::query::{PageRequest, SolicitationFilter};
use serde::Deserialize;

/// `GET /solicitations` filters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub query: Option<String>,
    pub is_concluded: Option<bool>,
    /// Owner registration number.
    pub owner: Option<String>,
}

impl From<ListParams> for SolicitationFilter {
    fn from(p: ListParams) -> Self {
        Self {
            start_date: p.start_date,
            end_date: p.end_date,
            query: p.query,
            is_concluded: p.is_concluded,
            owner_registration: p.owner,
        }
    }
}

/// `GET /solicitations/page` filters plus paging and sorting.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub query: Option<String>,
    pub is_concluded: Option<bool>,
    pub owner: Option<String>,
    pub page_no: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_column: Option<String>,
    pub sort_direction: Option<String>,
}

impl PageParams {
    /// Split into the filter and the clamped page request.
    pub fn into_parts(self) -> (SolicitationFilter, PageRequest) {
        let request = PageRequest::new(
            self.page_no,
            self.page_size,
            self.sort_column.as_deref(),
            self.sort_direction.as_deref(),
        );
        let filter = SolicitationFilter {
            start_date: self.start_date,
            end_date: self.end_date,
            query: self.query,
            is_concluded: self.is_concluded,
            owner_registration: self.owner,
        };
        (filter, request)
    }
}

/// `?notify=` flag on toggle and delete.
#[derive(Debug, Default, Deserialize)]
pub struct NotifyParams {
    pub notify: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use printdesk_core::query::{SortColumn, SortDirection};

    #[test]
    fn page_params_split_into_filter_and_request() {
        let params = PageParams {
            owner: Some("42".into()),
            is_concluded: Some(false),
            page_no: Some(-3),
            page_size: Some(1000),
            sort_column: Some("creationDate".into()),
            sort_direction: Some("DESC".into()),
            ..Default::default()
        };

        let (filter, request) = params.into_parts();
        assert_eq!(filter.owner_registration.as_deref(), Some("42"));
        assert_eq!(filter.is_concluded, Some(false));
        assert_eq!(request.page_no, 0);
        assert_eq!(request.page_size, printdesk_core::query::MAX_PAGE_SIZE);
        assert_eq!(request.sort_column, SortColumn::CreationDate);
        assert_eq!(request.direction, SortDirection::Desc);
    }

    #[test]
    fn list_params_map_owner_to_registration() {
        let filter: SolicitationFilter = ListParams {
            owner: Some("7".into()),
            ..Default::default()
        }
        .into();
        assert_eq!(filter.owner_registration.as_deref(), Some("7"));
        assert!(filter.query.is_none());
    }
}
