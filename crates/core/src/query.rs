//! Listing filters, sort keys and pagination for solicitations.
//!
//! [`SolicitationFilter::matches`] is the reference predicate; the SQL builder
//! in `printdesk_db` must select exactly the same rows.

use std::cmp::Ordering;

use chrono::{Days, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::solicitation::Solicitation;
use crate::types::Timestamp;

/// Default page size for paginated listings.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: i64 = 100;

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Optional filters, AND-ed together. Absent fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SolicitationFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub query: Option<String>,
    pub is_concluded: Option<bool>,
    pub owner_registration: Option<String>,
}

/// A normalised free-text query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    /// Trimmed and lowercased.
    pub needle: String,
    /// Present when the needle parses as an integer; matched against id and
    /// deadline.
    pub number: Option<i64>,
}

impl SolicitationFilter {
    /// Lower creation bound: start of `start_date` (UTC).
    pub fn created_from(&self) -> Option<Timestamp> {
        self.start_date
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
    }

    /// Upper creation bound: start of the day after `end_date` (UTC), compared
    /// inclusively, so the whole end day is included.
    pub fn created_until(&self) -> Option<Timestamp> {
        self.end_date
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
    }

    /// `None` when the query is absent or blank.
    pub fn text_query(&self) -> Option<TextQuery> {
        let needle = self.query.as_deref()?.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let number = needle.parse::<i64>().ok();
        Some(TextQuery { needle, number })
    }

    pub fn matches(&self, s: &Solicitation) -> bool {
        if let Some(from) = self.created_from() {
            if s.creation_date < from {
                return false;
            }
        }
        if let Some(until) = self.created_until() {
            if s.creation_date > until {
                return false;
            }
        }
        if let Some(concluded) = self.is_concluded {
            if s.is_concluded() != concluded {
                return false;
            }
        }
        if let Some(owner) = &self.owner_registration {
            if &s.owner.registration != owner {
                return false;
            }
        }
        if let Some(q) = self.text_query() {
            let by_name = s.owner.name.to_lowercase().contains(&q.needle);
            let by_registration = s.owner.registration.to_lowercase().contains(&q.needle);
            let by_number = q
                .number
                .is_some_and(|n| s.id == n || i64::from(s.deadline) == n);
            if !(by_name || by_registration || by_number) {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Columns a listing may be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    Id,
    Deadline,
    CreationDate,
    ConclusionDate,
    Archived,
    TotalPageCount,
    OwnerRegistration,
    OwnerName,
}

impl SortColumn {
    /// Parse a client-supplied column name. Accepts camelCase and snake_case
    /// field names plus the owner aliases `registrationNumber` and
    /// `commonName`. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "id" => Some(Self::Id),
            "deadline" => Some(Self::Deadline),
            "creationDate" | "creation_date" => Some(Self::CreationDate),
            "conclusionDate" | "conclusion_date" => Some(Self::ConclusionDate),
            "archived" => Some(Self::Archived),
            "totalPageCount" | "total_page_count" => Some(Self::TotalPageCount),
            "registrationNumber" | "registration_number" | "registration" => {
                Some(Self::OwnerRegistration)
            }
            "commonName" | "common_name" | "name" => Some(Self::OwnerName),
            _ => None,
        }
    }

    fn compare(self, a: &Solicitation, b: &Solicitation) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::Deadline => a.deadline.cmp(&b.deadline),
            Self::CreationDate => a.creation_date.cmp(&b.creation_date),
            Self::ConclusionDate => a.conclusion_date.cmp(&b.conclusion_date),
            Self::Archived => a.archived.cmp(&b.archived),
            Self::TotalPageCount => a.total_page_count.cmp(&b.total_page_count),
            Self::OwnerRegistration => a.owner.registration.cmp(&b.owner.registration),
            Self::OwnerName => a.owner.name.cmp(&b.owner.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `"desc"` (any case) sorts descending; anything else ascending.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }
}

/// Sort `items` by `column`/`direction`, breaking ties by ascending id.
pub fn sort_solicitations(items: &mut [Solicitation], column: SortColumn, direction: SortDirection) {
    items.sort_by(|a, b| {
        let primary = match direction {
            SortDirection::Asc => column.compare(a, b),
            SortDirection::Desc => column.compare(a, b).reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    });
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// A validated page request. Page numbers are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_no: i64,
    pub page_size: i64,
    pub sort_column: SortColumn,
    pub direction: SortDirection,
}

impl PageRequest {
    /// Build from raw client values, clamping page number and size and
    /// falling back to id-ascending for unknown sort columns.
    pub fn new(
        page_no: Option<i64>,
        page_size: Option<i64>,
        sort_column: Option<&str>,
        sort_direction: Option<&str>,
    ) -> Self {
        Self {
            page_no: page_no.unwrap_or(0).max(0),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
            sort_column: sort_column.and_then(SortColumn::parse).unwrap_or_default(),
            direction: sort_direction.map(SortDirection::parse).unwrap_or_default(),
        }
    }

    /// Rows to skip. Saturates for absurd page numbers.
    pub fn offset(&self) -> i64 {
        self.page_no.saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None, None, None)
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page_no: i64,
    pub page_size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: i64) -> Self {
        let total_pages = (total_elements + request.page_size - 1) / request.page_size;
        Self {
            content,
            page_no: request.page_no,
            page_size: request.page_size,
            total_elements,
            total_pages,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Role;
    use crate::solicitation::UserProfile;
    use chrono::{TimeZone, Utc};

    fn solicitation(id: i64, deadline: i32, name: &str, registration: &str, day: u32) -> Solicitation {
        Solicitation {
            id,
            deadline,
            creation_date: Utc.with_ymd_and_hms(2026, 5, day, 15, 30, 0).unwrap(),
            conclusion_date: None,
            archived: false,
            owner: UserProfile {
                registration: registration.to_string(),
                name: name.to_string(),
                email: format!("{registration}@example.edu"),
                role: Role::User,
            },
            total_page_count: 1,
            copies: vec![],
            timeline: vec![],
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, day).unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        let s = solicitation(1, 12, "Ana", "2020", 3);
        assert!(SolicitationFilter::default().matches(&s));
    }

    #[test]
    fn end_date_includes_whole_end_day() {
        let filter = SolicitationFilter {
            start_date: Some(date(2)),
            end_date: Some(date(3)),
            ..Default::default()
        };
        assert!(filter.matches(&solicitation(1, 12, "Ana", "1", 3)));
        assert!(filter.matches(&solicitation(2, 12, "Ana", "1", 2)));
        assert!(!filter.matches(&solicitation(3, 12, "Ana", "1", 1)));
        assert!(!filter.matches(&solicitation(4, 12, "Ana", "1", 5)));
    }

    #[test]
    fn numeric_query_matches_id_deadline_or_text() {
        let filter = SolicitationFilter {
            query: Some(" 42 ".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&solicitation(42, 12, "Ana", "1", 3)));
        assert!(filter.matches(&solicitation(7, 42, "Ana", "1", 3)));
        assert!(filter.matches(&solicitation(7, 12, "Ana", "20421", 3)));
        assert!(!filter.matches(&solicitation(7, 12, "Ana", "1", 3)));
    }

    #[test]
    fn text_query_is_case_insensitive_on_name() {
        let filter = SolicitationFilter {
            query: Some("SILVA".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&solicitation(1, 12, "Maria da Silva", "1", 3)));
        assert!(!filter.matches(&solicitation(2, 12, "Joao", "1", 3)));
    }

    #[test]
    fn blank_query_is_ignored() {
        let filter = SolicitationFilter {
            query: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(filter.text_query().is_none());
        assert!(filter.matches(&solicitation(1, 12, "Ana", "1", 3)));
    }

    #[test]
    fn concluded_and_owner_filters() {
        let mut closed = solicitation(1, 12, "Ana", "111", 3);
        closed.conclusion_date = Some(closed.creation_date);
        let open = solicitation(2, 12, "Ana", "222", 3);

        let concluded = SolicitationFilter {
            is_concluded: Some(true),
            ..Default::default()
        };
        assert!(concluded.matches(&closed));
        assert!(!concluded.matches(&open));

        let owner = SolicitationFilter {
            owner_registration: Some("222".to_string()),
            ..Default::default()
        };
        assert!(!owner.matches(&closed));
        assert!(owner.matches(&open));
    }

    #[test]
    fn sort_column_aliases() {
        assert_eq!(SortColumn::parse("registrationNumber"), Some(SortColumn::OwnerRegistration));
        assert_eq!(SortColumn::parse("commonName"), Some(SortColumn::OwnerName));
        assert_eq!(SortColumn::parse("creationDate"), Some(SortColumn::CreationDate));
        assert_eq!(SortColumn::parse("owner; DROP TABLE"), None);
    }

    #[test]
    fn sort_direction_only_desc_reverses() {
        assert_eq!(SortDirection::parse("DESC"), SortDirection::Desc);
        assert_eq!(SortDirection::parse("descending"), SortDirection::Asc);
        assert_eq!(SortDirection::parse(""), SortDirection::Asc);
    }

    #[test]
    fn sort_by_owner_name_desc_with_id_tiebreak() {
        let mut items = vec![
            solicitation(3, 12, "Bia", "1", 3),
            solicitation(1, 12, "Caio", "1", 3),
            solicitation(2, 12, "Bia", "1", 3),
        ];
        sort_solicitations(&mut items, SortColumn::OwnerName, SortDirection::Desc);
        let ids: Vec<i64> = items.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn page_request_clamps_values() {
        let req = PageRequest::new(Some(-2), Some(1000), Some("nope"), Some("desc"));
        assert_eq!(req.page_no, 0);
        assert_eq!(req.page_size, MAX_PAGE_SIZE);
        assert_eq!(req.sort_column, SortColumn::Id);
        assert_eq!(req.direction, SortDirection::Desc);
    }

    #[test]
    fn offset_saturates_for_huge_page_numbers() {
        let request = PageRequest::new(Some(i64::MAX), Some(10), None, None);
        assert_eq!(request.page_no, i64::MAX);
        assert_eq!(request.offset(), i64::MAX);
        assert_eq!(PageRequest::new(Some(3), Some(10), None, None).offset(), 30);
    }

    #[test]
    fn page_counts_total_pages() {
        let req = PageRequest::new(Some(1), Some(4), None, None);
        let page = Page::new(vec![5, 6, 7, 8], &req, 10);
        assert_eq!(page.total_pages, 3);
        assert_eq!(req.offset(), 4);

        let empty: Page<i32> = Page::new(vec![], &req, 0);
        assert_eq!(empty.total_pages, 0);
    }
}
