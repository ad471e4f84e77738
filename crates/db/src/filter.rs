//! SQL rendition of [`SolicitationFilter`] and [`PageRequest`] ordering.
//!
//! Must select exactly the rows [`SolicitationFilter::matches`] accepts.

use printdesk_core::query::{PageRequest, SolicitationFilter, SortColumn, SortDirection};
use printdesk_core::types::Timestamp;

/// A positional bind value produced by [`build_filter`].
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    BigInt(i64),
    Text(String),
    Timestamp(Timestamp),
}

/// Escape `LIKE` wildcards so user text matches literally.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Build the `WHERE` clause for `filter` over the `solicitations` table
/// aliased `s`.
///
/// Returns the clause (empty when nothing filters), the bind values in
/// placeholder order and the next free placeholder index.
pub fn build_filter(filter: &SolicitationFilter) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<BindValue> = Vec::new();

    if let Some(from) = filter.created_from() {
        conditions.push(format!("s.creation_date >= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(from));
    }

    if let Some(until) = filter.created_until() {
        conditions.push(format!("s.creation_date <= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Timestamp(until));
    }

    match filter.is_concluded {
        Some(true) => conditions.push("s.conclusion_date IS NOT NULL".to_string()),
        Some(false) => conditions.push("s.conclusion_date IS NULL".to_string()),
        None => {}
    }

    if let Some(ref owner) = filter.owner_registration {
        conditions.push(format!("s.owner_registration = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(owner.clone()));
    }

    if let Some(query) = filter.text_query() {
        let text_idx = bind_idx;
        bind_idx += 1;
        bind_values.push(BindValue::Text(like_pattern(&query.needle)));

        let mut alternatives = vec![
            format!("LOWER(s.owner_name) LIKE ${text_idx}"),
            format!("LOWER(s.owner_registration) LIKE ${text_idx}"),
        ];
        if let Some(number) = query.number {
            alternatives.push(format!("s.id = ${bind_idx}"));
            alternatives.push(format!("s.deadline = ${bind_idx}"));
            bind_idx += 1;
            bind_values.push(BindValue::BigInt(number));
        }
        conditions.push(format!("({})", alternatives.join(" OR ")));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bind_values, bind_idx)
}

fn column_sql(column: SortColumn) -> &'static str {
    match column {
        SortColumn::Id => "s.id",
        SortColumn::Deadline => "s.deadline",
        SortColumn::CreationDate => "s.creation_date",
        SortColumn::ConclusionDate => "s.conclusion_date",
        SortColumn::Archived => "s.archived",
        SortColumn::TotalPageCount => "s.total_page_count",
        SortColumn::OwnerRegistration => "s.owner_registration",
        SortColumn::OwnerName => "s.owner_name",
    }
}

/// `ORDER BY` clause for a page request, with ascending id as tiebreak.
/// Null conclusion dates sort first ascending and last descending.
pub fn order_clause(request: &PageRequest) -> String {
    let column = column_sql(request.sort_column);
    let direction = match request.direction {
        SortDirection::Asc => "ASC NULLS FIRST",
        SortDirection::Desc => "DESC NULLS LAST",
    };
    if request.sort_column == SortColumn::Id {
        format!("ORDER BY {column} {direction}")
    } else {
        format!("ORDER BY {column} {direction}, s.id ASC")
    }
}

/// Bind a slice of [`BindValue`] to a sqlx `QueryAs`.
pub fn bind_values<'q, O>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    values: &'q [BindValue],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for val in values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::Timestamp(v) => q = q.bind(*v),
        }
    }
    q
}

/// Bind a slice of [`BindValue`] to a sqlx `QueryScalar`.
pub fn bind_values_scalar<'q>(
    mut q: sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments>,
    values: &'q [BindValue],
) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments> {
    for val in values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::Timestamp(v) => q = q.bind(*v),
        }
    }
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn empty_filter_has_no_where_clause() {
        let (clause, binds, next) = build_filter(&SolicitationFilter::default());
        assert!(clause.is_empty());
        assert!(binds.is_empty());
        assert_eq!(next, 1);
    }

    #[test]
    fn date_range_and_owner_bind_in_order() {
        let filter = SolicitationFilter {
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 2),
            owner_registration: Some("2021001".into()),
            is_concluded: Some(false),
            ..Default::default()
        };
        let (clause, binds, next) = build_filter(&filter);
        assert_eq!(
            clause,
            "WHERE s.creation_date >= $1 AND s.creation_date <= $2 \
             AND s.conclusion_date IS NULL AND s.owner_registration = $3"
        );
        assert_eq!(binds.len(), 3);
        assert_eq!(binds[1], BindValue::Timestamp(filter.created_until().unwrap()));
        assert_eq!(next, 4);
    }

    #[test]
    fn numeric_query_matches_text_id_and_deadline() {
        let filter = SolicitationFilter {
            query: Some(" 42 ".into()),
            ..Default::default()
        };
        let (clause, binds, next) = build_filter(&filter);
        assert_eq!(
            clause,
            "WHERE (LOWER(s.owner_name) LIKE $1 OR LOWER(s.owner_registration) LIKE $1 \
             OR s.id = $2 OR s.deadline = $2)"
        );
        assert_eq!(
            binds,
            vec![BindValue::Text("%42%".into()), BindValue::BigInt(42)]
        );
        assert_eq!(next, 3);
    }

    #[test]
    fn text_query_is_lowercased_and_escaped() {
        let filter = SolicitationFilter {
            query: Some("Ana_100%".into()),
            ..Default::default()
        };
        let (clause, binds, _) = build_filter(&filter);
        assert!(!clause.contains("s.id"));
        assert_eq!(binds, vec![BindValue::Text("%ana\\_100\\%%".into())]);
    }

    #[test]
    fn order_clause_adds_id_tiebreak() {
        let by_id = PageRequest::default();
        assert_eq!(order_clause(&by_id), "ORDER BY s.id ASC NULLS FIRST");

        let by_name = PageRequest::new(None, None, Some("commonName"), Some("DESC"));
        assert_eq!(
            order_clause(&by_name),
            "ORDER BY s.owner_name DESC NULLS LAST, s.id ASC"
        );
    }
}
