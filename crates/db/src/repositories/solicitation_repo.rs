//! Repository for the `solicitations` table.

use printdesk_core::query::{PageRequest, SolicitationFilter};
use printdesk_core::solicitation::{NewSolicitation, Solicitation};
use printdesk_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::filter::{bind_values, bind_values_scalar, build_filter, order_clause};
use crate::models::solicitation::SolicitationRow;

/// Column list for `solicitations` queries (aliased `s`).
const COLUMNS: &str = "s.id, s.deadline, s.creation_date, s.conclusion_date, s.archived, \
    s.owner_registration, s.owner_name, s.owner_email, s.owner_role, s.total_page_count";

/// Provides read/write operations for solicitation rows. Children are handled
/// by [`CopyRepo`](super::CopyRepo) and [`EventRepo`](super::EventRepo).
pub struct SolicitationRepo;

impl SolicitationRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<SolicitationRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM solicitations s WHERE s.id = $1");
        sqlx::query_as::<_, SolicitationRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All rows matching `filter`, id ascending.
    pub async fn list(
        pool: &PgPool,
        filter: &SolicitationFilter,
    ) -> Result<Vec<SolicitationRow>, sqlx::Error> {
        let (where_clause, values, _) = build_filter(filter);
        let query = format!("SELECT {COLUMNS} FROM solicitations s {where_clause} ORDER BY s.id ASC");
        bind_values(sqlx::query_as::<_, SolicitationRow>(&query), &values)
            .fetch_all(pool)
            .await
    }

    /// One page of rows matching `filter`.
    pub async fn page(
        pool: &PgPool,
        filter: &SolicitationFilter,
        request: &PageRequest,
    ) -> Result<Vec<SolicitationRow>, sqlx::Error> {
        let (where_clause, values, bind_idx) = build_filter(filter);
        let query = format!(
            "SELECT {COLUMNS} FROM solicitations s {where_clause} {} \
             LIMIT ${bind_idx} OFFSET ${}",
            order_clause(request),
            bind_idx + 1
        );
        bind_values(sqlx::query_as::<_, SolicitationRow>(&query), &values)
            .bind(request.page_size)
            .bind(request.offset())
            .fetch_all(pool)
            .await
    }

    /// Count rows matching `filter` (for pagination metadata).
    pub async fn count(pool: &PgPool, filter: &SolicitationFilter) -> Result<i64, sqlx::Error> {
        let (where_clause, values, _) = build_filter(filter);
        let query = format!("SELECT COUNT(*)::BIGINT FROM solicitations s {where_clause}");
        bind_values_scalar(sqlx::query_scalar::<_, i64>(&query), &values)
            .fetch_one(pool)
            .await
    }

    /// Concluded, unarchived rows whose conclusion date is before `cutoff`.
    pub async fn list_stale(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<Vec<SolicitationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM solicitations s \
             WHERE NOT s.archived AND s.conclusion_date IS NOT NULL AND s.conclusion_date < $1 \
             ORDER BY s.id ASC"
        );
        sqlx::query_as::<_, SolicitationRow>(&query)
            .bind(cutoff)
            .fetch_all(pool)
            .await
    }

    /// Insert the solicitation row, returning its id.
    pub async fn insert(conn: &mut PgConnection, new: &NewSolicitation) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO solicitations \
                (deadline, creation_date, conclusion_date, archived, \
                 owner_registration, owner_name, owner_email, owner_role, total_page_count) \
             VALUES ($1, $2, NULL, false, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(new.deadline)
        .bind(new.creation_date)
        .bind(&new.owner.registration)
        .bind(&new.owner.name)
        .bind(&new.owner.email)
        .bind(new.owner.role.name())
        .bind(new.total_page_count)
        .fetch_one(&mut *conn)
        .await
    }

    /// Write the mutable columns. Owner and creation date never change.
    ///
    /// Returns `false` if the row does not exist.
    pub async fn update(conn: &mut PgConnection, s: &Solicitation) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE solicitations SET \
                deadline = $2, conclusion_date = $3, archived = $4, total_page_count = $5 \
             WHERE id = $1",
        )
        .bind(s.id)
        .bind(s.deadline)
        .bind(s.conclusion_date)
        .bind(s.archived)
        .bind(s.total_page_count)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a solicitation; copies and events cascade.
    ///
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM solicitations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
