//! Repository for the `solicitation_copies` table.

use printdesk_core::solicitation::{CopyDraft, PrintCopy};
use printdesk_core::types::DbId;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::models::solicitation::CopyRow;

/// Column list for `solicitation_copies` queries.
const COLUMNS: &str = "id, solicitation_id, file_name, file_type, page_count, \
    print_config, file_in_disk, is_physical_file, notes";

/// Provides CRUD operations for print copies. Copies are identified by
/// `(solicitation_id, file_name)`.
pub struct CopyRepo;

impl CopyRepo {
    pub async fn list_by_solicitation(
        pool: &PgPool,
        solicitation_id: DbId,
    ) -> Result<Vec<CopyRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM solicitation_copies WHERE solicitation_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, CopyRow>(&query)
            .bind(solicitation_id)
            .fetch_all(pool)
            .await
    }

    /// Copies of several solicitations at once, grouped by the caller.
    pub async fn list_by_solicitations(
        pool: &PgPool,
        solicitation_ids: &[DbId],
    ) -> Result<Vec<CopyRow>, sqlx::Error> {
        if solicitation_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM solicitation_copies \
             WHERE solicitation_id = ANY($1) ORDER BY solicitation_id, id ASC"
        );
        sqlx::query_as::<_, CopyRow>(&query)
            .bind(solicitation_ids)
            .fetch_all(pool)
            .await
    }

    /// Insert a fresh copy from a draft. File flags start cleared.
    pub async fn insert_draft(
        conn: &mut PgConnection,
        solicitation_id: DbId,
        draft: &CopyDraft,
    ) -> Result<CopyRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO solicitation_copies \
                (solicitation_id, file_name, file_type, page_count, print_config, notes) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CopyRow>(&query)
            .bind(solicitation_id)
            .bind(&draft.file_name)
            .bind(&draft.file_type)
            .bind(draft.page_count)
            .bind(Json(&draft.print_config))
            .bind(&draft.notes)
            .fetch_one(&mut *conn)
            .await
    }

    /// Insert or update a copy by `(solicitation_id, file_name)`.
    pub async fn upsert(conn: &mut PgConnection, copy: &PrintCopy) -> Result<CopyRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO solicitation_copies \
                (solicitation_id, file_name, file_type, page_count, print_config, \
                 file_in_disk, is_physical_file, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (solicitation_id, file_name) DO UPDATE SET \
                file_type = EXCLUDED.file_type, \
                page_count = EXCLUDED.page_count, \
                print_config = EXCLUDED.print_config, \
                file_in_disk = EXCLUDED.file_in_disk, \
                is_physical_file = EXCLUDED.is_physical_file, \
                notes = EXCLUDED.notes \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CopyRow>(&query)
            .bind(copy.solicitation_id)
            .bind(&copy.file_name)
            .bind(&copy.file_type)
            .bind(copy.page_count)
            .bind(Json(&copy.print_config))
            .bind(copy.file_in_disk)
            .bind(copy.is_physical_file)
            .bind(&copy.notes)
            .fetch_one(&mut *conn)
            .await
    }

    /// Delete every copy of a solicitation whose name is not in `keep`.
    pub async fn delete_absent(
        conn: &mut PgConnection,
        solicitation_id: DbId,
        keep: &[String],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM solicitation_copies \
             WHERE solicitation_id = $1 AND NOT (file_name = ANY($2))",
        )
        .bind(solicitation_id)
        .bind(keep)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Clear `file_in_disk` for one copy. A missing copy is not an error.
    pub async fn mark_not_in_disk(
        pool: &PgPool,
        solicitation_id: DbId,
        file_name: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE solicitation_copies SET file_in_disk = false \
             WHERE solicitation_id = $1 AND file_name = $2",
        )
        .bind(solicitation_id)
        .bind(file_name)
        .execute(pool)
        .await?;
        Ok(())
    }
}
