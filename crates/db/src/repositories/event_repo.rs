//! Repository for the `solicitation_events` table. Events are append-only.

use printdesk_core::solicitation::NewEvent;
use printdesk_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::solicitation::EventRow;

/// Column list for `solicitation_events` queries.
const COLUMNS: &str = "id, solicitation_id, event_type, content, creation_date, \
    actor_registration, actor_name, actor_email, actor_role";

pub struct EventRepo;

impl EventRepo {
    pub async fn insert(
        conn: &mut PgConnection,
        solicitation_id: DbId,
        event: &NewEvent,
    ) -> Result<EventRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO solicitation_events \
                (solicitation_id, event_type, content, creation_date, \
                 actor_registration, actor_name, actor_email, actor_role) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EventRow>(&query)
            .bind(solicitation_id)
            .bind(event.event_type.name())
            .bind(&event.content)
            .bind(event.creation_date)
            .bind(&event.user.registration)
            .bind(&event.user.name)
            .bind(&event.user.email)
            .bind(event.user.role.name())
            .fetch_one(&mut *conn)
            .await
    }

    /// Timelines of several solicitations, newest first within each.
    pub async fn list_by_solicitations(
        pool: &PgPool,
        solicitation_ids: &[DbId],
    ) -> Result<Vec<EventRow>, sqlx::Error> {
        if solicitation_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM solicitation_events \
             WHERE solicitation_id = ANY($1) \
             ORDER BY solicitation_id, creation_date DESC, id DESC"
        );
        sqlx::query_as::<_, EventRow>(&query)
            .bind(solicitation_ids)
            .fetch_all(pool)
            .await
    }
}
