//! [`PgStore`]: the PostgreSQL implementation of the store traits.
//!
//! Multi-table writes (insert, update) run in one transaction so a
//! solicitation, its copies and its timeline are committed together.

use std::collections::HashMap;

use async_trait::async_trait;
use printdesk_core::error::{CoreError, CoreResult};
use printdesk_core::query::{Page, PageRequest, SolicitationFilter};
use printdesk_core::solicitation::{
    NewEvent, NewSolicitation, PrintCopy, Solicitation, TimelineEvent,
};
use printdesk_core::store::{CopyStore, SolicitationStore};
use printdesk_core::types::{DbId, Timestamp};

use crate::models::solicitation::SolicitationRow;
use crate::repositories::{CopyRepo, EventRepo, SolicitationRepo};
use crate::DbPool;

fn db_err(e: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("Database error: {e}"))
}

/// Store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Load copies and timelines for `rows` in two queries and assemble the
    /// aggregates, preserving row order.
    async fn hydrate(&self, rows: Vec<SolicitationRow>) -> CoreResult<Vec<Solicitation>> {
        let ids: Vec<DbId> = rows.iter().map(|r| r.id).collect();

        let mut copies: HashMap<DbId, Vec<PrintCopy>> = HashMap::new();
        for row in CopyRepo::list_by_solicitations(&self.pool, &ids)
            .await
            .map_err(db_err)?
        {
            copies.entry(row.solicitation_id).or_default().push(row.into());
        }

        let mut timelines: HashMap<DbId, Vec<TimelineEvent>> = HashMap::new();
        for row in EventRepo::list_by_solicitations(&self.pool, &ids)
            .await
            .map_err(db_err)?
        {
            timelines
                .entry(row.solicitation_id)
                .or_default()
                .push(TimelineEvent::try_from(row)?);
        }

        rows.into_iter()
            .map(|row| {
                let id = row.id;
                row.into_domain(
                    copies.remove(&id).unwrap_or_default(),
                    timelines.remove(&id).unwrap_or_default(),
                )
            })
            .collect()
    }

    async fn exists(&self, id: DbId) -> CoreResult<bool> {
        Ok(SolicitationRepo::find_by_id(&self.pool, id)
            .await
            .map_err(db_err)?
            .is_some())
    }

    fn not_found(id: DbId) -> CoreError {
        CoreError::NotFound {
            entity: "Solicitation",
            id,
        }
    }
}

#[async_trait]
impl SolicitationStore for PgStore {
    async fn find_by_id(&self, id: DbId) -> CoreResult<Option<Solicitation>> {
        let Some(row) = SolicitationRepo::find_by_id(&self.pool, id)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![row]).await?.pop())
    }

    async fn list(&self, filter: &SolicitationFilter) -> CoreResult<Vec<Solicitation>> {
        let rows = SolicitationRepo::list(&self.pool, filter)
            .await
            .map_err(db_err)?;
        self.hydrate(rows).await
    }

    async fn page(
        &self,
        filter: &SolicitationFilter,
        request: &PageRequest,
    ) -> CoreResult<Page<Solicitation>> {
        let total = SolicitationRepo::count(&self.pool, filter)
            .await
            .map_err(db_err)?;
        let rows = SolicitationRepo::page(&self.pool, filter, request)
            .await
            .map_err(db_err)?;
        Ok(Page::new(self.hydrate(rows).await?, request, total))
    }

    async fn list_stale(&self, cutoff: Timestamp) -> CoreResult<Vec<Solicitation>> {
        let rows = SolicitationRepo::list_stale(&self.pool, cutoff)
            .await
            .map_err(db_err)?;
        self.hydrate(rows).await
    }

    async fn insert(&self, new: &NewSolicitation) -> CoreResult<Solicitation> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let id = SolicitationRepo::insert(&mut tx, new)
            .await
            .map_err(db_err)?;
        for draft in &new.copies {
            CopyRepo::insert_draft(&mut tx, id, draft)
                .await
                .map_err(db_err)?;
        }
        EventRepo::insert(&mut tx, id, &new.opening_event)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        tracing::debug!(solicitation_id = id, "Solicitation inserted");

        self.find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::Internal(format!("solicitation {id} vanished after insert")))
    }

    async fn update(
        &self,
        solicitation: &Solicitation,
        event: &NewEvent,
    ) -> CoreResult<Option<Solicitation>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        if !SolicitationRepo::update(&mut tx, solicitation)
            .await
            .map_err(db_err)?
        {
            return Ok(None);
        }

        let keep: Vec<String> = solicitation
            .copies
            .iter()
            .map(|c| c.file_name.clone())
            .collect();
        CopyRepo::delete_absent(&mut tx, solicitation.id, &keep)
            .await
            .map_err(db_err)?;
        for copy in &solicitation.copies {
            let copy = PrintCopy {
                solicitation_id: solicitation.id,
                ..copy.clone()
            };
            CopyRepo::upsert(&mut tx, &copy).await.map_err(db_err)?;
        }
        EventRepo::insert(&mut tx, solicitation.id, event)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        self.find_by_id(solicitation.id).await
    }

    async fn append_event(
        &self,
        solicitation_id: DbId,
        event: &NewEvent,
    ) -> CoreResult<TimelineEvent> {
        if !self.exists(solicitation_id).await? {
            return Err(Self::not_found(solicitation_id));
        }
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        let row = EventRepo::insert(&mut conn, solicitation_id, event)
            .await
            .map_err(db_err)?;
        TimelineEvent::try_from(row)
    }

    async fn delete(&self, id: DbId) -> CoreResult<bool> {
        SolicitationRepo::delete(&self.pool, id)
            .await
            .map_err(db_err)
    }
}

#[async_trait]
impl CopyStore for PgStore {
    async fn save_copy(&self, copy: &PrintCopy) -> CoreResult<PrintCopy> {
        if !self.exists(copy.solicitation_id).await? {
            return Err(Self::not_found(copy.solicitation_id));
        }
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        let row = CopyRepo::upsert(&mut conn, copy).await.map_err(db_err)?;
        Ok(row.into())
    }

    async fn mark_not_in_disk(&self, solicitation_id: DbId, file_name: &str) -> CoreResult<()> {
        CopyRepo::mark_not_in_disk(&self.pool, solicitation_id, file_name)
            .await
            .map_err(db_err)
    }

    async fn list_by_solicitation(&self, solicitation_id: DbId) -> CoreResult<Vec<PrintCopy>> {
        let rows = CopyRepo::list_by_solicitation(&self.pool, solicitation_id)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(PrintCopy::from).collect())
    }
}
