//! Persistence seams for the solicitation aggregate.
//!
//! [`SolicitationStore`] persists whole aggregates (request + copies +
//! timeline) and must apply each write as one unit. [`CopyStore`] is the
//! narrow per-copy surface the file reconciler uses while it writes files.
//!
//! Implementations: `printdesk_db::PgStore` (PostgreSQL) and
//! [`memory::MemoryStore`].

pub mod memory;

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::query::{Page, PageRequest, SolicitationFilter};
use crate::solicitation::{NewEvent, NewSolicitation, PrintCopy, Solicitation, TimelineEvent};
use crate::types::{DbId, Timestamp};

#[async_trait]
pub trait SolicitationStore: Send + Sync {
    /// Load one aggregate with copies and newest-first timeline.
    async fn find_by_id(&self, id: DbId) -> CoreResult<Option<Solicitation>>;

    /// All matching aggregates, ordered by id ascending.
    async fn list(&self, filter: &SolicitationFilter) -> CoreResult<Vec<Solicitation>>;

    /// One page of matching aggregates in the requested order.
    async fn page(
        &self,
        filter: &SolicitationFilter,
        request: &PageRequest,
    ) -> CoreResult<Page<Solicitation>>;

    /// Closed, unarchived aggregates whose conclusion date is before `cutoff`.
    async fn list_stale(&self, cutoff: Timestamp) -> CoreResult<Vec<Solicitation>>;

    /// Insert request, copies and opening event atomically.
    async fn insert(&self, new: &NewSolicitation) -> CoreResult<Solicitation>;

    /// Persist the mutable fields of `solicitation`, reconcile its copies by
    /// file name (upsert present ones, delete absent ones) and append `event`,
    /// atomically. Returns the reloaded aggregate, or `None` if it no longer
    /// exists.
    async fn update(
        &self,
        solicitation: &Solicitation,
        event: &NewEvent,
    ) -> CoreResult<Option<Solicitation>>;

    /// Append a single timeline entry.
    async fn append_event(&self, solicitation_id: DbId, event: &NewEvent)
        -> CoreResult<TimelineEvent>;

    /// Delete the aggregate with its copies and events. Returns `true` if a
    /// row was removed.
    async fn delete(&self, id: DbId) -> CoreResult<bool>;
}

#[async_trait]
pub trait CopyStore: Send + Sync {
    /// Insert or update a copy, keyed by `(solicitation_id, file_name)`.
    async fn save_copy(&self, copy: &PrintCopy) -> CoreResult<PrintCopy>;

    /// Record that the digital file of a copy is no longer on disk. A missing
    /// copy row is not an error.
    async fn mark_not_in_disk(&self, solicitation_id: DbId, file_name: &str) -> CoreResult<()>;

    async fn list_by_solicitation(&self, solicitation_id: DbId) -> CoreResult<Vec<PrintCopy>>;
}
