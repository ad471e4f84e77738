//! In-memory store with the same semantics as the PostgreSQL store.
//!
//! Used by tests and for running the API without a database. All state sits
//! behind one mutex, so every trait call is atomic.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{CopyStore, SolicitationStore};
use crate::error::{CoreError, CoreResult};
use crate::query::{sort_solicitations, Page, PageRequest, SolicitationFilter};
use crate::solicitation::{NewEvent, NewSolicitation, PrintCopy, Solicitation, TimelineEvent};
use crate::types::{DbId, Timestamp};

#[derive(Debug, Default)]
struct State {
    solicitations: BTreeMap<DbId, Solicitation>,
    next_solicitation_id: DbId,
    next_copy_id: DbId,
    next_event_id: DbId,
}

impl State {
    fn next_id(counter: &mut DbId) -> DbId {
        *counter += 1;
        *counter
    }

    fn push_event(&mut self, solicitation_id: DbId, event: &NewEvent) -> CoreResult<TimelineEvent> {
        let id = Self::next_id(&mut self.next_event_id);
        let stored = self
            .solicitations
            .get_mut(&solicitation_id)
            .ok_or(CoreError::NotFound {
                entity: "Solicitation",
                id: solicitation_id,
            })?;
        let entry = TimelineEvent {
            id,
            solicitation_id,
            user: event.user.clone(),
            event_type: event.event_type,
            content: event.content.clone(),
            creation_date: event.creation_date,
        };
        stored.timeline.push(entry.clone());
        stored.timeline.sort_by(|a, b| {
            b.creation_date
                .cmp(&a.creation_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(entry)
    }
}

/// Thread-safe in-memory [`SolicitationStore`] and [`CopyStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SolicitationStore for MemoryStore {
    async fn find_by_id(&self, id: DbId) -> CoreResult<Option<Solicitation>> {
        Ok(self.lock().solicitations.get(&id).cloned())
    }

    async fn list(&self, filter: &SolicitationFilter) -> CoreResult<Vec<Solicitation>> {
        Ok(self
            .lock()
            .solicitations
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    async fn page(
        &self,
        filter: &SolicitationFilter,
        request: &PageRequest,
    ) -> CoreResult<Page<Solicitation>> {
        let mut matching = self.list(filter).await?;
        sort_solicitations(&mut matching, request.sort_column, request.direction);
        let total = matching.len() as i64;
        let content = matching
            .into_iter()
            .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(request.page_size).unwrap_or(usize::MAX))
            .collect();
        Ok(Page::new(content, request, total))
    }

    async fn list_stale(&self, cutoff: Timestamp) -> CoreResult<Vec<Solicitation>> {
        Ok(self
            .lock()
            .solicitations
            .values()
            .filter(|s| !s.archived && s.conclusion_date.is_some_and(|c| c < cutoff))
            .cloned()
            .collect())
    }

    async fn insert(&self, new: &NewSolicitation) -> CoreResult<Solicitation> {
        let mut state = self.lock();
        let id = State::next_id(&mut state.next_solicitation_id);

        let mut copies = Vec::with_capacity(new.copies.len());
        for draft in &new.copies {
            let mut copy = PrintCopy::from_draft(id, draft);
            copy.id = State::next_id(&mut state.next_copy_id);
            copies.push(copy);
        }

        state.solicitations.insert(
            id,
            Solicitation {
                id,
                deadline: new.deadline,
                creation_date: new.creation_date,
                conclusion_date: None,
                archived: false,
                owner: new.owner.clone(),
                total_page_count: new.total_page_count,
                copies,
                timeline: Vec::new(),
            },
        );
        state.push_event(id, &new.opening_event)?;

        state
            .solicitations
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::Internal(format!("solicitation {id} vanished after insert")))
    }

    async fn update(
        &self,
        solicitation: &Solicitation,
        event: &NewEvent,
    ) -> CoreResult<Option<Solicitation>> {
        let mut state = self.lock();
        let State {
            solicitations,
            next_copy_id,
            ..
        } = &mut *state;
        let Some(stored) = solicitations.get_mut(&solicitation.id) else {
            return Ok(None);
        };

        stored.deadline = solicitation.deadline;
        stored.conclusion_date = solicitation.conclusion_date;
        stored.archived = solicitation.archived;
        stored.total_page_count = solicitation.total_page_count;

        let mut copies = Vec::with_capacity(solicitation.copies.len());
        for incoming in &solicitation.copies {
            let id = stored
                .copy(&incoming.file_name)
                .map(|c| c.id)
                .unwrap_or_else(|| State::next_id(next_copy_id));
            copies.push(PrintCopy {
                id,
                solicitation_id: solicitation.id,
                ..incoming.clone()
            });
        }
        stored.copies = copies;

        state.push_event(solicitation.id, event)?;
        Ok(state.solicitations.get(&solicitation.id).cloned())
    }

    async fn append_event(
        &self,
        solicitation_id: DbId,
        event: &NewEvent,
    ) -> CoreResult<TimelineEvent> {
        self.lock().push_event(solicitation_id, event)
    }

    async fn delete(&self, id: DbId) -> CoreResult<bool> {
        Ok(self.lock().solicitations.remove(&id).is_some())
    }
}

#[async_trait]
impl CopyStore for MemoryStore {
    async fn save_copy(&self, copy: &PrintCopy) -> CoreResult<PrintCopy> {
        let mut state = self.lock();
        let State {
            solicitations,
            next_copy_id,
            ..
        } = &mut *state;
        let stored = solicitations
            .get_mut(&copy.solicitation_id)
            .ok_or(CoreError::NotFound {
                entity: "Solicitation",
                id: copy.solicitation_id,
            })?;

        if let Some(existing) = stored.copy_mut(&copy.file_name) {
            let id = existing.id;
            *existing = PrintCopy { id, ..copy.clone() };
            return Ok(existing.clone());
        }

        let saved = PrintCopy {
            id: State::next_id(next_copy_id),
            ..copy.clone()
        };
        stored.copies.push(saved.clone());
        Ok(saved)
    }

    async fn mark_not_in_disk(&self, solicitation_id: DbId, file_name: &str) -> CoreResult<()> {
        let mut state = self.lock();
        if let Some(copy) = state
            .solicitations
            .get_mut(&solicitation_id)
            .and_then(|s| s.copy_mut(file_name))
        {
            copy.file_in_disk = false;
        }
        Ok(())
    }

    async fn list_by_solicitation(&self, solicitation_id: DbId) -> CoreResult<Vec<PrintCopy>> {
        Ok(self
            .lock()
            .solicitations
            .get(&solicitation_id)
            .map(|s| s.copies.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Role;
    use crate::solicitation::{CopyDraft, EventType, PrintConfig, UserProfile};
    use chrono::{TimeZone, Utc};

    fn owner() -> UserProfile {
        UserProfile {
            registration: "2021001".to_string(),
            name: "Ana Lima".to_string(),
            email: "ana@example.edu".to_string(),
            role: Role::User,
        }
    }

    fn new_solicitation(names: &[&str]) -> NewSolicitation {
        let at = Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap();
        NewSolicitation {
            deadline: 24,
            owner: owner(),
            creation_date: at,
            total_page_count: names.len() as i32,
            copies: names
                .iter()
                .map(|n| CopyDraft {
                    file_name: n.to_string(),
                    file_type: "application/pdf".to_string(),
                    page_count: 1,
                    print_config: PrintConfig::default(),
                    notes: None,
                })
                .collect(),
            opening_event: NewEvent::new(EventType::RequestOpening, owner(), at),
        }
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_opening_event() {
        let store = MemoryStore::new();
        let created = store.insert(&new_solicitation(&["a.pdf", "b.pdf"])).await.unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(created.copies.len(), 2);
        assert!(created.copies.iter().all(|c| c.id > 0 && c.solicitation_id == 1));
        assert_eq!(created.timeline.len(), 1);
        assert_eq!(created.timeline[0].event_type, EventType::RequestOpening);
    }

    #[tokio::test]
    async fn update_reconciles_copies_by_name_and_prepends_event() {
        let store = MemoryStore::new();
        let created = store.insert(&new_solicitation(&["a.pdf", "b.pdf"])).await.unwrap();
        let b_id = created.copy("b.pdf").unwrap().id;

        let mut changed = created.clone();
        changed.copies.retain(|c| c.file_name != "a.pdf");
        changed
            .copies
            .push(PrintCopy::from_draft(created.id, &new_solicitation(&["c.pdf"]).copies[0]));
        let later = created.creation_date + chrono::Duration::minutes(5);
        let event = NewEvent::new(EventType::RequestEditing, owner(), later);

        let updated = store.update(&changed, &event).await.unwrap().unwrap();
        let names: Vec<&str> = updated.copies.iter().map(|c| c.file_name.as_str()).collect();
        assert_eq!(names, vec!["b.pdf", "c.pdf"]);
        assert_eq!(updated.copy("b.pdf").unwrap().id, b_id);
        assert_eq!(updated.timeline[0].event_type, EventType::RequestEditing);
        assert_eq!(updated.timeline.len(), 2);
    }

    #[tokio::test]
    async fn update_of_missing_solicitation_returns_none() {
        let store = MemoryStore::new();
        let created = store.insert(&new_solicitation(&["a.pdf"])).await.unwrap();
        store.delete(created.id).await.unwrap();

        let event = NewEvent::new(EventType::RequestEditing, owner(), created.creation_date);
        assert!(store.update(&created, &event).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_copy_upserts_by_file_name() {
        let store = MemoryStore::new();
        let created = store.insert(&new_solicitation(&["a.pdf"])).await.unwrap();

        let mut a = created.copies[0].clone();
        a.file_in_disk = true;
        let saved = store.save_copy(&a).await.unwrap();
        assert_eq!(saved.id, a.id);

        store.mark_not_in_disk(created.id, "a.pdf").await.unwrap();
        store.mark_not_in_disk(created.id, "ghost.pdf").await.unwrap();
        let copies = store.list_by_solicitation(created.id).await.unwrap();
        assert_eq!(copies.len(), 1);
        assert!(!copies[0].file_in_disk);
    }

    #[tokio::test]
    async fn list_stale_selects_closed_unarchived_before_cutoff() {
        let store = MemoryStore::new();
        let open = store.insert(&new_solicitation(&["a.pdf"])).await.unwrap();
        let mut closed = store.insert(&new_solicitation(&["b.pdf"])).await.unwrap();
        let closed_at = closed.creation_date + chrono::Duration::hours(1);
        closed.conclusion_date = Some(closed_at);
        let event = NewEvent::new(EventType::RequestClosing, owner(), closed_at);
        store.update(&closed, &event).await.unwrap();

        let stale = store
            .list_stale(closed_at + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, closed.id);
        assert_ne!(stale[0].id, open.id);

        assert!(store.list_stale(closed_at).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn page_far_past_the_end_is_empty() {
        let store = MemoryStore::new();
        store.insert(&new_solicitation(&["a.pdf"])).await.unwrap();

        let request = PageRequest::new(Some(i64::MAX), Some(10), None, None);
        let page = store
            .page(&SolicitationFilter::default(), &request)
            .await
            .unwrap();
        assert!(page.content.is_empty());
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.total_pages, 1);
    }
}
