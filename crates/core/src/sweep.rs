//! Archival of concluded solicitations whose retention window has passed.
//!
//! The sweep deletes files and flags the record archived; it never deletes
//! the record itself. Re-running it is harmless: archived solicitations are
//! never selected again.

use crate::error::{CoreError, CoreResult};
use crate::service::SolicitationService;
use crate::solicitation::{EventType, NewEvent, Solicitation, UserProfile};

impl SolicitationService {
    /// Archive every solicitation concluded more than the retention window
    /// ago and delete its files.
    ///
    /// Failures on one solicitation are logged and the sweep moves on.
    /// Returns the number of files deleted.
    pub async fn archive_stale(&self) -> CoreResult<usize> {
        let now = self.clock.now();
        let cutoff = now - self.retention;
        let stale = self.store.list_stale(cutoff).await?;
        if stale.is_empty() {
            return Ok(0);
        }

        let mut deleted = 0;
        let mut archived = 0;
        for solicitation in stale {
            let id = solicitation.id;
            match self.archive_one(solicitation).await {
                Ok(count) => {
                    deleted += count;
                    archived += 1;
                }
                Err(e) => {
                    tracing::error!(solicitation_id = id, error = %e, "Failed to archive solicitation");
                }
            }
        }

        tracing::info!(archived, files_deleted = deleted, %cutoff, "Stale sweep finished");
        Ok(deleted)
    }

    async fn archive_one(&self, mut solicitation: Solicitation) -> CoreResult<usize> {
        let folder = self
            .files()
            .solicitation_dir(&solicitation.owner.registration, solicitation.id);

        let copies = self.copies.list_by_solicitation(solicitation.id).await?;
        let deleted = self
            .reconciler
            .delete_files(solicitation.id, &copies, &folder)
            .await;
        for copy in &mut solicitation.copies {
            copy.file_in_disk = false;
        }
        self.files().remove_dir_best_effort(&folder).await;

        solicitation.archived = true;
        let event = NewEvent::new(
            EventType::RequestArchiving,
            UserProfile::system(),
            self.clock.now(),
        );
        self.store
            .update(&solicitation, &event)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Solicitation",
                id: solicitation.id,
            })?;

        tracing::debug!(solicitation_id = solicitation.id, files_deleted = deleted, "Solicitation archived");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use crate::clock::Clock;
    use crate::roles::Role;
    use crate::service::tests::{draft, harness, uploads, user};
    use crate::solicitation::EventType;
    use crate::store::SolicitationStore;
    use chrono::Duration;

    #[tokio::test]
    async fn archives_only_after_retention_and_is_idempotent() {
        let h = harness();
        let owner = user("1", Role::User);
        let staff = user("m", Role::Manager);

        let closed = h
            .service
            .create(draft(&["a.pdf", "b.pdf"]), uploads(&["a.pdf", "b.pdf"]), &owner)
            .await
            .unwrap();
        let open = h
            .service
            .create(draft(&["c.pdf"]), uploads(&["c.pdf"]), &owner)
            .await
            .unwrap();
        h.service
            .toggle_conclusion_date(closed.id, Some(false), &staff)
            .await
            .unwrap();

        h.clock.advance(Duration::hours(71));
        assert_eq!(h.service.archive_stale().await.unwrap(), 0);

        h.clock.advance(Duration::hours(2));
        assert_eq!(h.service.archive_stale().await.unwrap(), 2);
        assert_eq!(h.service.archive_stale().await.unwrap(), 0);

        let archived = h.store.find_by_id(closed.id).await.unwrap().unwrap();
        assert!(archived.archived);
        let concluded = archived.conclusion_date.unwrap();
        assert!(concluded + Duration::hours(72) <= h.clock.now());
        assert!(archived.copies.iter().all(|c| !c.file_in_disk));
        assert_eq!(archived.timeline[0].event_type, EventType::RequestArchiving);
        assert_eq!(archived.timeline[0].user.role, Role::System);
        assert!(!h.base.join("1").join(closed.id.to_string()).exists());

        let untouched = h.store.find_by_id(open.id).await.unwrap().unwrap();
        assert!(!untouched.archived);
        assert!(h.base.join("1").join(open.id.to_string()).join("c.pdf").exists());
    }

    #[tokio::test]
    async fn archived_solicitation_rejects_edits_but_allows_viewing() {
        let h = harness();
        let owner = user("1", Role::User);
        let s = h
            .service
            .create(draft(&["a.pdf"]), uploads(&["a.pdf"]), &owner)
            .await
            .unwrap();
        h.service.toggle_conclusion_date(s.id, Some(false), &owner).await.unwrap();
        h.clock.advance(Duration::hours(100));
        h.service.archive_stale().await.unwrap();

        assert!(h.service.view(s.id, &owner).await.is_ok());
        let err = h
            .service
            .patch(s.id, draft(&["a.pdf"]), Vec::new(), &owner)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::CoreError::Forbidden(_)));
        let err = h.service.get_file(&owner, s.id, "a.pdf").await.unwrap_err();
        assert!(matches!(err, crate::error::CoreError::Gone(_)));
    }
}
