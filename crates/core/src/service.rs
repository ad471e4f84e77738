//! Solicitation lifecycle: query, create, patch, toggle, comment, delete and
//! file download.
//!
//! Every entry point that touches an existing solicitation goes through
//! [`AccessControl::can_interact`] before doing anything else.

use std::path::PathBuf;
use std::sync::Arc;

use crate::access::AccessControl;
use crate::clock::{Clock, SystemClock};
use crate::error::{CoreError, CoreResult};
use crate::notify::NotificationDispatcher;
use crate::query::{Page, PageRequest, SolicitationFilter};
use crate::reconciler::{FileReconciler, UploadedFile};
use crate::solicitation::{
    EventType, NewEvent, NewSolicitation, PrintCopy, Solicitation, SolicitationDraft,
    TimelineEvent, UserProfile,
};
use crate::storage::FileArea;
use crate::store::{CopyStore, SolicitationStore};
use crate::types::DbId;
use crate::validation::{ExtensionValidator, FileValidator};

/// Hours a concluded solicitation keeps its files before the sweep archives it.
pub const DEFAULT_RETENTION_HOURS: i64 = 72;

// ---------------------------------------------------------------------------
// File download
// ---------------------------------------------------------------------------

/// An opened attachment ready to be streamed to the caller.
#[derive(Debug)]
pub struct FileDownload {
    pub file_name: String,
    /// The copy's declared type.
    pub content_type: String,
    pub size: u64,
    pub file: tokio::fs::File,
}

impl FileDownload {
    pub fn content_disposition(&self) -> String {
        format!(
            "attachment; filename=\"{}\"",
            self.file_name.replace('"', "")
        )
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Orchestrates the solicitation lifecycle over a store, the file area and
/// the notification dispatcher.
pub struct SolicitationService {
    pub(crate) store: Arc<dyn SolicitationStore>,
    pub(crate) copies: Arc<dyn CopyStore>,
    pub(crate) access: AccessControl,
    pub(crate) reconciler: FileReconciler,
    pub(crate) notifier: NotificationDispatcher,
    pub(crate) validator: Arc<dyn FileValidator>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) retention: chrono::Duration,
}

impl SolicitationService {
    /// Build a service over one backend implementing both store traits.
    ///
    /// Defaults: no notifications, [`ExtensionValidator`], [`SystemClock`]
    /// and [`DEFAULT_RETENTION_HOURS`].
    pub fn new<S>(backend: Arc<S>, files: FileArea) -> Self
    where
        S: SolicitationStore + CopyStore + 'static,
    {
        let store: Arc<dyn SolicitationStore> = backend.clone();
        let copies: Arc<dyn CopyStore> = backend;
        Self {
            access: AccessControl::new(store.clone()),
            reconciler: FileReconciler::new(store.clone(), copies.clone(), files),
            store,
            copies,
            notifier: NotificationDispatcher::disabled(),
            validator: Arc::new(ExtensionValidator),
            clock: Arc::new(SystemClock),
            retention: chrono::Duration::hours(DEFAULT_RETENTION_HOURS),
        }
    }

    pub fn with_notifier(mut self, notifier: NotificationDispatcher) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn FileValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_retention(mut self, retention: chrono::Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn files(&self) -> &FileArea {
        self.reconciler.area()
    }

    fn folder_of(&self, solicitation: &Solicitation) -> PathBuf {
        self.files()
            .solicitation_dir(&solicitation.owner.registration, solicitation.id)
    }

    // -- queries -------------------------------------------------------------

    /// Restrict a filter to what `actor` may list: staff see everything,
    /// everyone else only their own solicitations.
    pub fn scope_filter(filter: SolicitationFilter, actor: &UserProfile) -> SolicitationFilter {
        if actor.role.is_staff() {
            filter
        } else {
            SolicitationFilter {
                owner_registration: Some(actor.registration.clone()),
                ..filter
            }
        }
    }

    /// All matching solicitations, id ascending.
    pub async fn find_all(&self, filter: &SolicitationFilter) -> CoreResult<Vec<Solicitation>> {
        self.store.list(filter).await
    }

    pub async fn find_page(
        &self,
        filter: &SolicitationFilter,
        request: &PageRequest,
    ) -> CoreResult<Page<Solicitation>> {
        self.store.page(filter, request).await
    }

    /// Load one solicitation for display.
    pub async fn view(&self, id: DbId, actor: &UserProfile) -> CoreResult<Solicitation> {
        self.access
            .can_interact(id, actor, EventType::RequestViewing)
            .await
    }

    // -- create / patch ------------------------------------------------------

    fn validate_uploads(&self, uploads: &[UploadedFile]) -> CoreResult<()> {
        for upload in uploads {
            self.validator
                .validate(&upload.file_name, &upload.bytes)
                .map_err(CoreError::Validation)?;
        }
        Ok(())
    }

    /// Open a new solicitation owned by `owner` and store its files.
    ///
    /// If storing the files fails the new record is deleted again.
    pub async fn create(
        &self,
        draft: SolicitationDraft,
        uploads: Vec<UploadedFile>,
        owner: &UserProfile,
    ) -> CoreResult<Solicitation> {
        draft.validate()?;
        self.validate_uploads(&uploads)?;
        if uploads.len() < draft.copies.len() {
            return Err(CoreError::Validation(format!(
                "Insufficient files: {} copies need an upload but {} files were received",
                draft.copies.len(),
                uploads.len()
            )));
        }

        let now = self.clock.now();
        let new = NewSolicitation {
            deadline: draft.deadline,
            owner: owner.clone(),
            creation_date: now,
            total_page_count: draft.total_page_count(),
            opening_event: NewEvent::new(EventType::RequestOpening, owner.clone(), now),
            copies: draft.copies,
        };
        let mut created = self.store.insert(&new).await?;

        if let Err(e) = self.reconciler.save_files(&mut created, &uploads, true).await {
            tracing::warn!(solicitation_id = created.id, error = %e, "Discarding solicitation after failed upload");
            let folder = self.folder_of(&created);
            self.files().remove_dir_best_effort(&folder).await;
            if let Err(cleanup) = self.store.delete(created.id).await {
                tracing::error!(solicitation_id = created.id, error = %cleanup, "Failed to discard solicitation");
            }
            return Err(e);
        }

        tracing::info!(
            solicitation_id = created.id,
            owner = %owner.registration,
            copies = created.copies.len(),
            "Solicitation created"
        );
        self.notifier.notify_latest_event(&created, owner).await;
        Ok(created)
    }

    /// Replace deadline and copies of an existing solicitation.
    ///
    /// Id, owner, dates and the archived flag always come from the stored
    /// record. Copies are matched by file name; new names need an upload,
    /// dropped names lose their files.
    pub async fn patch(
        &self,
        id: DbId,
        draft: SolicitationDraft,
        uploads: Vec<UploadedFile>,
        actor: &UserProfile,
    ) -> CoreResult<Solicitation> {
        draft.validate()?;
        self.validate_uploads(&uploads)?;
        let existing = self
            .access
            .can_interact(id, actor, EventType::RequestEditing)
            .await?;

        let copies = draft
            .copies
            .iter()
            .map(|d| match existing.copy(&d.file_name) {
                Some(current) => PrintCopy {
                    file_type: d.file_type.clone(),
                    page_count: d.page_count,
                    print_config: d.print_config.clone(),
                    notes: d.notes.clone(),
                    ..current.clone()
                },
                None => PrintCopy::from_draft(existing.id, d),
            })
            .collect();

        let mut merged = Solicitation {
            deadline: draft.deadline,
            copies,
            ..existing
        };
        merged.refresh_total_page_count();

        self.reconciler.save_files(&mut merged, &uploads, false).await?;

        let event = NewEvent::new(EventType::RequestEditing, actor.clone(), self.clock.now());
        let updated = self
            .store
            .update(&merged, &event)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Solicitation",
                id,
            })?;

        tracing::info!(solicitation_id = id, actor = %actor.registration, "Solicitation edited");
        self.notifier.notify_latest_event(&updated, actor).await;
        Ok(updated)
    }

    // -- status --------------------------------------------------------------

    /// Close an open solicitation or reopen a closed one.
    ///
    /// `notify` defaults to `true`.
    pub async fn toggle_conclusion_date(
        &self,
        id: DbId,
        notify: Option<bool>,
        actor: &UserProfile,
    ) -> CoreResult<Solicitation> {
        let mut solicitation = self
            .access
            .can_interact(id, actor, EventType::RequestToggle)
            .await?;
        if solicitation.archived {
            return Err(CoreError::Forbidden(format!(
                "Solicitation {id} is archived and its status can no longer change"
            )));
        }

        let now = self.clock.now();
        let event_type = if solicitation.is_concluded() {
            solicitation.conclusion_date = None;
            EventType::RequestOpening
        } else {
            solicitation.conclusion_date = Some(now);
            EventType::RequestClosing
        };

        let event = NewEvent::new(event_type, actor.clone(), now);
        let updated = self
            .store
            .update(&solicitation, &event)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Solicitation",
                id,
            })?;

        tracing::info!(solicitation_id = id, event = %event_type, actor = %actor.registration, "Solicitation status toggled");
        if notify.unwrap_or(true) {
            self.notifier.notify_latest_event(&updated, actor).await;
        }
        Ok(updated)
    }

    /// Delete a solicitation, its copies, its timeline and its folder.
    ///
    /// Folder removal is best-effort and never blocks the record deletion.
    pub async fn remove_request(
        &self,
        id: DbId,
        notify: bool,
        actor: &UserProfile,
    ) -> CoreResult<()> {
        let existing = self
            .access
            .can_interact(id, actor, EventType::RequestDeleting)
            .await?;
        let interested = existing.interested_users();

        self.files()
            .remove_dir_best_effort(&self.folder_of(&existing))
            .await;

        if !self.store.delete(id).await? {
            return Err(CoreError::NotFound {
                entity: "Solicitation",
                id,
            });
        }
        tracing::info!(solicitation_id = id, actor = %actor.registration, "Solicitation deleted");

        if notify {
            self.notifier
                .notify_loose_event(
                    id,
                    &interested,
                    actor,
                    EventType::RequestDeleting,
                    self.clock.now(),
                )
                .await;
        }
        Ok(())
    }

    /// Append a comment to the timeline.
    pub async fn add_comment(
        &self,
        id: DbId,
        text: &str,
        actor: &UserProfile,
    ) -> CoreResult<TimelineEvent> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::Validation("Comment must not be empty".into()));
        }
        self.access
            .can_interact(id, actor, EventType::Comment)
            .await?;

        let event = NewEvent::new(EventType::Comment, actor.clone(), self.clock.now())
            .with_content(text);
        self.store.append_event(id, &event).await
    }

    // -- files ---------------------------------------------------------------

    /// Open one attachment of a solicitation for download.
    pub async fn get_file(
        &self,
        actor: &UserProfile,
        id: DbId,
        file_name: &str,
    ) -> CoreResult<FileDownload> {
        let solicitation = self
            .access
            .can_interact(id, actor, EventType::RequestViewing)
            .await?;

        let copy = solicitation
            .copy(file_name)
            .ok_or_else(|| CoreError::FileNotFound {
                solicitation_id: id,
                file_name: file_name.to_string(),
            })?;
        if copy.is_physical_file {
            return Err(CoreError::PhysicalFile(format!(
                "'{file_name}' was handed in as a physical original and has no digital copy"
            )));
        }
        if !copy.file_in_disk {
            return Err(CoreError::Gone(format!(
                "'{file_name}' has been removed from storage"
            )));
        }

        let path = self.folder_of(&solicitation).join(&copy.file_name);
        let file = match self.files().open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(solicitation_id = id, file_name, "Copy flagged in disk but file is missing");
                return Err(CoreError::FileMissingOnDisk {
                    file_name: file_name.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();

        Ok(FileDownload {
            file_name: copy.file_name.clone(),
            content_type: copy.file_type.clone(),
            size,
            file,
        })
    }
}
