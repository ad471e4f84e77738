//! File reconciliation for create and edit.
//!
//! On create every copy needs a file. On edit the incoming copy set is diffed
//! against the stored one by file name: new names need an upload, vanished
//! names have their files deleted. Uploads pair with copies by position.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::solicitation::{PrintCopy, Solicitation};
use crate::storage::FileArea;
use crate::store::{CopyStore, SolicitationStore};
use crate::types::DbId;

/// One uploaded attachment, already accepted by the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// What a [`FileReconciler::save_files`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Digital files written to disk.
    pub written: usize,
    /// Copies recorded as physical originals (zero-byte uploads).
    pub physical: usize,
    /// Files of removed copies deleted from disk.
    pub deleted: usize,
    /// More uploads than copies needing one; nothing was touched.
    pub skipped: bool,
}

/// Names of incoming copies absent from `base` (in incoming order) and the
/// base copies absent from `incoming`.
pub fn plan(base: &[PrintCopy], incoming: &[PrintCopy]) -> (Vec<String>, Vec<PrintCopy>) {
    let base_names: HashSet<&str> = base.iter().map(|c| c.file_name.as_str()).collect();
    let incoming_names: HashSet<&str> = incoming.iter().map(|c| c.file_name.as_str()).collect();

    let to_upload = incoming
        .iter()
        .filter(|c| !base_names.contains(c.file_name.as_str()))
        .map(|c| c.file_name.clone())
        .collect();
    let to_delete = base
        .iter()
        .filter(|c| !incoming_names.contains(c.file_name.as_str()))
        .cloned()
        .collect();
    (to_upload, to_delete)
}

/// Writes and deletes solicitation files and keeps copy flags in step.
#[derive(Clone)]
pub struct FileReconciler {
    store: Arc<dyn SolicitationStore>,
    copies: Arc<dyn CopyStore>,
    area: FileArea,
}

impl FileReconciler {
    pub fn new(
        store: Arc<dyn SolicitationStore>,
        copies: Arc<dyn CopyStore>,
        area: FileArea,
    ) -> Self {
        Self {
            store,
            copies,
            area,
        }
    }

    pub fn area(&self) -> &FileArea {
        &self.area
    }

    /// Store the uploaded files of `solicitation` and update its copy flags
    /// in place and in the copy store.
    ///
    /// - Fewer uploads than copies needing one is a validation error.
    /// - More uploads than copies needing one is treated as a no-op.
    /// - A write failure deletes every file written by this call and returns
    ///   the error.
    /// - On edit, files of copies removed from the request are deleted
    ///   whether or not the writes succeeded.
    pub async fn save_files(
        &self,
        solicitation: &mut Solicitation,
        uploads: &[UploadedFile],
        is_new: bool,
    ) -> CoreResult<ReconcileReport> {
        let (to_upload, to_delete, owner_registration) = if is_new {
            let names = solicitation
                .copies
                .iter()
                .map(|c| c.file_name.clone())
                .collect();
            (names, Vec::new(), solicitation.owner.registration.clone())
        } else {
            let base = self
                .store
                .find_by_id(solicitation.id)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "Solicitation",
                    id: solicitation.id,
                })?;
            let (to_upload, to_delete) = plan(&base.copies, &solicitation.copies);
            (to_upload, to_delete, base.owner.registration)
        };

        if uploads.len() < to_upload.len() {
            return Err(CoreError::Validation(format!(
                "Insufficient files: {} copies need an upload but {} files were received",
                to_upload.len(),
                uploads.len()
            )));
        }
        if uploads.len() > to_upload.len() {
            tracing::warn!(
                solicitation_id = solicitation.id,
                expected = to_upload.len(),
                received = uploads.len(),
                "More uploads than new copies, leaving files untouched"
            );
            return Ok(ReconcileReport {
                skipped: true,
                ..Default::default()
            });
        }

        let dir = self
            .area
            .solicitation_dir(&owner_registration, solicitation.id);
        let mut report = ReconcileReport::default();
        let mut written = Vec::new();

        let result = self
            .write_all(solicitation, &to_upload, uploads, &dir, &mut written, &mut report)
            .await;

        if let Err(e) = &result {
            tracing::error!(
                solicitation_id = solicitation.id,
                error = %e,
                rolled_back = written.len(),
                "Upload failed, removing files written so far"
            );
            let rolled_back: Vec<PrintCopy> = written
                .iter()
                .filter_map(|name| solicitation.copy(name).cloned())
                .collect();
            self.delete_files(solicitation.id, &rolled_back, &dir).await;
            for name in &written {
                if let Some(copy) = solicitation.copy_mut(name) {
                    copy.file_in_disk = false;
                }
            }
            report.written = 0;
        }

        if !is_new {
            report.deleted = self.delete_files(solicitation.id, &to_delete, &dir).await;
        }

        result.map(|()| report)
    }

    async fn write_all(
        &self,
        solicitation: &mut Solicitation,
        to_upload: &[String],
        uploads: &[UploadedFile],
        dir: &Path,
        written: &mut Vec<String>,
        report: &mut ReconcileReport,
    ) -> CoreResult<()> {
        if to_upload.is_empty() {
            return Ok(());
        }
        self.area.ensure_dir(dir).await?;

        for (name, upload) in to_upload.iter().zip(uploads) {
            let copy = solicitation.copy_mut(name).ok_or_else(|| {
                CoreError::Internal(format!("copy '{name}' disappeared during upload"))
            })?;

            if upload.bytes.is_empty() {
                copy.file_in_disk = false;
                copy.is_physical_file = true;
                report.physical += 1;
            } else {
                self.area.write(&dir.join(&copy.file_name), &upload.bytes).await?;
                written.push(name.clone());
                copy.file_in_disk = true;
                copy.is_physical_file = false;
                report.written += 1;
            }

            let saved = self.copies.save_copy(copy).await?;
            copy.id = saved.id;
            tracing::debug!(
                solicitation_id = copy.solicitation_id,
                file_name = %copy.file_name,
                file_in_disk = copy.file_in_disk,
                "Copy saved"
            );
        }
        Ok(())
    }

    /// Delete the files of `copies` under `dir` and mark each copy as not in
    /// disk. Missing files and I/O failures are logged and skipped.
    ///
    /// Returns the number of files actually deleted.
    pub async fn delete_files(
        &self,
        solicitation_id: DbId,
        copies: &[PrintCopy],
        dir: &Path,
    ) -> usize {
        let mut deleted = 0;
        for copy in copies {
            let path = dir.join(&copy.file_name);
            match self.area.remove_file(&path).await {
                Ok(true) => deleted += 1,
                Ok(false) => {
                    tracing::warn!(
                        solicitation_id,
                        file_name = %copy.file_name,
                        "File to delete was not on disk"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        solicitation_id,
                        file_name = %copy.file_name,
                        error = %e,
                        "Failed to delete file"
                    );
                }
            }
            if let Err(e) = self
                .copies
                .mark_not_in_disk(solicitation_id, &copy.file_name)
                .await
            {
                tracing::warn!(
                    solicitation_id,
                    file_name = %copy.file_name,
                    error = %e,
                    "Failed to record file removal"
                );
            }
        }
        deleted
    }
}
