//! Solicitation aggregate: the print request, its copies and its timeline.
//!
//! A [`Solicitation`] owns its [`PrintCopy`] records and [`TimelineEvent`]s
//! exclusively; both are created and deleted together with it. The timeline is
//! kept newest-first.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::roles::Role;
use crate::types::{DbId, Timestamp};

/// Smallest accepted deadline, in hours.
pub const MIN_DEADLINE_HOURS: i32 = 1;

/// Largest accepted deadline, in hours.
pub const MAX_DEADLINE_HOURS: i32 = 48;

/// Registration used by the synthetic actor of automated jobs.
pub const SYSTEM_REGISTRATION: &str = "SYSTEM";

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identity of a person (or the system) acting on a solicitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub registration: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl UserProfile {
    /// The synthetic actor recorded on automated events. Has no email.
    pub fn system() -> Self {
        Self {
            registration: SYSTEM_REGISTRATION.to_string(),
            name: SYSTEM_REGISTRATION.to_string(),
            email: String::new(),
            role: Role::System,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Kind of timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Comment,
    RequestOpening,
    RequestClosing,
    RequestToggle,
    RequestArchiving,
    RequestEditing,
    RequestDeleting,
    RequestViewing,
}

impl EventType {
    /// Stored name (`"REQUEST_OPENING"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::Comment => "COMMENT",
            Self::RequestOpening => "REQUEST_OPENING",
            Self::RequestClosing => "REQUEST_CLOSING",
            Self::RequestToggle => "REQUEST_TOGGLE",
            Self::RequestArchiving => "REQUEST_ARCHIVING",
            Self::RequestEditing => "REQUEST_EDITING",
            Self::RequestDeleting => "REQUEST_DELETING",
            Self::RequestViewing => "REQUEST_VIEWING",
        }
    }

    /// Parse from the stored name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "COMMENT" => Ok(Self::Comment),
            "REQUEST_OPENING" => Ok(Self::RequestOpening),
            "REQUEST_CLOSING" => Ok(Self::RequestClosing),
            "REQUEST_TOGGLE" => Ok(Self::RequestToggle),
            "REQUEST_ARCHIVING" => Ok(Self::RequestArchiving),
            "REQUEST_EDITING" => Ok(Self::RequestEditing),
            "REQUEST_DELETING" => Ok(Self::RequestDeleting),
            "REQUEST_VIEWING" => Ok(Self::RequestViewing),
            other => Err(CoreError::Validation(format!("Unknown event type '{other}'"))),
        }
    }

    /// Edits and deletions are refused once a solicitation is archived.
    pub fn is_mutation(self) -> bool {
        matches!(self, Self::RequestEditing | Self::RequestDeleting)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An immutable timeline entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: DbId,
    pub solicitation_id: DbId,
    pub user: UserProfile,
    pub event_type: EventType,
    pub content: Option<String>,
    pub creation_date: Timestamp,
}

/// An event that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub event_type: EventType,
    pub user: UserProfile,
    pub content: Option<String>,
    pub creation_date: Timestamp,
}

impl NewEvent {
    pub fn new(event_type: EventType, user: UserProfile, at: Timestamp) -> Self {
        Self {
            event_type,
            user,
            content: None,
            creation_date: at,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Print configuration and copies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageLayout {
    #[default]
    Portrait,
    Landscape,
}

/// How a single copy should be printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintConfig {
    /// Number of printed copies of the file.
    pub copies: i32,
    /// Page range spec such as `"1-3,7"`. `None` prints every page.
    pub pages: Option<String>,
    pub layout: PageLayout,
    pub duplex: bool,
    pub colored: bool,
    pub pages_per_sheet: i32,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            copies: 1,
            pages: None,
            layout: PageLayout::Portrait,
            duplex: false,
            colored: false,
            pages_per_sheet: 1,
        }
    }
}

/// One requested file/printout within a solicitation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintCopy {
    pub id: DbId,
    pub solicitation_id: DbId,
    pub file_name: String,
    pub file_type: String,
    pub page_count: i32,
    pub print_config: PrintConfig,
    /// A digital file currently exists on disk for this copy.
    pub file_in_disk: bool,
    /// No digital file was ever attached; the owner brings a physical original.
    pub is_physical_file: bool,
    pub notes: Option<String>,
}

impl PrintCopy {
    /// Build an unsaved copy (id `0`) from a draft, with no file recorded yet.
    pub fn from_draft(solicitation_id: DbId, draft: &CopyDraft) -> Self {
        Self {
            id: 0,
            solicitation_id,
            file_name: draft.file_name.clone(),
            file_type: draft.file_type.clone(),
            page_count: draft.page_count,
            print_config: draft.print_config.clone(),
            file_in_disk: false,
            is_physical_file: false,
            notes: draft.notes.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Solicitation
// ---------------------------------------------------------------------------

/// A print request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solicitation {
    pub id: DbId,
    /// Hours the print shop has to fulfil the request.
    pub deadline: i32,
    pub creation_date: Timestamp,
    /// `None` while open; set when the request is closed.
    pub conclusion_date: Option<Timestamp>,
    /// Set only by the stale sweep; never cleared.
    pub archived: bool,
    pub owner: UserProfile,
    pub total_page_count: i32,
    pub copies: Vec<PrintCopy>,
    /// Newest first.
    pub timeline: Vec<TimelineEvent>,
}

impl Solicitation {
    pub fn is_concluded(&self) -> bool {
        self.conclusion_date.is_some()
    }

    pub fn copy(&self, file_name: &str) -> Option<&PrintCopy> {
        self.copies.iter().find(|c| c.file_name == file_name)
    }

    pub fn copy_mut(&mut self, file_name: &str) -> Option<&mut PrintCopy> {
        self.copies.iter_mut().find(|c| c.file_name == file_name)
    }

    /// Whether `user` owns this solicitation (compared by registration).
    pub fn is_owned_by(&self, user: &UserProfile) -> bool {
        self.owner.registration == user.registration
    }

    /// Distinct actors appearing anywhere in the timeline, in order of first
    /// appearance (newest event first).
    pub fn interested_users(&self) -> Vec<UserProfile> {
        let mut seen = HashSet::new();
        self.timeline
            .iter()
            .filter(|e| seen.insert(e.user.registration.clone()))
            .map(|e| e.user.clone())
            .collect()
    }

    /// Recompute [`total_page_count`](Self::total_page_count) from the copies.
    pub fn refresh_total_page_count(&mut self) {
        self.total_page_count = self
            .copies
            .iter()
            .map(|c| c.page_count * c.print_config.copies)
            .sum();
    }
}

// ---------------------------------------------------------------------------
// Drafts (client input)
// ---------------------------------------------------------------------------

/// Client-supplied description of one copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyDraft {
    pub file_name: String,
    pub file_type: String,
    pub page_count: i32,
    #[serde(default)]
    pub print_config: PrintConfig,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Client-supplied body for create and patch.
///
/// Only `deadline` and `copies` are client-settable; identity, dates and the
/// archived flag always come from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolicitationDraft {
    pub deadline: i32,
    pub copies: Vec<CopyDraft>,
}

impl SolicitationDraft {
    /// Check the invariants a request must satisfy before it is stored.
    pub fn validate(&self) -> CoreResult<()> {
        if !(MIN_DEADLINE_HOURS..=MAX_DEADLINE_HOURS).contains(&self.deadline) {
            return Err(CoreError::Validation(format!(
                "Deadline must be between {MIN_DEADLINE_HOURS} and {MAX_DEADLINE_HOURS} hours, got {}",
                self.deadline
            )));
        }
        if self.copies.is_empty() {
            return Err(CoreError::Validation(
                "A solicitation needs at least one copy".into(),
            ));
        }

        let mut names = HashSet::new();
        for copy in &self.copies {
            if copy.file_name.trim().is_empty() {
                return Err(CoreError::Validation("Copy file name must not be empty".into()));
            }
            if copy.file_name.contains(['/', '\\']) || copy.file_name.contains("..") {
                return Err(CoreError::Validation(format!(
                    "Copy file name '{}' must not contain path separators",
                    copy.file_name
                )));
            }
            if !names.insert(copy.file_name.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Duplicate file name '{}' in solicitation",
                    copy.file_name
                )));
            }
            if copy.page_count < 1 {
                return Err(CoreError::Validation(format!(
                    "Page count of '{}' must be positive, got {}",
                    copy.file_name, copy.page_count
                )));
            }
            if copy.print_config.copies < 1 {
                return Err(CoreError::Validation(format!(
                    "Number of copies of '{}' must be positive, got {}",
                    copy.file_name, copy.print_config.copies
                )));
            }
        }
        Ok(())
    }

    pub fn total_page_count(&self) -> i32 {
        self.copies
            .iter()
            .map(|c| c.page_count * c.print_config.copies)
            .sum()
    }
}

/// Everything needed to insert a new solicitation in one unit of work.
#[derive(Debug, Clone)]
pub struct NewSolicitation {
    pub deadline: i32,
    pub owner: UserProfile,
    pub creation_date: Timestamp,
    pub total_page_count: i32,
    pub copies: Vec<CopyDraft>,
    pub opening_event: NewEvent,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
