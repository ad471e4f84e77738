//! Row structs for the `solicitations`, `solicitation_copies` and
//! `solicitation_events` tables and their conversion into the domain
//! aggregate.

use printdesk_core::error::CoreResult;
use printdesk_core::roles::Role;
use printdesk_core::solicitation::{
    EventType, PrintConfig, PrintCopy, Solicitation, TimelineEvent, UserProfile,
};
use printdesk_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Solicitation
// ---------------------------------------------------------------------------

/// A row from the `solicitations` table.
#[derive(Debug, Clone, FromRow)]
pub struct SolicitationRow {
    pub id: DbId,
    pub deadline: i32,
    pub creation_date: Timestamp,
    pub conclusion_date: Option<Timestamp>,
    pub archived: bool,
    pub owner_registration: String,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_role: String,
    pub total_page_count: i32,
}

impl SolicitationRow {
    /// Assemble the aggregate from this row plus its already-converted
    /// children.
    pub fn into_domain(
        self,
        copies: Vec<PrintCopy>,
        timeline: Vec<TimelineEvent>,
    ) -> CoreResult<Solicitation> {
        Ok(Solicitation {
            id: self.id,
            deadline: self.deadline,
            creation_date: self.creation_date,
            conclusion_date: self.conclusion_date,
            archived: self.archived,
            owner: profile(
                self.owner_registration,
                self.owner_name,
                self.owner_email,
                &self.owner_role,
            )?,
            total_page_count: self.total_page_count,
            copies,
            timeline,
        })
    }
}

fn profile(registration: String, name: String, email: String, role: &str) -> CoreResult<UserProfile> {
    Ok(UserProfile {
        registration,
        name,
        email,
        role: Role::from_name(role)?,
    })
}

// ---------------------------------------------------------------------------
// Copy
// ---------------------------------------------------------------------------

/// A row from the `solicitation_copies` table.
#[derive(Debug, Clone, FromRow)]
pub struct CopyRow {
    pub id: DbId,
    pub solicitation_id: DbId,
    pub file_name: String,
    pub file_type: String,
    pub page_count: i32,
    pub print_config: Json<PrintConfig>,
    pub file_in_disk: bool,
    pub is_physical_file: bool,
    pub notes: Option<String>,
}

impl From<CopyRow> for PrintCopy {
    fn from(row: CopyRow) -> Self {
        Self {
            id: row.id,
            solicitation_id: row.solicitation_id,
            file_name: row.file_name,
            file_type: row.file_type,
            page_count: row.page_count,
            print_config: row.print_config.0,
            file_in_disk: row.file_in_disk,
            is_physical_file: row.is_physical_file,
            notes: row.notes,
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A row from the `solicitation_events` table.
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: DbId,
    pub solicitation_id: DbId,
    pub event_type: String,
    pub content: Option<String>,
    pub creation_date: Timestamp,
    pub actor_registration: String,
    pub actor_name: String,
    pub actor_email: String,
    pub actor_role: String,
}

impl TryFrom<EventRow> for TimelineEvent {
    type Error = printdesk_core::error::CoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            solicitation_id: row.solicitation_id,
            event_type: EventType::from_name(&row.event_type)?,
            content: row.content,
            creation_date: row.creation_date,
            user: profile(
                row.actor_registration,
                row.actor_name,
                row.actor_email,
                &row.actor_role,
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event_row(event_type: &str, role: &str) -> EventRow {
        EventRow {
            id: 3,
            solicitation_id: 1,
            event_type: event_type.into(),
            content: Some("hello".into()),
            creation_date: Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap(),
            actor_registration: "2021001".into(),
            actor_name: "Ana".into(),
            actor_email: "ana@example.edu".into(),
            actor_role: role.into(),
        }
    }

    #[test]
    fn event_row_converts() {
        let event = TimelineEvent::try_from(event_row("COMMENT", "user")).unwrap();
        assert_eq!(event.event_type, EventType::Comment);
        assert_eq!(event.user.role, Role::User);
        assert_eq!(event.content.as_deref(), Some("hello"));
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        assert!(TimelineEvent::try_from(event_row("REQUEST_EXPLODING", "user")).is_err());
        assert!(TimelineEvent::try_from(event_row("COMMENT", "wizard")).is_err());
    }

    #[test]
    fn copy_row_unwraps_json_config() {
        let row = CopyRow {
            id: 9,
            solicitation_id: 1,
            file_name: "a.pdf".into(),
            file_type: "application/pdf".into(),
            page_count: 4,
            print_config: Json(PrintConfig {
                copies: 3,
                duplex: true,
                ..Default::default()
            }),
            file_in_disk: true,
            is_physical_file: false,
            notes: None,
        };
        let copy = PrintCopy::from(row);
        assert_eq!(copy.print_config.copies, 3);
        assert!(copy.print_config.duplex);
        assert!(copy.file_in_disk);
    }

    #[test]
    fn solicitation_row_assembles_aggregate() {
        let row = SolicitationRow {
            id: 1,
            deadline: 12,
            creation_date: Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap(),
            conclusion_date: None,
            archived: false,
            owner_registration: "2021001".into(),
            owner_name: "Ana".into(),
            owner_email: "ana@example.edu".into(),
            owner_role: "manager".into(),
            total_page_count: 8,
        };
        let s = row.into_domain(Vec::new(), Vec::new()).unwrap();
        assert_eq!(s.owner.role, Role::Manager);
        assert_eq!(s.deadline, 12);
    }
}
