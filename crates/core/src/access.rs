//! Central authorization check for every entry point that touches a
//! solicitation.

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::solicitation::{EventType, Solicitation, UserProfile};
use crate::store::SolicitationStore;
use crate::types::DbId;

/// Message returned for every ownership failure; deliberately carries no
/// detail about why.
pub const NOT_AUTHORIZED: &str = "not authorized";

/// Decides whether an actor may view, edit, comment on or delete a
/// solicitation.
#[derive(Clone)]
pub struct AccessControl {
    store: Arc<dyn SolicitationStore>,
}

impl AccessControl {
    pub fn new(store: Arc<dyn SolicitationStore>) -> Self {
        Self { store }
    }

    /// Load the solicitation if `actor` may perform `event_type` on it.
    ///
    /// Checks run in order: existence (NotFound), archived + mutation
    /// (Forbidden), then ownership or staff role (Unauthorized).
    pub async fn can_interact(
        &self,
        solicitation_id: DbId,
        actor: &UserProfile,
        event_type: EventType,
    ) -> CoreResult<Solicitation> {
        let solicitation =
            self.store
                .find_by_id(solicitation_id)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "Solicitation",
                    id: solicitation_id,
                })?;
        check(&solicitation, actor, event_type)?;
        Ok(solicitation)
    }
}

/// The pure part of [`AccessControl::can_interact`].
pub fn check(solicitation: &Solicitation, actor: &UserProfile, event_type: EventType) -> CoreResult<()> {
    if event_type.is_mutation() && solicitation.archived {
        return Err(CoreError::Forbidden(format!(
            "Solicitation {} is archived and can no longer be changed",
            solicitation.id
        )));
    }
    if !solicitation.is_owned_by(actor) && !actor.role.is_staff() {
        return Err(CoreError::Unauthorized(NOT_AUTHORIZED.into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Role;
    use crate::solicitation::{CopyDraft, NewEvent, NewSolicitation, PrintConfig};
    use crate::store::memory::MemoryStore;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    fn user(registration: &str, role: Role) -> UserProfile {
        UserProfile {
            registration: registration.to_string(),
            name: format!("User {registration}"),
            email: format!("{registration}@example.edu"),
            role,
        }
    }

    async fn seeded(archived: bool) -> (AccessControl, DbId) {
        let store = Arc::new(MemoryStore::new());
        let owner = user("100", Role::User);
        let at = Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap();
        let mut created = store
            .insert(&NewSolicitation {
                deadline: 12,
                owner: owner.clone(),
                creation_date: at,
                total_page_count: 2,
                copies: vec![CopyDraft {
                    file_name: "a.pdf".into(),
                    file_type: "application/pdf".into(),
                    page_count: 2,
                    print_config: PrintConfig::default(),
                    notes: None,
                }],
                opening_event: NewEvent::new(EventType::RequestOpening, owner.clone(), at),
            })
            .await
            .unwrap();
        if archived {
            created.conclusion_date = Some(at);
            created.archived = true;
            store
                .update(
                    &created,
                    &NewEvent::new(EventType::RequestArchiving, UserProfile::system(), at),
                )
                .await
                .unwrap();
        }
        (AccessControl::new(store), created.id)
    }

    #[tokio::test]
    async fn missing_solicitation_is_not_found() {
        let (access, _) = seeded(false).await;
        let result = access
            .can_interact(999, &user("100", Role::User), EventType::RequestViewing)
            .await;
        assert_matches!(result, Err(CoreError::NotFound { id: 999, .. }));
    }

    #[tokio::test]
    async fn stranger_is_unauthorized_owner_and_staff_succeed() {
        let (access, id) = seeded(false).await;

        let stranger = access
            .can_interact(id, &user("200", Role::User), EventType::RequestViewing)
            .await;
        assert_matches!(stranger, Err(CoreError::Unauthorized(msg)) if msg == NOT_AUTHORIZED);

        assert!(access
            .can_interact(id, &user("100", Role::User), EventType::RequestViewing)
            .await
            .is_ok());
        assert!(access
            .can_interact(id, &user("300", Role::Admin), EventType::RequestEditing)
            .await
            .is_ok());
        assert!(access
            .can_interact(id, &user("400", Role::Manager), EventType::RequestDeleting)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn archived_blocks_mutations_but_not_viewing() {
        let (access, id) = seeded(true).await;
        let owner = user("100", Role::User);

        assert_matches!(
            access.can_interact(id, &owner, EventType::RequestEditing).await,
            Err(CoreError::Forbidden(_))
        );
        assert_matches!(
            access.can_interact(id, &owner, EventType::RequestDeleting).await,
            Err(CoreError::Forbidden(_))
        );
        assert!(access
            .can_interact(id, &owner, EventType::RequestViewing)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn archived_check_precedes_ownership() {
        let (access, id) = seeded(true).await;
        let result = access
            .can_interact(id, &user("200", Role::User), EventType::RequestEditing)
            .await;
        assert_matches!(result, Err(CoreError::Forbidden(_)));
    }
}
