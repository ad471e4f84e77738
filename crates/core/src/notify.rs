//! Deciding whether and whom to notify after a timeline event.
//!
//! Delivery itself is behind [`NotificationSink`]; the SMTP implementation
//! lives in `printdesk_events`. Send failures are logged and never reach the
//! caller.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::solicitation::{EventType, Solicitation, TimelineEvent, UserProfile};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Delivery failure reported by a [`NotificationSink`].
#[derive(Debug, thiserror::Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// One message addressed to several recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Something that can deliver a [`Notification`].
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

// ---------------------------------------------------------------------------
// Event selection
// ---------------------------------------------------------------------------

/// Event types that produce a notification.
const NOTIFYING_EVENTS: [EventType; 4] = [
    EventType::RequestOpening,
    EventType::RequestClosing,
    EventType::RequestEditing,
    EventType::RequestDeleting,
];

pub fn is_notifying(event_type: EventType) -> bool {
    NOTIFYING_EVENTS.contains(&event_type)
}

/// The event with the greatest creation date, or `None` for an empty
/// timeline. Ties go to the highest id.
pub fn latest_event(solicitation: &Solicitation) -> Option<&TimelineEvent> {
    solicitation
        .timeline
        .iter()
        .max_by(|a, b| {
            a.creation_date
                .cmp(&b.creation_date)
                .then(a.id.cmp(&b.id))
        })
}

/// Distinct non-empty emails of `users`, in order.
pub fn recipients(users: &[UserProfile]) -> Vec<String> {
    let mut seen = HashSet::new();
    users
        .iter()
        .map(|u| u.email.trim())
        .filter(|e| !e.is_empty())
        .filter(|e| seen.insert(e.to_string()))
        .map(str::to_string)
        .collect()
}

fn compose(
    solicitation_id: DbId,
    event_type: EventType,
    actor: &UserProfile,
    at: Timestamp,
    content: Option<&str>,
) -> (String, String) {
    let subject = format!("[PrintDesk] Solicitation #{solicitation_id}: {event_type}");
    let mut body = format!(
        "Solicitation: #{solicitation_id}\nEvent: {event_type}\nBy: {} ({})\nAt: {}",
        actor.name,
        actor.registration,
        at.to_rfc3339()
    );
    if let Some(content) = content.filter(|c| !c.is_empty()) {
        body.push_str("\n\n");
        body.push_str(content);
    }
    (subject, body)
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Sends event notifications to everyone who has taken part in a
/// solicitation. Without a sink every call is a logged no-op.
#[derive(Clone, Default)]
pub struct NotificationDispatcher {
    sink: Option<Arc<dyn NotificationSink>>,
}

impl NotificationDispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Notify interested users about the most recent timeline event, if it
    /// is one of the notifying types. The triggering user is not excluded.
    ///
    /// Returns whether a message was handed to the sink successfully.
    pub async fn notify_latest_event(
        &self,
        solicitation: &Solicitation,
        triggering: &UserProfile,
    ) -> bool {
        let Some(event) = latest_event(solicitation) else {
            return false;
        };
        if !is_notifying(event.event_type) {
            return false;
        }
        let (subject, body) = compose(
            solicitation.id,
            event.event_type,
            &event.user,
            event.creation_date,
            event.content.as_deref(),
        );
        self.deliver(
            solicitation.id,
            &solicitation.interested_users(),
            triggering,
            subject,
            body,
        )
        .await
    }

    /// Same as [`notify_latest_event`](Self::notify_latest_event) for a
    /// solicitation that no longer exists. `interested` must be captured by
    /// the caller before the record was removed.
    pub async fn notify_loose_event(
        &self,
        solicitation_id: DbId,
        interested: &[UserProfile],
        triggering: &UserProfile,
        event_type: EventType,
        at: Timestamp,
    ) -> bool {
        if !is_notifying(event_type) {
            return false;
        }
        let (subject, body) = compose(solicitation_id, event_type, triggering, at, None);
        self.deliver(solicitation_id, interested, triggering, subject, body)
            .await
    }

    async fn deliver(
        &self,
        solicitation_id: DbId,
        interested: &[UserProfile],
        triggering: &UserProfile,
        subject: String,
        body: String,
    ) -> bool {
        let Some(sink) = &self.sink else {
            tracing::debug!(solicitation_id, "No notification sink configured");
            return false;
        };
        let recipients = recipients(interested);
        if recipients.is_empty() {
            return false;
        }

        let notification = Notification {
            recipients,
            subject,
            body,
        };
        match sink.send(&notification).await {
            Ok(()) => {
                tracing::info!(
                    solicitation_id,
                    triggered_by = %triggering.registration,
                    recipients = notification.recipients.len(),
                    "Notification sent"
                );
                true
            }
            Err(e) => {
                tracing::error!(solicitation_id, error = %e, "Failed to send notification");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::roles::Role;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Mutex;

    /// Sink that records every message, optionally failing instead.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub sent: Mutex<Vec<Notification>>,
        pub fail: bool,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError("smtp down".into()));
            }
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn user(registration: &str, email: &str) -> UserProfile {
        UserProfile {
            registration: registration.into(),
            name: format!("User {registration}"),
            email: email.into(),
            role: Role::User,
        }
    }

    fn event(id: DbId, t: EventType, who: UserProfile, minutes: i64) -> TimelineEvent {
        TimelineEvent {
            id,
            solicitation_id: 7,
            user: who,
            event_type: t,
            content: None,
            creation_date: Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    fn solicitation(timeline: Vec<TimelineEvent>) -> Solicitation {
        Solicitation {
            id: 7,
            deadline: 24,
            creation_date: Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap(),
            conclusion_date: None,
            archived: false,
            owner: user("a", "a@x.edu"),
            total_page_count: 1,
            copies: Vec::new(),
            timeline,
        }
    }

    #[test]
    fn latest_event_is_max_creation_date() {
        let s = solicitation(vec![
            event(1, EventType::RequestOpening, user("a", "a@x.edu"), 0),
            event(3, EventType::Comment, user("b", "b@x.edu"), 30),
            event(2, EventType::RequestEditing, user("a", "a@x.edu"), 10),
        ]);
        assert_eq!(latest_event(&s).unwrap().id, 3);
        assert!(latest_event(&solicitation(Vec::new())).is_none());
    }

    #[test]
    fn recipients_are_distinct_and_non_empty() {
        let users = [
            user("a", "a@x.edu"),
            user("b", ""),
            user("c", "a@x.edu"),
            user("d", "d@x.edu"),
        ];
        assert_eq!(recipients(&users), vec!["a@x.edu", "d@x.edu"]);
    }

    #[tokio::test]
    async fn notifies_all_interested_users_including_trigger() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = NotificationDispatcher::new(sink.clone());
        let staff = user("s", "s@x.edu");
        let s = solicitation(vec![
            event(2, EventType::RequestClosing, staff.clone(), 20),
            event(1, EventType::RequestOpening, user("a", "a@x.edu"), 0),
        ]);

        assert!(dispatcher.notify_latest_event(&s, &staff).await);

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipients, vec!["s@x.edu", "a@x.edu"]);
        assert!(sent[0].subject.contains("#7"));
        assert!(sent[0].body.contains("REQUEST_CLOSING"));
    }

    #[tokio::test]
    async fn comments_and_archiving_do_not_notify() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = NotificationDispatcher::new(sink.clone());
        let a = user("a", "a@x.edu");

        for t in [EventType::Comment, EventType::RequestArchiving, EventType::RequestViewing] {
            let s = solicitation(vec![event(1, t, a.clone(), 0)]);
            assert!(!dispatcher.notify_latest_event(&s, &a).await);
        }
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_failure_is_swallowed() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let dispatcher = NotificationDispatcher::new(sink);
        let a = user("a", "a@x.edu");
        let s = solicitation(vec![event(1, EventType::RequestOpening, a.clone(), 0)]);
        assert!(!dispatcher.notify_latest_event(&s, &a).await);
    }

    #[tokio::test]
    async fn loose_event_uses_captured_users() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = NotificationDispatcher::new(sink.clone());
        let admin = user("adm", "adm@x.edu");
        let captured = [user("a", "a@x.edu"), admin.clone()];
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 9, 0, 0).unwrap();

        assert!(
            dispatcher
                .notify_loose_event(7, &captured, &admin, EventType::RequestDeleting, at)
                .await
        );
        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent[0].recipients, vec!["a@x.edu", "adm@x.edu"]);
        assert!(sent[0].body.contains("REQUEST_DELETING"));
    }
}
