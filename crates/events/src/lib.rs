//! Outbound notification delivery for PrintDesk.
//!
//! - [`delivery::email`]: SMTP delivery implementing
//!   [`NotificationSink`](printdesk_core::notify::NotificationSink).

pub mod delivery;

pub use delivery::email::{EmailConfig, EmailDelivery};
