//! External delivery channels for solicitation notifications.

pub mod email;
