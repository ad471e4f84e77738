//! Print-request domain: model, access rules, file reconciliation, lifecycle
//! orchestration, notifications and the stale-file sweep.
//!
//! This crate has no database or HTTP dependencies. Persistence is reached
//! through the traits in [`store`]; the PostgreSQL implementation lives in
//! `printdesk_db` and an in-memory one in [`store::memory`].

pub mod access;
pub mod clock;
pub mod error;
pub mod notify;
pub mod query;
pub mod reconciler;
pub mod roles;
pub mod service;
pub mod solicitation;
pub mod storage;
pub mod store;
pub mod sweep;
pub mod types;
pub mod validation;
