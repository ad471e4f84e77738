//! Authentication primitives.
//!
//! - [`jwt`] -- validation of the access tokens issued by the identity provider.

pub mod jwt;
