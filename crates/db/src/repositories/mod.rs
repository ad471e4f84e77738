//! Zero-sized repositories, one per table.

pub mod copy_repo;
pub mod event_repo;
pub mod solicitation_repo;

pub use copy_repo::CopyRepo;
pub use event_repo::EventRepo;
pub use solicitation_repo::SolicitationRepo;
