//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&mut PgConnection` as the first argument, so calls compose
//! inside one [`crate::uow::UnitOfWork`] transaction.

pub mod collaboration_repo;
pub mod group_repo;
pub mod invitation_repo;
pub mod lock_repo;
pub mod package_repo;
pub mod user_repo;

pub use collaboration_repo::{CollaborationRepo, CollaborationStatusRepo, GroupCollaborationRepo};
pub use group_repo::{MembershipRepo, UserGroupRepo};
pub use invitation_repo::InvitationRepo;
pub use lock_repo::{GroupLockRepo, LockRepo};
pub use package_repo::PackageRepo;
pub use user_repo::UserRepo;
