//! Row structs and DTOs.
//!
//! Each submodule contains `FromRow` + `Serialize` entity structs matching
//! the database rows, plus the create DTOs and joined detail structs the
//! service layer reads.

pub mod collaboration;
pub mod group;
pub mod invitation;
pub mod lock;
pub mod package;
pub mod user;
