//! Collaboration service layer.
//!
//! Coordinates exclusive editing access to shared packages and the graph
//! of who may collaborate with whom. The route layer calls the operations
//! on [`LeaseManager`] and [`CollaborationGraph`]; each executes inside
//! one unit of work against the PostgreSQL store.

pub mod config;
pub mod error;
pub mod graph;
pub mod lease;
pub mod mailer;
pub mod registry;
pub mod seed;
pub mod sweep;
pub mod views;

pub use config::{CollabConfig, GroupSeed};
pub use error::{ServiceError, ServiceResult};
pub use graph::CollaborationGraph;
pub use lease::LeaseManager;
