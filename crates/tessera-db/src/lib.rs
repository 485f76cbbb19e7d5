//! Tessera database layer
//!
//! Holds the relational metadata collaborator: the [`DescriptorStore`] contract
//! used by the metadata committer, and its PostgreSQL implementation.

pub mod descriptor;
pub mod setup;

pub use descriptor::{DescriptorStore, PgDescriptorRepository};
pub use setup::setup_database;
