//! Tessera Processing Library
//!
//! Intake-side logic that runs before any I/O: admission checks on raw files
//! and routing of admitted candidates to a storage bucket.

pub mod intake;
pub mod router;
pub mod validator;

pub use intake::{Admission, FileIntake};
pub use router::BucketRouter;
pub use validator::{FileValidator, ValidationError};
