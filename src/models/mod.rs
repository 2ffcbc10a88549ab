//! # Domain Model
//!
//! Typed representations of the entities the ingestion core persists and
//! reports on: authority references resolved from the external authority
//! service, cultural objects with their derived identities, and the import
//! job aggregate that tracks one batch through its lifecycle.

pub mod authority;
pub mod cultural_object;
pub mod import_job;

pub use authority::{AuthorityReference, INSTITUTION_TYPE_NAME, PLACE_TYPE_NAME};
pub use cultural_object::{CulturalObject, Identification, IdentificationKind};
pub use import_job::{DataEntity, ImportFile, ImportJob};
