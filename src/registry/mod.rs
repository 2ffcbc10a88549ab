//! # Identity Registry
//!
//! Derives stable, content-addressed identities for cultural objects and
//! parses the signature-list input format. Identity derivation is a pure
//! hash computation: re-submitting the same (place, institution, primary
//! signature) triple always yields the same identifier, which makes
//! registration an idempotent upsert rather than a source of duplicates.

pub mod identity;
pub mod signature;

use thiserror::Error;

pub use identity::{check_batch_unique, derive_identity, register, OBJECT_ID_PREFIX};
pub use signature::parse_signature_line;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("malformed signature line cell: {line}")]
    MalformedSignatureLine { line: String },

    #[error("primary signature is empty")]
    EmptyPrimarySignature,

    #[error("no signatures provided")]
    NoSignatures,

    #[error("primary signature occurs more than once in batch: {signature}")]
    DuplicateSignature { signature: String },
}
