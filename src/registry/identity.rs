//! Content-addressed identity derivation and object registration.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::RegistryError;
use crate::models::{AuthorityReference, CulturalObject, Identification, IdentificationKind};

/// Fixed namespace prefix of every derived cultural-object identifier.
pub const OBJECT_ID_PREFIX: &str = "MS-";

/// Derive the stable identifier of a cultural object.
///
/// The identifier is a pure function of its three inputs: a name-based
/// UUID over the UTF-8 bytes of `<place.id>$<institution.id>$<primary>`,
/// carrying the fixed namespace prefix. Re-importing the same triple
/// yields the same identifier.
pub fn derive_identity(
    place: &AuthorityReference,
    institution: &AuthorityReference,
    primary_signature: &str,
) -> String {
    let seed = format!("{}${}${}", place.id, institution.id, primary_signature);
    let uuid = Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes());
    format!("{OBJECT_ID_PREFIX}{uuid}")
}

/// Build a cultural object from its signatures.
///
/// The first signature becomes the single valid identification; every
/// remaining signature becomes an alternate identification. All
/// identifications carry the same place/institution references.
pub fn register(
    place: &AuthorityReference,
    institution: &AuthorityReference,
    signatures: &[String],
) -> Result<CulturalObject, RegistryError> {
    let (primary, alternates) = signatures.split_first().ok_or(RegistryError::NoSignatures)?;
    if primary.is_empty() {
        return Err(RegistryError::EmptyPrimarySignature);
    }

    let id = derive_identity(place, institution, primary);
    debug!(object_id = %id, signatures = signatures.len(), "registering cultural object");

    let object = CulturalObject {
        id,
        registered_at: Utc::now(),
        valid_identification: Identification::new(
            primary.clone(),
            IdentificationKind::ValidSignature,
            place.clone(),
            institution.clone(),
        ),
        alternative_identifications: alternates
            .iter()
            .map(|signature| {
                Identification::new(
                    signature.clone(),
                    IdentificationKind::AltSignature,
                    place.clone(),
                    institution.clone(),
                )
            })
            .collect(),
    };

    Ok(object)
}

/// Reject a batch in which two objects derived the same identity, i.e.
/// the same primary signature appears twice for one place/institution.
pub fn check_batch_unique(objects: &[CulturalObject]) -> Result<(), RegistryError> {
    let mut seen = std::collections::HashSet::new();
    for object in objects {
        if !seen.insert(object.id.as_str()) {
            return Err(RegistryError::DuplicateSignature {
                signature: object.valid_signature().to_string(),
            });
        }
    }
    Ok(())
}
