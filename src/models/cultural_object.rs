use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::authority::AuthorityReference;

/// Kind of an identification attached to a cultural object.
///
/// Every persisted cultural object carries exactly one `ValidSignature`
/// identification; all further identifications are `AltSignature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentificationKind {
    ValidSignature,
    AltSignature,
}

/// One identifying label of a cultural object, together with the place and
/// institution that own the labelled holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identification {
    pub id: String,
    pub ident: String,
    pub kind: IdentificationKind,
    #[serde(rename = "owningPlace")]
    pub owning_place: AuthorityReference,
    #[serde(rename = "owningInstitution")]
    pub owning_institution: AuthorityReference,
}

impl Identification {
    pub fn new(
        ident: impl Into<String>,
        kind: IdentificationKind,
        owning_place: AuthorityReference,
        owning_institution: AuthorityReference,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ident: ident.into(),
            kind,
            owning_place,
            owning_institution,
        }
    }
}

/// A registered physical holding (e.g. a manuscript), identified by a
/// derived, content-addressed id. Identities are created on first
/// registration and thereafter looked up, never regenerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CulturalObject {
    pub id: String,
    #[serde(rename = "registeredAt")]
    pub registered_at: DateTime<Utc>,
    #[serde(rename = "validIdentification")]
    pub valid_identification: Identification,
    #[serde(rename = "alternativeIdentifications")]
    pub alternative_identifications: Vec<Identification>,
}

impl CulturalObject {
    /// The canonical signature string of this object.
    pub fn valid_signature(&self) -> &str {
        &self.valid_identification.ident
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn sample_identification(kind: IdentificationKind) -> Identification {
        Identification::new(
            "Cbm Cat. 1",
            kind,
            AuthorityReference::place("P1", "Munich"),
            AuthorityReference::institution("I1", "Bavarian State Library"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::sample_identification;
    use super::*;

    #[test]
    fn test_identification_kind_wire_form() {
        let json = serde_json::to_string(&IdentificationKind::ValidSignature).unwrap();
        assert_eq!(json, "\"VALID_SIGNATURE\"");
        let json = serde_json::to_string(&IdentificationKind::AltSignature).unwrap();
        assert_eq!(json, "\"ALT_SIGNATURE\"");
    }

    #[test]
    fn test_identification_ids_are_unique() {
        let a = sample_identification(IdentificationKind::ValidSignature);
        let b = sample_identification(IdentificationKind::ValidSignature);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_valid_signature_accessor() {
        let object = CulturalObject {
            id: "MS-test".to_string(),
            registered_at: Utc::now(),
            valid_identification: sample_identification(IdentificationKind::ValidSignature),
            alternative_identifications: vec![],
        };
        assert_eq!(object.valid_signature(), "Cbm Cat. 1");
    }
}
