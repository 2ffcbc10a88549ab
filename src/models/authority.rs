use serde::{Deserialize, Serialize};

/// Type name under which holding places are resolved.
pub const PLACE_TYPE_NAME: &str = "Place";

/// Type name under which holding institutions are resolved.
pub const INSTITUTION_TYPE_NAME: &str = "CorporateBody";

/// Reference to an external, centrally maintained authority record
/// (place, institution, person). The core only ever reads these; they are
/// resolved by key or name through the authority-resolver collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityReference {
    pub id: String,
    pub name: String,
    #[serde(rename = "typeName")]
    pub type_name: String,
}

impl AuthorityReference {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    /// Shorthand for a holding-place reference.
    pub fn place(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, PLACE_TYPE_NAME)
    }

    /// Shorthand for a holding-institution reference.
    pub fn institution(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, INSTITUTION_TYPE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_constructors() {
        let place = AuthorityReference::place("NORM-1", "Munich");
        assert_eq!(place.type_name, PLACE_TYPE_NAME);

        let institution = AuthorityReference::institution("NORM-2", "Bavarian State Library");
        assert_eq!(institution.type_name, INSTITUTION_TYPE_NAME);
    }

    #[test]
    fn test_wire_field_names() {
        let reference = AuthorityReference::place("NORM-1", "Munich");
        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json["typeName"], "Place");
        assert_eq!(json["id"], "NORM-1");
    }
}
