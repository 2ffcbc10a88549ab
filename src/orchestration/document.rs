//! Document-mapping collaborator.
//!
//! Envelope objects carry their document payload as opaque bytes; the
//! codec never interprets them. A [`DocumentMapper`] turns one payload
//! into the fields the pipeline needs: the source file name (for import
//! file correlation), the authority keys to resolve, and the raw
//! signature line for the identity registry.

use serde::Deserialize;

use crate::messaging::EnvelopeObject;

use super::OrchestrationError;

/// The pipeline-relevant view of one embedded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Name of the source file this document came from, matched against
    /// the job's import files.
    pub file_name: String,
    pub place_key: String,
    pub institution_key: String,
    /// Quote-delimited signature cells, unparsed.
    pub signature_line: String,
}

pub trait DocumentMapper: Send + Sync {
    fn extract(&self, object: &EnvelopeObject) -> Result<ExtractedDocument, OrchestrationError>;
}

/// Mapper for payloads that are themselves JSON documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDocumentMapper;

#[derive(Deserialize)]
struct JsonDocument {
    #[serde(rename = "dateiName")]
    file_name: String,
    #[serde(rename = "placeKey")]
    place_key: String,
    #[serde(rename = "institutionKey")]
    institution_key: String,
    #[serde(rename = "signatureLine")]
    signature_line: String,
}

impl DocumentMapper for JsonDocumentMapper {
    fn extract(&self, object: &EnvelopeObject) -> Result<ExtractedDocument, OrchestrationError> {
        let document: JsonDocument = serde_json::from_slice(&object.content).map_err(|e| {
            OrchestrationError::technical(format!(
                "undecodable document payload in object '{}': {e}",
                object.id
            ))
        })?;
        Ok(ExtractedDocument {
            file_name: document.file_name,
            place_key: document.place_key,
            institution_key: document.institution_key,
            signature_line: document.signature_line,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::DocumentKind;

    fn object_with_content(content: &str) -> EnvelopeObject {
        EnvelopeObject {
            id: "obj-1".to_string(),
            group_id: Some("grp-1".to_string()),
            kind: DocumentKind::CulturalObject,
            name: "catalog.xml".to_string(),
            compressed: false,
            content: content.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_extracts_pipeline_fields() {
        let object = object_with_content(
            r#"{"dateiName":"catalog.xml","placeKey":"P1","institutionKey":"I1","signatureLine":"\"Cbm Cat. 1\""}"#,
        );
        let doc = JsonDocumentMapper.extract(&object).unwrap();
        assert_eq!(doc.file_name, "catalog.xml");
        assert_eq!(doc.place_key, "P1");
        assert_eq!(doc.institution_key, "I1");
        assert_eq!(doc.signature_line, "\"Cbm Cat. 1\"");
    }

    #[test]
    fn test_undecodable_payload_is_technical_failure() {
        let object = object_with_content("<not json>");
        let err = JsonDocumentMapper.extract(&object).unwrap_err();
        assert!(matches!(err, OrchestrationError::Technical(_)));
        assert!(err.to_string().contains("obj-1"));
    }
}
