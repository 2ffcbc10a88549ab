//! Job-envelope codec.
//!
//! Converts between the JSON wire form and the typed in-memory envelope.
//! The binary content of each envelope object is opaque to the codec: it
//! is carried base64-encoded and never interpreted here. Object ordering
//! is preserved because group-id correlation depends on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::MessagingError;
use crate::models::ImportJob;

/// Action kind of a job envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Add,
    Update,
    Delete,
}

/// Document kind tag of an envelope object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    CulturalObject,
    Description,
    Catalog,
    ImportJob,
    Digitization,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeActor {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeTarget {
    pub name: String,
}

/// One attached document payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeObject {
    pub id: String,
    #[serde(rename = "groupId")]
    pub group_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub name: String,
    pub compressed: bool,
    #[serde(with = "content_base64")]
    pub content: Vec<u8>,
}

/// The unit of work transported over the message broker describing one
/// import batch. Created by the external import tool, consumed once, never
/// mutated after receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub action: ActionKind,
    pub published: DateTime<Utc>,
    pub actor: EnvelopeActor,
    pub target: EnvelopeTarget,
    #[serde(default)]
    pub objects: Vec<EnvelopeObject>,
}

impl JobEnvelope {
    /// Decode an envelope from its wire bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, MessagingError> {
        serde_json::from_slice(bytes).map_err(|e| MessagingError::malformed_envelope(e.to_string()))
    }

    /// Encode the envelope into its wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>, MessagingError> {
        serde_json::to_vec(self).map_err(|e| MessagingError::message_serialization(e.to_string()))
    }

    /// The first attached import-job record, decoded.
    pub fn import_job(&self) -> Result<ImportJob, MessagingError> {
        let object = self
            .objects
            .iter()
            .find(|object| object.kind == DocumentKind::ImportJob)
            .ok_or_else(|| {
                MessagingError::malformed_envelope("envelope carries no IMPORT_JOB object")
            })?;
        ImportJob::decode(&object.content)
    }

    /// All attached documents of a given kind, in envelope order.
    pub fn objects_of_kind(&self, kind: DocumentKind) -> impl Iterator<Item = &EnvelopeObject> {
        self.objects.iter().filter(move |object| object.kind == kind)
    }

    /// Build the result envelope the core emits back to the import tool:
    /// the import-job record wrapped as a single `IMPORT_JOB` object.
    pub fn result_for(job: &ImportJob) -> Result<Self, MessagingError> {
        let content = job.encode()?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            action: ActionKind::Update,
            published: Utc::now(),
            actor: EnvelopeActor {
                name: job.username.clone(),
            },
            target: EnvelopeTarget {
                name: job.name.clone(),
            },
            objects: vec![EnvelopeObject {
                id: Uuid::new_v4().to_string(),
                group_id: Some(job.id.clone()),
                kind: DocumentKind::ImportJob,
                name: job.name.clone(),
                compressed: false,
                content,
            }],
        })
    }
}

mod content_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_envelope() -> JobEnvelope {
        JobEnvelope {
            id: "env-1".to_string(),
            action: ActionKind::Add,
            published: "2024-03-01T09:30:00Z".parse().unwrap(),
            actor: EnvelopeActor {
                name: "curator".to_string(),
            },
            target: EnvelopeTarget {
                name: "batch-1".to_string(),
            },
            objects: vec![
                EnvelopeObject {
                    id: "obj-1".to_string(),
                    group_id: Some("grp-1".to_string()),
                    kind: DocumentKind::CulturalObject,
                    name: "record.xml".to_string(),
                    compressed: false,
                    content: b"<doc>first</doc>".to_vec(),
                },
                EnvelopeObject {
                    id: "obj-2".to_string(),
                    group_id: Some("grp-1".to_string()),
                    kind: DocumentKind::Description,
                    name: "description.xml".to_string(),
                    compressed: true,
                    content: vec![0x1f, 0x8b, 0x00, 0xff],
                },
            ],
        }
    }

    #[test]
    fn test_round_trip() {
        let envelope = sample_envelope();
        let bytes = envelope.encode().unwrap();
        let decoded = JobEnvelope::decode(&bytes).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_re_encode_is_stable() {
        let bytes = sample_envelope().encode().unwrap();
        let re_encoded = JobEnvelope::decode(&bytes).unwrap().encode().unwrap();
        assert_eq!(bytes, re_encoded);
    }

    #[test]
    fn test_object_order_preserved() {
        let bytes = sample_envelope().encode().unwrap();
        let decoded = JobEnvelope::decode(&bytes).unwrap();
        let ids: Vec<_> = decoded.objects.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["obj-1", "obj-2"]);
    }

    #[test]
    fn test_content_is_opaque() {
        // Arbitrary (non-UTF-8) bytes survive the codec untouched.
        let envelope = sample_envelope();
        let decoded = JobEnvelope::decode(&envelope.encode().unwrap()).unwrap();
        assert_eq!(decoded.objects[1].content, vec![0x1f, 0x8b, 0x00, 0xff]);
        assert!(decoded.objects[1].compressed);
    }

    #[test]
    fn test_wire_kind_tags() {
        let json = serde_json::to_value(sample_envelope()).unwrap();
        assert_eq!(json["type"], "ADD");
        assert_eq!(json["objects"][0]["type"], "CULTURAL_OBJECT");
        assert_eq!(json["objects"][0]["groupId"], "grp-1");
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        assert!(matches!(
            JobEnvelope::decode(b"{\"id\": 42}"),
            Err(MessagingError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn test_missing_import_job_object() {
        let envelope = sample_envelope();
        assert!(matches!(
            envelope.import_job(),
            Err(MessagingError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn test_result_envelope_references_job() {
        let job = crate::models::import_job::fixtures::sample_job();
        let result = JobEnvelope::result_for(&job).unwrap();
        assert_eq!(result.objects.len(), 1);
        assert_eq!(result.objects[0].kind, DocumentKind::ImportJob);
        assert_eq!(result.objects[0].group_id.as_deref(), Some("job-1"));
        assert_eq!(result.import_job().unwrap().id, "job-1");
    }
}
