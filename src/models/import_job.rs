//! Import job aggregate.
//!
//! The durable tracking record for one envelope's processing lifecycle.
//! Field names follow the wire contract shared with the external import
//! tool, which is why several of them keep their legacy German spelling
//! (`benutzerName`, `dateiName`, ...). The record is created by the import
//! tool, carried inside the job envelope, mutated here during processing
//! and retained indefinitely as an audit record.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::messaging::MessagingError;
use crate::state_machine::JobStatus;

/// Per-record outcome link attached to an import file after successful
/// registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEntity {
    pub id: String,
    pub label: String,
    pub url: String,
}

impl DataEntity {
    pub fn new(id: impl Into<String>, label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            url: url.into(),
        }
    }
}

/// One source file of an import job and its processing outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportFile {
    pub id: String,
    pub path: String,
    #[serde(rename = "dateiTyp")]
    pub file_type: Option<String>,
    #[serde(rename = "dateiName")]
    pub file_name: String,
    #[serde(rename = "dateiFormat")]
    pub file_format: Option<String>,
    pub error: bool,
    pub message: Option<String>,
    #[serde(rename = "importEntityData", default)]
    pub entity_data: Vec<DataEntity>,
}

/// The job-status aggregate for one import batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: String,
    #[serde(rename = "creationDate")]
    pub creation_date: NaiveDateTime,
    #[serde(rename = "benutzerName")]
    pub username: String,
    #[serde(rename = "importFiles", default)]
    pub import_files: Vec<ImportFile>,
    pub name: String,
    #[serde(rename = "importDir")]
    pub import_dir: Option<String>,
    pub result: JobStatus,
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
    pub datatype: Option<String>,
}

impl ImportJob {
    /// Decode an import job record from the JSON payload of an
    /// `IMPORT_JOB` envelope object.
    pub fn decode(bytes: &[u8]) -> Result<Self, MessagingError> {
        serde_json::from_slice(bytes)
            .map_err(|e| MessagingError::malformed_envelope(format!("import job payload: {e}")))
    }

    /// Encode the record back into its JSON wire form.
    pub fn encode(&self) -> Result<Vec<u8>, MessagingError> {
        serde_json::to_vec(self)
            .map_err(|e| MessagingError::message_serialization(e.to_string()))
    }

    /// Find the import file matching a document's declared name.
    pub fn file_by_name_mut(&mut self, file_name: &str) -> Option<&mut ImportFile> {
        self.import_files
            .iter_mut()
            .find(|file| file.file_name == file_name)
    }

    pub fn is_terminal(&self) -> bool {
        self.result.is_terminal()
    }

    pub fn has_entity_data(&self) -> bool {
        self.import_files
            .iter()
            .any(|file| !file.entity_data.is_empty())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn sample_job() -> ImportJob {
        ImportJob {
            id: "job-1".to_string(),
            creation_date: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            username: "curator".to_string(),
            import_files: vec![ImportFile {
                id: "file-1".to_string(),
                path: "/import/batch-1/record.xml".to_string(),
                file_type: Some("text/xml".to_string()),
                file_name: "record.xml".to_string(),
                file_format: Some("MXML".to_string()),
                error: false,
                message: None,
                entity_data: vec![],
            }],
            name: "batch-1".to_string(),
            import_dir: Some("/import/batch-1".to_string()),
            result: JobStatus::NoResult,
            error_message: None,
            datatype: Some("CULTURAL_OBJECT".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::sample_job;
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let job = sample_job();
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["benutzerName"], "curator");
        assert_eq!(json["result"], "NO_RESULT");
        assert_eq!(json["importFiles"][0]["dateiName"], "record.xml");
        assert_eq!(json["importFiles"][0]["dateiTyp"], "text/xml");
        assert!(json["importFiles"][0]["importEntityData"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let job = sample_job();
        let bytes = job.encode().unwrap();
        let decoded = ImportJob::decode(&bytes).unwrap();
        assert_eq!(decoded, job);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = ImportJob::decode(b"not json at all");
        assert!(matches!(
            result,
            Err(MessagingError::MalformedEnvelope { .. })
        ));
    }

    #[test]
    fn test_file_lookup_by_name() {
        let mut job = sample_job();
        assert!(job.file_by_name_mut("record.xml").is_some());
        assert!(job.file_by_name_mut("missing.xml").is_none());
    }
}
