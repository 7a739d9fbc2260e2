//! The JSON-LD document written to `BlobStore` for a successful job.
//!
//! Distinct from [`JobRecord`](crate::model::JobRecord): the record is the
//! internal, backend-agnostic snapshot handed to `JobStore`; this is the
//! public artifact a caller downloads from `<metadata-prefix>/<jobId>.json`,
//! carrying the `@context` and image provenance the record has no use for.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::model::ids::JobId;

/// The process a job was an execution of, as recorded in its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRef {
    pub id: String,
    pub version: String,
}

/// Container provenance: the image reference a container job ran and the
/// digest resolved for it, when the runtime could report one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(rename = "ref")]
    pub reference: String,
    pub digest: Option<String>,
}

/// A JSON-LD job metadata document.
///
/// `image` is only populated for container-backed jobs; subprocess and
/// remote jobs omit it entirely rather than serializing a `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMetadata {
    #[serde(rename = "@context")]
    pub context: String,
    pub job_id: JobId,
    pub process: ProcessRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    pub commands: Vec<String>,
    pub generated_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_image_when_absent() {
        let metadata = JobMetadata {
            context: "https://example.com/context.jsonld".into(),
            job_id: JobId::generate(),
            process: ProcessRef {
                id: "echo".into(),
                version: "1.0.0".into(),
            },
            image: None,
            commands: vec!["/bin/echo".into()],
            generated_at: Timestamp::now(),
            started_at: None,
            ended_at: None,
        };
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(!json.contains("\"image\""));
        assert!(json.contains("\"@context\""));
    }

    #[test]
    fn includes_image_when_present() {
        let metadata = JobMetadata {
            context: "https://example.com/context.jsonld".into(),
            job_id: JobId::generate(),
            process: ProcessRef {
                id: "echo".into(),
                version: "1.0.0".into(),
            },
            image: Some(ImageRef {
                reference: "alpine:3".into(),
                digest: Some("sha256:abc".into()),
            }),
            commands: vec!["/bin/echo".into()],
            generated_at: Timestamp::now(),
            started_at: None,
            ended_at: None,
        };
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("\"ref\":\"alpine:3\""));
    }
}
