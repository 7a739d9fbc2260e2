//! `ProcessSpec`: the immutable, validated registration of a runnable unit.
//!
//! Loading specs from YAML is out of scope for this crate (see the
//! `Out of scope` list) — this module only defines the validated shape and
//! the invariant checks the loader is required to run before handing a spec
//! to the [`Dispatcher`](crate::dispatcher::Dispatcher).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result};
use crate::model::resources::{ResourceLimits, ResourceRequest};

/// Where (and how) a process actually runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostType {
    Container,
    Subprocess,
    RemoteBatch,
}

impl HostType {
    pub fn is_local(self) -> bool {
        matches!(self, HostType::Container | HostType::Subprocess)
    }
}

/// OGC API Processes job control modes a process may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobControlOption {
    SyncExecute,
    AsyncExecute,
}

/// How results may be transmitted back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputTransmission {
    Reference,
    Value,
}

/// A `host:container` volume binding (container host type only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub host_path: String,
    pub container_path: String,
}

/// An input or output parameter descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoDescriptor {
    pub id: String,
    pub min_occurs: u32,
    pub max_occurs: Option<u32>,
    /// Literal-data domain, e.g. `"string"`, `"integer"` — opaque to the core.
    pub literal_data_domain: String,
}

impl IoDescriptor {
    /// Validates an observed occurrence count against `minOccurs`/`maxOccurs`.
    pub fn validate_occurrences(&self, occurrences: usize) -> Result<()> {
        if occurrences < self.min_occurs as usize {
            return Err(Error::validation(format!(
                "input '{}' requires at least {} occurrence(s), got {}",
                self.id, self.min_occurs, occurrences
            )));
        }
        if let Some(max) = self.max_occurs
            && occurrences > max as usize
        {
            return Err(Error::validation(format!(
                "input '{}' allows at most {} occurrence(s), got {}",
                self.id, max, occurrences
            )));
        }
        Ok(())
    }
}

/// Backend-facing configuration carried by a [`ProcessSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Environment variable names forwarded to the job. Each must start
    /// with `UPPER(id) + "_"`.
    pub env_vars: Vec<String>,
    /// `host:container` volume bindings (container host type only).
    pub volumes: Vec<VolumeMount>,
    pub max_resources: ResourceRequest,
}

/// An immutable, validated process registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ProcessSpec {
    #[validate(length(min = 1, message = "process id must not be empty"))]
    pub id: String,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "version must not be empty"))]
    pub version: String,
    pub description: String,
    pub job_control_options: BTreeSet<JobControlOption>,
    pub output_transmission: BTreeSet<OutputTransmission>,
    pub host_type: HostType,
    /// Container image reference (container host type only).
    pub image: Option<String>,
    /// Remote batch job definition (remote-batch host type only).
    pub job_definition: Option<String>,
    /// Remote batch job queue (remote-batch host type only).
    pub job_queue: Option<String>,
    /// Base argv; the dispatcher appends a single JSON-encoded inputs blob.
    pub command: Vec<String>,
    pub config: ProcessConfig,
    pub inputs: Vec<IoDescriptor>,
    pub outputs: Vec<IoDescriptor>,
}

impl ProcessSpec {
    /// The uppercased prefix every forwarded env var name must begin with.
    pub fn env_prefix(&self) -> String {
        format!("{}_", self.id.to_uppercase())
    }

    /// Full invariant check run at load time and on add/update, per §3's
    /// validation invariant. Runs the derived field-level checks first, then
    /// the cross-field invariants that `validator`'s derive macro cannot
    /// express (host-type-specific requirements, resource ceilings, env
    /// prefix matching).
    pub fn validate_against(&self, limits: &ResourceLimits) -> Result<()> {
        Validate::validate(self)
            .map_err(|e| Error::validation(format!("process spec failed validation: {e}")))?;

        if self.id.to_lowercase() != self.id {
            return Err(Error::validation(format!(
                "process id '{}' must be a lowercase identifier",
                self.id
            )));
        }

        match self.host_type {
            HostType::Container => {
                if self.image.is_none() {
                    return Err(Error::validation(
                        "container host type requires an image reference",
                    ));
                }
            }
            HostType::RemoteBatch => {
                if self.job_definition.is_none() || self.job_queue.is_none() {
                    return Err(Error::validation(
                        "remote-batch host type requires jobDefinition and jobQueue",
                    ));
                }
                if !self.config.volumes.is_empty() {
                    return Err(Error::validation(
                        "remote-batch host type does not support volumes",
                    ));
                }
            }
            HostType::Subprocess => {
                if !self.config.volumes.is_empty() {
                    return Err(Error::validation(
                        "subprocess host type does not support volumes",
                    ));
                }
            }
        }

        if self.host_type.is_local() && !limits.permits(self.config.max_resources) {
            return Err(Error::validation(format!(
                "process '{}' declares maxResources {:?} exceeding host limits {:?}",
                self.id, self.config.max_resources, limits
            )));
        }

        let prefix = self.env_prefix();
        for name in &self.config.env_vars {
            if !name.starts_with(&prefix) {
                return Err(Error::validation(format!(
                    "env var '{name}' does not start with required prefix '{prefix}'"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_spec() -> ProcessSpec {
        ProcessSpec {
            id: "echo".into(),
            title: "Echo".into(),
            version: "1.0.0".into(),
            description: "Echoes input".into(),
            job_control_options: BTreeSet::from([JobControlOption::SyncExecute]),
            output_transmission: BTreeSet::from([OutputTransmission::Value]),
            host_type: HostType::Subprocess,
            image: None,
            job_definition: None,
            job_queue: None,
            command: vec!["/bin/echo".into()],
            config: ProcessConfig {
                env_vars: vec!["ECHO_MODE".into()],
                volumes: vec![],
                max_resources: ResourceRequest::new(0.1, 16),
            },
            inputs: vec![],
            outputs: vec![],
        }
    }

    #[test]
    fn rejects_env_var_without_required_prefix() {
        let mut spec = base_spec();
        spec.config.env_vars = vec!["WRONG_NAME".into()];
        let limits = ResourceLimits::new(1.0, 1024);
        let err = spec.validate_against(&limits).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn accepts_correctly_prefixed_env_var() {
        let spec = base_spec();
        let limits = ResourceLimits::new(1.0, 1024);
        assert!(spec.validate_against(&limits).is_ok());
    }

    #[test]
    fn rejects_resources_exceeding_host_limits() {
        let mut spec = base_spec();
        spec.config.max_resources = ResourceRequest::new(10.0, 16);
        let limits = ResourceLimits::new(1.0, 1024);
        assert!(spec.validate_against(&limits).is_err());
    }

    #[test]
    fn container_without_image_is_rejected() {
        let mut spec = base_spec();
        spec.host_type = HostType::Container;
        spec.image = None;
        let limits = ResourceLimits::new(1.0, 1024);
        assert!(spec.validate_against(&limits).is_err());
    }

    #[test]
    fn io_descriptor_enforces_min_and_max_occurs() {
        let desc = IoDescriptor {
            id: "files".into(),
            min_occurs: 1,
            max_occurs: Some(3),
            literal_data_domain: "string".into(),
        };
        assert!(desc.validate_occurrences(0).is_err());
        assert!(desc.validate_occurrences(2).is_ok());
        assert!(desc.validate_occurrences(4).is_err());
    }
}
