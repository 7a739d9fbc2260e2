//! Data model: [`ProcessSpec`] (immutable, validated process registrations)
//! and [`JobRecord`] (the serializable projection of one execution instance).

mod ids;
mod job_metadata;
mod job_record;
mod job_status;
mod process_spec;
mod resources;

pub use ids::JobId;
pub use job_metadata::{ImageRef, JobMetadata, ProcessRef};
pub use job_record::JobRecord;
pub use job_status::JobStatus;
pub use process_spec::{
    HostType, IoDescriptor, JobControlOption, OutputTransmission, ProcessConfig, ProcessSpec,
    VolumeMount,
};
pub use resources::{ResourceLimits, ResourceRequest};
