//! Process discovery and execution handlers (`/processes/*`).

use std::collections::HashMap;
use std::sync::Arc;

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sepex_core::dispatcher::{DispatchOutcome, DispatchRequest, Dispatcher, ExecutionPreference};
use sepex_core::model::{JobControlOption, ProcessSpec};

use crate::error::{ErrorKind, Result};
use crate::handler::dto::{
    ExecuteRequest, ExecutionAccepted, ExecutionCompleted, ExecutionMode, ProcessDescription,
    ProcessSummary,
};
use crate::handler::negotiation::{FormatQuery, Negotiated, wants_html};
use crate::extract::ValidateJson;
use crate::service::{ProcessRegistry, ServiceState};
use crate::utility::tracing_targets;

async fn list_processes(
    State(registry): State<Arc<ProcessRegistry>>,
) -> Json<Vec<ProcessSummary>> {
    Json(registry.list().map(ProcessSummary::from).collect())
}

fn list_processes_docs(op: TransformOperation) -> TransformOperation {
    op.summary("List registered processes")
        .description("Returns every process this deployment can execute.")
        .response::<200, Json<Vec<ProcessSummary>>>()
}

async fn describe_process(
    State(registry): State<Arc<ProcessRegistry>>,
    Path(process_id): Path<String>,
) -> Result<Json<ProcessDescription>> {
    let spec = registry
        .get(&process_id)
        .ok_or_else(|| ErrorKind::NotFound.with_resource("process"))?;
    Ok(Json(ProcessDescription::from(spec)))
}

fn describe_process_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Describe a process")
        .description("Returns the full registration of a single process, including its job control options.")
        .response::<200, Json<ProcessDescription>>()
        .response::<404, Json<crate::error::ErrorBody>>()
}

async fn execute_process(
    State(registry): State<Arc<ProcessRegistry>>,
    State(dispatcher): State<Arc<Dispatcher>>,
    Path(process_id): Path<String>,
    Query(format): Query<FormatQuery>,
    headers: HeaderMap,
    ValidateJson(request): ValidateJson<ExecuteRequest>,
) -> Result<(StatusCode, Json<Negotiated<ExecutionAcceptedOrCompleted>>)> {
    let process = registry
        .get(&process_id)
        .ok_or_else(|| ErrorKind::NotFound.with_resource("process"))?;

    let preference = resolve_preference(process, request.mode);
    let env_values = resolve_env_values(process, &request.inputs);

    let outcome = dispatcher
        .execute(DispatchRequest {
            process,
            preference,
            submitter: None,
            inputs: request.inputs,
            env_values,
        })
        .await?;

    let as_html = wants_html(&headers, &format);
    let (status, body) = match outcome {
        DispatchOutcome::Completed {
            job_id,
            status,
            results,
        } => {
            tracing::info!(
                target: tracing_targets::EXECUTION,
                process_id = %process_id,
                job_id = %job_id,
                status = %status,
                "sync execution completed"
            );
            (
                StatusCode::OK,
                ExecutionAcceptedOrCompleted::Completed(ExecutionCompleted {
                    job_id: job_id.to_string(),
                    status: status.into(),
                    results,
                }),
            )
        }
        DispatchOutcome::Accepted { job_id, status } => {
            tracing::info!(
                target: tracing_targets::EXECUTION,
                process_id = %process_id,
                job_id = %job_id,
                status = %status,
                "execution accepted"
            );
            (
                StatusCode::CREATED,
                ExecutionAcceptedOrCompleted::Accepted(ExecutionAccepted {
                    job_id: job_id.to_string(),
                    status: status.into(),
                }),
            )
        }
    };

    Ok((status, Json(Negotiated::new(body, as_html))))
}

/// Either shape a `POST .../execution` response can take, depending on
/// whether the job finished synchronously.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum ExecutionAcceptedOrCompleted {
    Completed(ExecutionCompleted),
    Accepted(ExecutionAccepted),
}

fn execute_process_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Execute a process")
        .description(
            "Submits one execution of a registered process. Sync requests block until the \
            job reaches a terminal status; async requests return immediately with a job id \
            to poll.",
        )
        .response::<200, Json<ExecutionCompleted>>()
        .response::<201, Json<ExecutionAccepted>>()
        .response::<400, Json<crate::error::ErrorBody>>()
        .response::<404, Json<crate::error::ErrorBody>>()
        .response::<429, Json<crate::error::ErrorBody>>()
}

/// Picks sync vs async when the caller didn't ask explicitly: sync if the
/// process supports it, otherwise async. A caller who did ask explicitly is
/// honored as-is; the dispatcher rejects an unsupported explicit choice.
fn resolve_preference(process: &ProcessSpec, requested: Option<ExecutionMode>) -> ExecutionPreference {
    match requested {
        Some(ExecutionMode::Sync) => ExecutionPreference::Sync,
        Some(ExecutionMode::Async) => ExecutionPreference::Async,
        None => {
            if process.job_control_options.contains(&JobControlOption::SyncExecute) {
                ExecutionPreference::Sync
            } else {
                ExecutionPreference::Async
            }
        }
    }
}

/// Maps each declared env var name back to the input id it's sourced from:
/// `UPPER(processId) + "_" + UPPER(inputId)` strips to `inputId` (lowercased)
/// as the lookup key into the caller's `inputs` object.
fn resolve_env_values(process: &ProcessSpec, inputs: &serde_json::Value) -> HashMap<String, String> {
    let prefix = process.env_prefix();
    let serde_json::Value::Object(map) = inputs else {
        return HashMap::new();
    };

    process
        .config
        .env_vars
        .iter()
        .filter_map(|name| {
            let input_id = name.strip_prefix(&prefix)?.to_lowercase();
            let value = map.get(&input_id)?;
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((name.clone(), rendered))
        })
        .collect()
}

pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/processes", get_with(list_processes, list_processes_docs))
        .api_route(
            "/processes/{processId}",
            get_with(describe_process, describe_process_docs),
        )
        .api_route(
            "/processes/{processId}/execution",
            post_with(execute_process, execute_process_docs),
        )
        .with_path_items(|item| item.tag("Processes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use sepex_core::model::{HostType, IoDescriptor, OutputTransmission, ProcessConfig, ResourceRequest};

    fn echo_process() -> ProcessSpec {
        ProcessSpec {
            id: "echo".into(),
            title: "Echo".into(),
            version: "1.0.0".into(),
            description: "Echoes input".into(),
            job_control_options: BTreeSet::from([JobControlOption::SyncExecute, JobControlOption::AsyncExecute]),
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
            inputs: vec![IoDescriptor {
                id: "mode".into(),
                min_occurs: 1,
                max_occurs: Some(1),
                literal_data_domain: "string".into(),
            }],
            outputs: vec![],
        }
    }

    #[test]
    fn resolve_env_values_maps_prefixed_name_to_lowercased_input_id() {
        let process = echo_process();
        let inputs = serde_json::json!({ "mode": "fast" });
        let env_values = resolve_env_values(&process, &inputs);
        assert_eq!(env_values.get("ECHO_MODE"), Some(&"fast".to_string()));
    }

    #[test]
    fn resolve_env_values_skips_unmatched_inputs() {
        let process = echo_process();
        let inputs = serde_json::json!({});
        let env_values = resolve_env_values(&process, &inputs);
        assert!(env_values.is_empty());
    }

    #[test]
    fn resolve_preference_defaults_to_sync_when_supported() {
        let process = echo_process();
        assert_eq!(resolve_preference(&process, None), ExecutionPreference::Sync);
    }

    #[test]
    fn resolve_preference_falls_back_to_async_when_sync_unsupported() {
        let mut process = echo_process();
        process.job_control_options = BTreeSet::from([JobControlOption::AsyncExecute]);
        assert_eq!(resolve_preference(&process, None), ExecutionPreference::Async);
    }

    #[test]
    fn resolve_preference_honors_explicit_choice() {
        let process = echo_process();
        assert_eq!(
            resolve_preference(&process, Some(ExecutionMode::Async)),
            ExecutionPreference::Async
        );
    }
}
