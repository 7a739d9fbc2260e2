//! Loads and holds the fixed set of registered [`ProcessSpec`]s.
//!
//! Process-definition loading from YAML is explicitly out of scope for
//! `sepex-core` (it only defines the validated shape); this module is the
//! loader. One process is registered per `*.yaml`/`*.yml` file in the
//! configured plugins directory, each validated against the host's
//! [`ResourceLimits`] before being admitted to the registry, matching §3's
//! "validated at load" invariant.

use std::collections::HashMap;
use std::path::Path;

use sepex_core::model::{ProcessSpec, ResourceLimits};

const TRACING_TARGET: &str = "sepex_server::service::process_registry";

/// The fixed set of processes a running SEPEX instance can execute.
///
/// Built once at startup and never mutated afterwards — adding or removing
/// a process requires a restart, per the registration model implied by the
/// OGC API Processes discovery endpoints.
#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    specs: HashMap<String, ProcessSpec>,
}

impl ProcessRegistry {
    pub fn new(specs: HashMap<String, ProcessSpec>) -> Self {
        Self { specs }
    }

    /// Loads every `*.yaml`/`*.yml` file in `dir`, validating each against
    /// `limits`. Fails fast on the first invalid or unreadable spec: a bad
    /// process registration is a startup failure, not a runtime one.
    pub async fn load_from_dir(dir: &Path, limits: &ResourceLimits) -> anyhow::Result<Self> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|err| anyhow::anyhow!("failed to read plugins directory {}: {err}", dir.display()))?;

        let mut specs = HashMap::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| anyhow::anyhow!("failed to iterate plugins directory {}: {err}", dir.display()))?
        {
            let path = entry.path();
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
            if !is_yaml {
                continue;
            }

            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|err| anyhow::anyhow!("failed to read process spec {}: {err}", path.display()))?;
            let spec: ProcessSpec = serde_yaml::from_str(&contents)
                .map_err(|err| anyhow::anyhow!("failed to parse process spec {}: {err}", path.display()))?;

            spec.validate_against(limits)
                .map_err(|err| anyhow::anyhow!("process spec {} failed validation: {err}", path.display()))?;

            tracing::info!(
                target: TRACING_TARGET,
                process_id = %spec.id,
                host_type = ?spec.host_type,
                path = %path.display(),
                "registered process spec"
            );

            if let Some(previous) = specs.insert(spec.id.clone(), spec) {
                anyhow::bail!("duplicate process id '{}' across plugin files", previous.id);
            }
        }

        tracing::info!(target: TRACING_TARGET, count = specs.len(), "process registry loaded");
        Ok(Self { specs })
    }

    pub fn get(&self, id: &str) -> Option<&ProcessSpec> {
        self.specs.get(id)
    }

    pub fn list(&self) -> impl Iterator<Item = &ProcessSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_spec(dir: &Path, file_name: &str, id: &str) {
        let yaml = format!(
            r#"
id: {id}
title: Echo
version: "1.0.0"
description: Echoes input
jobControlOptions: [sync-execute]
outputTransmission: [value]
hostType: subprocess
image: null
jobDefinition: null
jobQueue: null
command: ["/bin/echo"]
config:
  envVars: []
  volumes: []
  maxResources: {{ cpus: 0.1, memoryMb: 16 }}
inputs: []
outputs: []
"#
        );
        std::fs::write(dir.join(file_name), yaml).unwrap();
    }

    #[tokio::test]
    async fn loads_yaml_files_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_spec(dir.path(), "echo.yaml", "echo");
        let limits = ResourceLimits::new(1.0, 1024);
        let registry = ProcessRegistry::load_from_dir(dir.path(), &limits).await.unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("echo").is_some());
    }

    #[tokio::test]
    async fn ignores_non_yaml_files() {
        let dir = tempfile::tempdir().unwrap();
        write_spec(dir.path(), "echo.yaml", "echo");
        std::fs::write(dir.path().join("README.md"), "not a spec").unwrap();
        let limits = ResourceLimits::new(1.0, 1024);
        let registry = ProcessRegistry::load_from_dir(dir.path(), &limits).await.unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn rejects_duplicate_process_ids() {
        let dir = tempfile::tempdir().unwrap();
        write_spec(dir.path(), "a.yaml", "echo");
        write_spec(dir.path(), "b.yaml", "echo");
        let limits = ResourceLimits::new(1.0, 1024);
        let result = ProcessRegistry::load_from_dir(dir.path(), &limits).await;
        assert!(result.is_err());
    }
}
