//! Thin Docker-CLI-shaped reference [`ContainerRuntime`]. Shells out to the
//! `docker` binary rather than linking the daemon's HTTP API, which keeps
//! this reference implementation dependency-free; a production deployment
//! is expected to swap this for a real client against its container
//! scheduler of choice.

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::traits::{ContainerRuntime, ContainerSpawn, LogRecord, LogStream};

/// Invokes `docker` as a subprocess for every operation.
#[derive(Default)]
pub struct DockerCliContainerRuntime {
    binary: String,
}

impl DockerCliContainerRuntime {
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }

    fn command(&self) -> Command {
        Command::new(&self.binary)
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = self
            .command()
            .args(args)
            .output()
            .await
            .map_err(|err| Error::backend(format!("failed to exec docker {args:?}")).with_source(err))?;
        if !output.status.success() {
            return Err(Error::backend(format!(
                "docker {args:?} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl ContainerRuntime for DockerCliContainerRuntime {
    async fn ensure_image(&self, image: &str) -> Result<()> {
        if self.run(&["image", "inspect", image]).await.is_ok() {
            return Ok(());
        }
        self.run(&["pull", image]).await?;
        Ok(())
    }

    async fn start(&self, spawn: ContainerSpawn) -> Result<String> {
        let cpus = format!("{:.3}", spawn.nano_cpus as f64 / 1_000_000_000.0);
        let memory = format!("{}m", spawn.memory_bytes / (1024 * 1024));

        let mut args: Vec<String> = vec![
            "run".into(),
            "-d".into(),
            "--cpus".into(),
            cpus,
            "--memory".into(),
            memory,
        ];
        for (name, value) in &spawn.env_vars {
            args.push("-e".into());
            args.push(format!("{name}={value}"));
        }
        for (host, container) in &spawn.volumes {
            args.push("-v".into());
            args.push(format!("{host}:{container}"));
        }
        args.push(spawn.image.clone());
        args.extend(spawn.command.clone());

        let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&args_ref).await
    }

    async fn wait(&self, container_id: &str) -> Result<i64> {
        let exit_code = self.run(&["wait", container_id]).await?;
        exit_code
            .parse()
            .map_err(|err| Error::backend("docker wait returned a non-numeric exit code").with_source(err))
    }

    async fn logs(&self, container_id: &str) -> Result<Vec<LogRecord>> {
        let output = self
            .command()
            .args(["logs", "--timestamps", container_id])
            .output()
            .await
            .map_err(|err| Error::auxiliary("failed to exec docker logs").with_source(err))?;

        let records = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| LogRecord {
                timestamp: Timestamp::now(),
                stream: LogStream::Stdout,
                line: line.to_string(),
            })
            .collect();
        Ok(records)
    }

    async fn remove(&self, container_id: &str) -> Result<()> {
        // `docker rm -f` succeeds (exit 0) even on an already-removed id is
        // not guaranteed by the CLI, so a failure here is swallowed by the
        // caller (`ContainerJob::terminate`), which only logs it.
        self.run(&["rm", "-f", container_id]).await.map(|_| ())
    }

    async fn image_digest(&self, image: &str) -> Result<Option<String>> {
        let format = "{{index .RepoDigests 0}}";
        Ok(self.run(&["inspect", "--format", format, image]).await.ok())
    }

    async fn kill(&self, container_id: &str) -> Result<()> {
        self.run(&["kill", container_id]).await.map(|_| ())
    }
}
