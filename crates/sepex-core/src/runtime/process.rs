//! `tokio::process`-backed reference [`ProcessRuntime`].
//!
//! Combines stdout and stderr into one file, one JSONL record per line, per
//! §4.8 and §6's on-disk log file contract. A dedicated task owns the pipe
//! readers so `wait()` never blocks on an unread pipe filling up.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::Serialize;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::traits::{ProcessExit, ProcessHandle, ProcessRuntime, ProcessSpawn};

#[derive(Serialize)]
struct LogLine<'a> {
    timestamp: Timestamp,
    stream: &'a str,
    line: &'a str,
}

/// Spawns OS subprocesses with `tokio::process::Command`, fanning combined
/// stdout/stderr into a single JSONL file at the job's log path.
#[derive(Default)]
pub struct TokioProcessRuntime;

impl TokioProcessRuntime {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRuntime for TokioProcessRuntime {
    async fn spawn(&self, spawn: ProcessSpawn) -> Result<Box<dyn ProcessHandle>> {
        let [program, args @ ..] = spawn.command.as_slice() else {
            return Err(Error::backend("subprocess command must not be empty"));
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(spawn.env_vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|err| Error::backend("failed to spawn subprocess").with_source(err))?;

        let log_file = File::create(&spawn.log_path)
            .await
            .map_err(|err| Error::backend("failed to create subprocess log file").with_source(err))?;
        let log_file = Arc::new(Mutex::new(log_file));

        let stdout = child.stdout.take().expect("stdout piped");
        let stderr = child.stderr.take().expect("stderr piped");
        let stdout_task = tokio::spawn(pump_stream(stdout, "stdout", Arc::clone(&log_file)));
        let stderr_task = tokio::spawn(pump_stream(stderr, "stderr", Arc::clone(&log_file)));

        Ok(Box::new(TokioProcessHandle {
            child,
            stdout_task: Some(stdout_task),
            stderr_task: Some(stderr_task),
        }))
    }
}

async fn pump_stream(
    reader: impl tokio::io::AsyncRead + Unpin,
    stream: &'static str,
    log_file: Arc<Mutex<File>>,
) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        let next = lines.next_line().await;
        let Ok(Some(line)) = next else { break };
        let record = LogLine {
            timestamp: Timestamp::now(),
            stream,
            line: &line,
        };
        let Ok(mut serialized) = serde_json::to_vec(&record) else {
            continue;
        };
        serialized.push(b'\n');
        let mut file = log_file.lock().await;
        let _ = file.write_all(&serialized).await;
    }
}

struct TokioProcessHandle {
    child: Child,
    stdout_task: Option<tokio::task::JoinHandle<()>>,
    stderr_task: Option<tokio::task::JoinHandle<()>>,
}

#[async_trait]
impl ProcessHandle for TokioProcessHandle {
    fn pid(&self) -> u32 {
        self.child.id().unwrap_or_default()
    }

    async fn wait(&mut self) -> Result<ProcessExit> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|err| Error::execution("failed to wait on subprocess").with_source(err))?;
        if let Some(task) = self.stdout_task.take() {
            let _ = task.await;
        }
        if let Some(task) = self.stderr_task.take() {
            let _ = task.await;
        }
        Ok(ProcessExit {
            code: status.code(),
            success: status.success(),
        })
    }

    async fn kill(&mut self) -> Result<()> {
        self.child
            .start_kill()
            .map_err(|err| Error::execution("failed to signal subprocess termination").with_source(err))
    }
}
