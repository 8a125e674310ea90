//! Transport that spawns the adapter and frames messages over stdio.

use crate::error::TransportError;
use crate::frame::{FrameReader, write_message};
use crate::process::terminate_child;
use crate::Transport;
use async_trait::async_trait;
use dap_protocol::DapMessage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

/// Transport that spawns the adapter as a subprocess and uses stdin/stdout.
///
/// The adapter's stderr is inherited by the host process; it is not framed.
pub struct StdioTransport {
    command: Vec<String>,
    cwd: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
    child: Mutex<Option<Child>>,
    writer: Mutex<Option<ChildStdin>>,
    reader: Mutex<Option<(ChildStdout, FrameReader)>>,
    connected: AtomicBool,
}

impl StdioTransport {
    /// Create a stdio transport for the given adapter command line
    /// (e.g. `["python", "-m", "debugpy.adapter"]`).
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            cwd: None,
            env: None,
            child: Mutex::new(None),
            writer: Mutex::new(None),
            reader: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    /// Set the working directory for the adapter process.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Replace the adapter process environment.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        let Some((program, args)) = self.command.split_first() else {
            return Err(TransportError::Connection("empty adapter command".to_string()));
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        if let Some(env) = &self.env {
            command.env_clear();
            command.envs(env);
        }

        let mut child = command
            .spawn()
            .map_err(|e| TransportError::Connection(format!("failed to spawn adapter: {e}")))?;
        let stdin = child.stdin.take().ok_or_else(|| {
            TransportError::Connection("failed to capture adapter stdin".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            TransportError::Connection("failed to capture adapter stdout".to_string())
        })?;

        tracing::debug!(command = ?self.command, pid = child.id(), "spawned stdio adapter");

        *self.child.lock().await = Some(child);
        *self.writer.lock().await = Some(stdin);
        *self.reader.lock().await = Some((stdout, FrameReader::new()));
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);

        // Killing the child first unblocks any in-flight receive with EOF.
        if let Some(child) = self.child.lock().await.take() {
            terminate_child(child).await;
        }
        *self.writer.lock().await = None;
        *self.reader.lock().await = None;
    }

    async fn send(&self, message: &DapMessage) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        let Some(stdin) = writer.as_mut() else {
            return Err(TransportError::Connection("transport not connected".to_string()));
        };
        write_message(stdin, message).await
    }

    async fn receive(&self) -> Result<DapMessage, TransportError> {
        let mut reader = self.reader.lock().await;
        let Some((stdout, frames)) = reader.as_mut() else {
            return Err(TransportError::Connection("transport not connected".to_string()));
        };
        frames.read_message(stdout).await
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
