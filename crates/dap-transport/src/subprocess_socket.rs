//! Transport for adapters that run a DAP server on a TCP port.
//!
//! Some adapters (js-debug, java-debug in server mode) do not speak DAP on
//! stdio: they are handed a port, start listening on it, and the client
//! connects. This transport spawns the child with the port argument
//! rendered from a template, polls the port until it accepts, then runs an
//! ordinary [`SocketTransport`] against it.

use crate::error::TransportError;
use crate::process::terminate_child;
use crate::socket::SocketTransport;
use crate::Transport;
use async_trait::async_trait;
use dap_protocol::DapMessage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Default deadline for the child to start accepting connections.
const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval and per-attempt budget of the readiness probes.
const PROBE_INTERVAL: Duration = Duration::from_millis(50);

/// Transport that spawns an adapter subprocess and connects to it via TCP.
pub struct SubprocessSocketTransport {
    command: Vec<String>,
    host: String,
    cwd: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
    startup_timeout: Duration,
    port_arg_template: String,
    port: StdMutex<Option<u16>>,
    child: Mutex<Option<Child>>,
    socket: StdMutex<Option<Arc<SocketTransport>>>,
}

impl SubprocessSocketTransport {
    /// Create a transport for the given adapter command line. The rendered
    /// port argument is appended to the command on connect.
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            host: "127.0.0.1".to_string(),
            cwd: None,
            env: None,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            port_arg_template: "{port}".to_string(),
            port: StdMutex::new(None),
            child: Mutex::new(None),
            socket: StdMutex::new(None),
        }
    }

    /// Use a fixed port instead of picking a free one.
    pub fn with_port(self, port: u16) -> Self {
        *self.port.lock().unwrap_or_else(|e| e.into_inner()) = Some(port);
        self
    }

    /// Host the adapter server binds to.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
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

    /// Override the startup deadline.
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Template for the appended port argument. Receives `{host}` and
    /// `{port}` placeholders, e.g. `"--listen={host}:{port}"` or the bare
    /// `"{port}"` default.
    pub fn with_port_arg_template(mut self, template: impl Into<String>) -> Self {
        self.port_arg_template = template.into();
        self
    }

    /// The port the adapter server is (or will be) listening on.
    pub fn port(&self) -> Option<u16> {
        *self.port.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn socket_handle(&self) -> Option<Arc<SocketTransport>> {
        self.socket.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Bind to port 0 and read back the assigned port.
    ///
    /// Between dropping the listener and the child binding, another process
    /// could grab the port; the pick is a best-effort hint and `connect`
    /// may simply be retried.
    async fn find_free_port(&self) -> Result<u16, TransportError> {
        let listener = TcpListener::bind((self.host.as_str(), 0))
            .await
            .map_err(|e| TransportError::Connection(format!("failed to pick free port: {e}")))?;
        let port = listener
            .local_addr()
            .map_err(|e| TransportError::Connection(format!("failed to read bound port: {e}")))?
            .port();
        Ok(port)
    }

    /// Poll `host:port` until the server accepts, the child exits, or the
    /// startup deadline elapses.
    async fn wait_for_server(&self, port: u16) -> Result<(), TransportError> {
        let deadline = Instant::now() + self.startup_timeout;

        loop {
            {
                let mut guard = self.child.lock().await;
                if let Some(child) = guard.as_mut() {
                    if let Ok(Some(status)) = child.try_wait() {
                        let stderr = read_stderr_tail(child).await;
                        let detail = if stderr.is_empty() {
                            String::new()
                        } else {
                            format!(": {stderr}")
                        };
                        return Err(TransportError::Connection(format!(
                            "adapter process exited with {status}{detail}"
                        )));
                    }
                }
            }

            match tokio::time::timeout(
                PROBE_INTERVAL,
                TcpStream::connect((self.host.as_str(), port)),
            )
            .await
            {
                Ok(Ok(_probe)) => return Ok(()),
                _ => tokio::time::sleep(PROBE_INTERVAL).await,
            }

            if Instant::now() >= deadline {
                return Err(TransportError::Connection(format!(
                    "adapter server did not start within {:?} on {}:{port}",
                    self.startup_timeout, self.host
                )));
            }
        }
    }

    /// Tear down everything `connect` built before reporting its failure,
    /// so the caller can retry from a clean slate.
    async fn abort_connect(&self) {
        if let Some(child) = self.child.lock().await.take() {
            terminate_child(child).await;
        }
        let socket = self.socket.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(socket) = socket {
            socket.disconnect().await;
        }
    }
}

#[async_trait]
impl Transport for SubprocessSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        if self.is_connected() {
            return Ok(());
        }

        let port = match self.port() {
            Some(port) => port,
            None => {
                let port = self.find_free_port().await?;
                *self.port.lock().unwrap_or_else(|e| e.into_inner()) = Some(port);
                port
            }
        };

        let Some((program, args)) = self.command.split_first() else {
            return Err(TransportError::Connection("empty adapter command".to_string()));
        };
        let port_arg = render_port_arg(&self.port_arg_template, &self.host, port);

        let mut command = Command::new(program);
        command
            .args(args)
            .arg(&port_arg)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        if let Some(env) = &self.env {
            command.env_clear();
            command.envs(env);
        }

        let child = command
            .spawn()
            .map_err(|e| TransportError::Connection(format!("failed to spawn adapter: {e}")))?;
        tracing::debug!(command = ?self.command, %port_arg, pid = child.id(), "spawned socket adapter");
        *self.child.lock().await = Some(child);

        if let Err(e) = self.wait_for_server(port).await {
            self.abort_connect().await;
            return Err(e);
        }

        let socket = Arc::new(SocketTransport::new(self.host.clone(), port));
        if let Err(e) = socket.connect().await {
            self.abort_connect().await;
            return Err(e);
        }
        *self.socket.lock().unwrap_or_else(|e| e.into_inner()) = Some(socket);
        Ok(())
    }

    async fn disconnect(&self) {
        let socket = self.socket.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(socket) = socket {
            socket.disconnect().await;
        }
        if let Some(child) = self.child.lock().await.take() {
            terminate_child(child).await;
        }
    }

    async fn send(&self, message: &DapMessage) -> Result<(), TransportError> {
        let Some(socket) = self.socket_handle() else {
            return Err(TransportError::Connection("transport not connected".to_string()));
        };
        socket.send(message).await
    }

    async fn receive(&self) -> Result<DapMessage, TransportError> {
        let Some(socket) = self.socket_handle() else {
            return Err(TransportError::Connection("transport not connected".to_string()));
        };
        socket.receive().await
    }

    fn is_connected(&self) -> bool {
        self.socket_handle().is_some_and(|socket| socket.is_connected())
    }
}

/// Substitute `{host}` and `{port}` placeholders in the port argument.
fn render_port_arg(template: &str, host: &str, port: u16) -> String {
    template.replace("{host}", host).replace("{port}", &port.to_string())
}

/// Best-effort read of whatever the dead child wrote to stderr.
async fn read_stderr_tail(child: &mut Child) -> String {
    let Some(mut stderr) = child.stderr.take() else {
        return String::new();
    };
    let mut buffer = [0u8; 4096];
    match tokio::time::timeout(Duration::from_millis(100), stderr.read(&mut buffer)).await {
        Ok(Ok(n)) => String::from_utf8_lossy(&buffer[..n]).trim_end().to_string(),
        _ => String::new(),
    }
}
