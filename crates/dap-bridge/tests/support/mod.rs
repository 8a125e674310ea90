//! Scripted adapter double shared by the integration tests.
//!
//! [`transport_pair`] yields a channel-backed [`Transport`] plus the
//! adapter-side end of both channels. [`spawn_adapter`] runs a
//! [`ScriptedBehavior`] over that end: a configurable in-test debug
//! adapter that plays the standard DAP dance (deferred launch response,
//! `initialized` before any response, breakpoint verification), with knobs
//! for the failure and race shapes the suites exercise.

#![allow(dead_code)]

use async_trait::async_trait;
use dap_bridge::{
    AttachOptions, DebugAdapter, LaunchOptions, Result as BridgeResult, TransportOptions,
};
use dap_protocol::{DapEvent, DapMessage, DapRequest, DapResponse};
use dap_transport::{Transport, TransportError};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};

/// Install a stderr subscriber for debugging test runs (`RUST_LOG`-gated).
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

// ============================================================================
// Channel-backed transport
// ============================================================================

/// Transport whose wire is a pair of in-process channels.
pub struct PairedTransport {
    to_adapter: mpsc::UnboundedSender<DapMessage>,
    from_adapter: Mutex<mpsc::UnboundedReceiver<DapMessage>>,
    connected: AtomicBool,
}

/// The adapter-side end of a [`PairedTransport`].
pub struct AdapterEnd {
    /// Messages the client sent.
    pub requests: mpsc::UnboundedReceiver<DapMessage>,
    /// Channel back into the client.
    pub sender: mpsc::UnboundedSender<DapMessage>,
}

/// Build a connected transport/adapter-end pair.
pub fn transport_pair() -> (PairedTransport, AdapterEnd) {
    let (to_adapter, requests) = mpsc::unbounded_channel();
    let (sender, from_adapter) = mpsc::unbounded_channel();
    (
        PairedTransport {
            to_adapter,
            from_adapter: Mutex::new(from_adapter),
            connected: AtomicBool::new(false),
        },
        AdapterEnd { requests, sender },
    )
}

#[async_trait]
impl Transport for PairedTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn send(&self, message: &DapMessage) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Connection("transport not connected".to_string()));
        }
        self.to_adapter
            .send(message.clone())
            .map_err(|_| TransportError::Connection("adapter side closed".to_string()))
    }

    async fn receive(&self) -> Result<DapMessage, TransportError> {
        match self.from_adapter.lock().await.recv().await {
            Some(message) => Ok(message),
            None => Err(dap_protocol::ProtocolError::UnexpectedEof("header").into()),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Adapter-side scripting
// ============================================================================

/// Sequence-numbered writer for the adapter side of the wire.
pub struct AdapterIo {
    seq: i64,
    sender: mpsc::UnboundedSender<DapMessage>,
}

impl AdapterIo {
    pub fn new(sender: mpsc::UnboundedSender<DapMessage>) -> Self {
        Self { seq: 0, sender }
    }

    fn next_seq(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }

    /// Answer `request` successfully with `body`.
    pub fn respond(&mut self, request: &DapRequest, body: Value) {
        self.respond_with(request, true, None, Some(body));
    }

    /// Answer `request` with full control over the response envelope.
    pub fn respond_with(
        &mut self,
        request: &DapRequest,
        success: bool,
        message: Option<&str>,
        body: Option<Value>,
    ) {
        let response = DapResponse {
            seq: self.next_seq(),
            msg_type: "response".to_string(),
            request_seq: request.seq,
            success,
            command: request.command.clone(),
            message: message.map(str::to_string),
            body,
        };
        let _ = self.sender.send(DapMessage::Response(response));
    }

    /// Emit an adapter event.
    pub fn emit(&mut self, event: &str, body: Option<Value>) {
        let envelope = DapEvent::new(self.next_seq(), event, body);
        let _ = self.sender.send(DapMessage::Event(envelope));
    }
}

/// Configurable default script for the adapter task.
#[derive(Clone)]
pub struct ScriptedBehavior {
    /// Report requested breakpoints as verified, assigning increasing ids.
    pub verify_breakpoints: bool,
    /// `stopped` body emitted after the deferred launch/attach response.
    pub stop_on_launch: Option<Value>,
    /// Emit `stopped{reason:"step"}` after answering a step request.
    pub stop_on_step: bool,
    /// Send the `stopped` event *before* the step response (race shape).
    pub stop_before_step_response: bool,
    /// `stopped` body emitted after answering `continue`.
    pub stop_on_continue: Option<Value>,
    /// Commands to silently ignore (never answered).
    pub ignore: HashSet<String>,
    /// Commands to answer with `success: false`.
    pub fail_commands: HashSet<String>,
    /// Every request the adapter received, in arrival order.
    pub log: Arc<StdMutex<Vec<DapRequest>>>,
    pending_launch: Option<DapRequest>,
    next_breakpoint_id: i64,
}

impl Default for ScriptedBehavior {
    fn default() -> Self {
        Self {
            verify_breakpoints: true,
            stop_on_launch: None,
            stop_on_step: true,
            stop_before_step_response: false,
            stop_on_continue: None,
            ignore: HashSet::new(),
            fail_commands: HashSet::new(),
            log: Arc::new(StdMutex::new(Vec::new())),
            pending_launch: None,
            next_breakpoint_id: 0,
        }
    }
}

impl ScriptedBehavior {
    /// Commands seen so far, in arrival order.
    pub fn commands(log: &Arc<StdMutex<Vec<DapRequest>>>) -> Vec<String> {
        log.lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|request| request.command.clone())
            .collect()
    }

    /// Handle one request per the configured script.
    pub fn handle(&mut self, request: DapRequest, io: &mut AdapterIo) {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).push(request.clone());

        if self.ignore.contains(&request.command) {
            return;
        }
        if self.fail_commands.contains(&request.command) {
            io.respond_with(
                &request,
                false,
                Some(&format!("scripted failure for '{}'", request.command)),
                None,
            );
            return;
        }

        match request.command.as_str() {
            "initialize" => {
                io.respond(
                    &request,
                    json!({
                        "supportsConfigurationDoneRequest": true,
                        "supportsConditionalBreakpoints": true,
                    }),
                );
            }
            "launch" | "attach" => {
                // Deferred: the response waits for configurationDone.
                self.pending_launch = Some(request);
                io.emit("initialized", None);
            }
            "setBreakpoints" => {
                let requested = request
                    .arguments
                    .as_ref()
                    .and_then(|a| a.get("breakpoints"))
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                let verified: Vec<Value> = requested
                    .iter()
                    .map(|bp| {
                        self.next_breakpoint_id += 1;
                        json!({
                            "id": self.next_breakpoint_id,
                            "verified": self.verify_breakpoints,
                            "line": bp.get("line").cloned().unwrap_or(Value::Null),
                        })
                    })
                    .collect();
                io.respond(&request, json!({"breakpoints": verified}));
            }
            "setExceptionBreakpoints" => io.respond(&request, json!({})),
            "configurationDone" => {
                io.respond(&request, json!({}));
                if let Some(launch) = self.pending_launch.take() {
                    io.respond(&launch, json!({}));
                    if let Some(stop) = self.stop_on_launch.clone() {
                        io.emit("stopped", Some(stop));
                    }
                }
            }
            "threads" => {
                io.respond(&request, json!({"threads": [{"id": 1, "name": "MainThread"}]}));
            }
            "stackTrace" => {
                io.respond(
                    &request,
                    json!({
                        "stackFrames": [{
                            "id": 100,
                            "name": "main",
                            "source": {"path": "/a.py", "name": "a.py"},
                            "line": 10,
                            "column": 1
                        }],
                        "totalFrames": 1
                    }),
                );
            }
            "scopes" => {
                io.respond(
                    &request,
                    json!({"scopes": [{"name": "Locals", "variablesReference": 7, "expensive": false}]}),
                );
            }
            "variables" => {
                io.respond(
                    &request,
                    json!({"variables": [{"name": "x", "value": "42", "type": "int", "variablesReference": 0}]}),
                );
            }
            "evaluate" => {
                io.respond(&request, json!({"result": "42", "variablesReference": 0}));
            }
            "continue" => {
                io.respond(&request, json!({"allThreadsContinued": true}));
                if let Some(stop) = self.stop_on_continue.clone() {
                    io.emit("stopped", Some(stop));
                }
            }
            "next" | "stepIn" | "stepOut" => {
                let stop = json!({"reason": "step", "threadId": 1});
                if self.stop_before_step_response {
                    io.emit("stopped", Some(stop));
                    io.respond(&request, json!({}));
                } else {
                    io.respond(&request, json!({}));
                    if self.stop_on_step {
                        io.emit("stopped", Some(stop));
                    }
                }
            }
            "pause" => {
                io.respond(&request, json!({}));
                io.emit("stopped", Some(json!({"reason": "pause", "threadId": 1})));
            }
            "disconnect" => {
                io.respond(&request, json!({}));
                io.emit("terminated", None);
            }
            other => {
                io.respond_with(&request, false, Some(&format!("Unknown command: {other}")), None);
            }
        }
    }
}

/// Run a scripted behavior over an adapter end until the client hangs up.
pub fn spawn_adapter(
    mut end: AdapterEnd,
    mut behavior: ScriptedBehavior,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut io = AdapterIo::new(end.sender.clone());
        while let Some(message) = end.requests.recv().await {
            if let DapMessage::Request(request) = message {
                behavior.handle(request, &mut io);
            }
        }
    })
}

// ============================================================================
// A DebugAdapter backed by the scripted double
// ============================================================================

/// In-test adapter: each `create_transport` wires a fresh scripted task.
pub struct TestAdapter {
    name: &'static str,
    behavior: ScriptedBehavior,
    /// Requests the scripted adapter received (shared with the behavior).
    pub log: Arc<StdMutex<Vec<DapRequest>>>,
    /// Sender into the most recently created transport's client side, for
    /// emitting unprompted events from tests.
    pub emitter: Arc<StdMutex<Option<mpsc::UnboundedSender<DapMessage>>>>,
}

impl TestAdapter {
    pub fn new(name: &'static str) -> Self {
        Self::with_behavior(name, ScriptedBehavior::default())
    }

    pub fn with_behavior(name: &'static str, behavior: ScriptedBehavior) -> Self {
        let log = behavior.log.clone();
        Self { name, behavior, log, emitter: Arc::new(StdMutex::new(None)) }
    }

    /// Commands the adapter has seen, in arrival order.
    pub fn commands(&self) -> Vec<String> {
        ScriptedBehavior::commands(&self.log)
    }

    /// Writer for unprompted adapter events (panics if no transport yet).
    pub fn io(&self) -> AdapterIo {
        let sender = self
            .emitter
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap();
        AdapterIo::new(sender)
    }
}

impl DebugAdapter for TestAdapter {
    fn name(&self) -> &str {
        self.name
    }

    fn adapter_id(&self) -> &str {
        self.name
    }

    fn file_extensions(&self) -> &[&'static str] {
        &[".py"]
    }

    fn aliases(&self) -> &[&'static str] {
        &["py"]
    }

    fn create_transport(&self, _options: &TransportOptions) -> BridgeResult<Box<dyn Transport>> {
        let (transport, end) = transport_pair();
        *self.emitter.lock().unwrap_or_else(|e| e.into_inner()) = Some(end.sender.clone());
        spawn_adapter(end, self.behavior.clone());
        Ok(Box::new(transport))
    }

    fn get_launch_arguments(&self, options: &LaunchOptions) -> BridgeResult<Value> {
        let mut arguments = json!({
            "program": options.program,
            "args": options.args,
            "stopOnEntry": options.stop_on_entry,
        });
        if let (Some(object), extra) = (arguments.as_object_mut(), &options.extra) {
            for (key, value) in extra {
                object.insert(key.clone(), value.clone());
            }
        }
        Ok(arguments)
    }

    fn get_attach_arguments(&self, options: &AttachOptions) -> BridgeResult<Value> {
        Ok(json!({
            "host": options.host.clone().unwrap_or_else(|| "127.0.0.1".to_string()),
            "port": options.port,
        }))
    }
}
