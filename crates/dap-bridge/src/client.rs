//! Async DAP client.
//!
//! The client binds one transport, numbers outbound requests, correlates
//! responses back to their waiters by `request_seq`, and dispatches
//! asynchronous events to registered handlers from a background receive
//! task.
//!
//! # The launch/attach handshake
//!
//! DAP defers the `launch`/`attach` response: the adapter answers only
//! after `configurationDone`, so that breakpoints can be armed before the
//! debuggee runs. The client exposes the dance as three operations:
//!
//! 1. [`DapClient::begin_launch`] (or `begin_attach`) sends the request,
//!    waits for the `initialized` event, and retains the outstanding
//!    response waiter.
//! 2. The caller arms breakpoints, then [`DapClient::configuration_done`].
//! 3. [`DapClient::finish_launch`] awaits the deferred response.

use crate::error::{Error, Result};
use crate::sync::Signal;
use dap_protocol::{
    ContinueArguments, ContinueResponseBody, DapEvent, DapMessage, DapRequest, DapResponse,
    DisconnectArguments, EvaluateArguments, EvaluateResponseBody, InitializeRequestArguments,
    NextArguments, PauseArguments, Scope, ScopesArguments, ScopesResponseBody,
    SetBreakpointsArguments, SetBreakpointsResponseBody, SetExceptionBreakpointsArguments, Source,
    SourceBreakpoint, StackFrame, StackTraceArguments, StackTraceResponseBody, StepInArguments,
    StepOutArguments, Thread, ThreadsResponseBody, Variable, VariablesArguments,
    VariablesResponseBody,
};
use dap_transport::Transport;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Budget for the `initialized` event during the handshake.
const INITIALIZED_TIMEOUT: Duration = Duration::from_secs(30);

/// Grace period for the receive task to wind down on disconnect.
const RECEIVE_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Handle returned by [`DapClient::add_event_handler`]; removal is by
/// handle, never by comparing handler identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u64);

/// An event observer. Called from the receive task; panics are contained.
pub type EventHandler = Arc<dyn Fn(&DapEvent) + Send + Sync>;

struct PendingLaunch {
    seq: i64,
    command: &'static str,
    waiter: oneshot::Receiver<DapResponse>,
}

struct ClientInner {
    transport: Box<dyn Transport>,
    adapter_id: String,
    seq: AtomicI64,
    pending: Mutex<HashMap<i64, oneshot::Sender<DapResponse>>>,
    handlers: Mutex<BTreeMap<HandlerId, EventHandler>>,
    next_handler_id: AtomicU64,
    capabilities: Mutex<Value>,
    initialized_signal: Signal,
    stopped_signal: Signal,
    last_stop_info: Mutex<Value>,
    pending_launch: Mutex<Option<PendingLaunch>>,
    receive_task: Mutex<Option<JoinHandle<()>>>,
}

impl ClientInner {
    fn next_seq(&self) -> i64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn deregister(&self, seq: i64) {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).remove(&seq);
    }

    /// Drop every pending waiter, failing their receivers.
    fn cancel_pending(&self) {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn handle_response(&self, response: DapResponse) {
        let sender = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&response.request_seq);
        match sender {
            Some(sender) => {
                // The waiter may have timed out and gone away; tolerated.
                let _ = sender.send(response);
            }
            None => {
                tracing::warn!(
                    request_seq = response.request_seq,
                    command = %response.command,
                    "response for unknown or cancelled request"
                );
            }
        }
    }

    fn handle_event(&self, event: &DapEvent) {
        match event.event.as_str() {
            "initialized" => self.initialized_signal.set(),
            "stopped" => {
                let body = event
                    .body
                    .clone()
                    .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
                *self.last_stop_info.lock().unwrap_or_else(|e| e.into_inner()) = body;
                self.stopped_signal.set();
            }
            _ => {}
        }

        let handlers: Vec<EventHandler> = self
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for handler in handlers {
            // One bad observer must not poison the others or the loop.
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                tracing::warn!(event = %event.event, "event handler panicked");
            }
        }
    }

    async fn receive_loop(self: Arc<Self>) {
        loop {
            match self.transport.receive().await {
                Ok(DapMessage::Response(response)) => self.handle_response(response),
                Ok(DapMessage::Event(event)) => self.handle_event(&event),
                Ok(other) => {
                    tracing::debug!(?other, "ignoring message with non-core type");
                }
                Err(e) => {
                    if self.transport.is_connected() {
                        tracing::warn!(error = %e, "receive loop terminated");
                    } else {
                        tracing::debug!(error = %e, "receive loop closed");
                    }
                    // The stream is gone; nothing will complete these.
                    self.cancel_pending();
                    break;
                }
            }
        }
    }
}

/// Async DAP client bound to one transport.
///
/// All methods take `&self`; the client is internally synchronized and a
/// session drives it from whichever task is handling the current command.
pub struct DapClient {
    inner: Arc<ClientInner>,
}

impl DapClient {
    /// Create a client over `transport`, advertising `adapter_id` during
    /// `initialize`. No I/O happens until [`DapClient::connect`].
    pub fn new(transport: Box<dyn Transport>, adapter_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                adapter_id: adapter_id.into(),
                seq: AtomicI64::new(0),
                pending: Mutex::new(HashMap::new()),
                handlers: Mutex::new(BTreeMap::new()),
                next_handler_id: AtomicU64::new(0),
                capabilities: Mutex::new(Value::Object(serde_json::Map::new())),
                initialized_signal: Signal::new(),
                stopped_signal: Signal::new(),
                last_stop_info: Mutex::new(Value::Object(serde_json::Map::new())),
                pending_launch: Mutex::new(None),
                receive_task: Mutex::new(None),
            }),
        }
    }

    /// Connect the transport and start the background receive task.
    pub async fn connect(&self) -> Result<()> {
        self.inner.transport.connect().await?;
        let task = tokio::spawn(self.inner.clone().receive_loop());
        *self.inner.receive_task.lock().unwrap_or_else(|e| e.into_inner()) = Some(task);
        Ok(())
    }

    /// Stop the receive task, disconnect the transport, and cancel every
    /// outstanding waiter.
    pub async fn disconnect(&self) {
        let task = self.inner.receive_task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = task {
            task.abort();
            let _ = tokio::time::timeout(RECEIVE_JOIN_TIMEOUT, task).await;
        }
        self.inner.transport.disconnect().await;
        self.inner.cancel_pending();
    }

    /// Register an event observer. Returns the handle used for removal.
    pub fn add_event_handler(&self, handler: impl Fn(&DapEvent) + Send + Sync + 'static) -> HandlerId {
        let id = HandlerId(self.inner.next_handler_id.fetch_add(1, Ordering::SeqCst));
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::new(handler));
        id
    }

    /// Remove a previously registered observer. Returns whether it existed.
    pub fn remove_event_handler(&self, id: HandlerId) -> bool {
        self.inner.handlers.lock().unwrap_or_else(|e| e.into_inner()).remove(&id).is_some()
    }

    /// Send `command` and await its response with the default timeout.
    pub async fn request(&self, command: &str, arguments: Option<Value>) -> Result<DapResponse> {
        self.request_with_timeout(command, arguments, DEFAULT_REQUEST_TIMEOUT).await
    }

    /// Send `command` and await its response.
    ///
    /// The waiter is deregistered on every path. A `success: false`
    /// response is promoted to [`Error::Dap`]; the timeout cancels only
    /// this request.
    pub async fn request_with_timeout(
        &self,
        command: &str,
        arguments: Option<Value>,
        timeout: Duration,
    ) -> Result<DapResponse> {
        let seq = self.inner.next_seq();
        let waiter = self.send_tracked(seq, command, arguments).await?;

        let response = match tokio::time::timeout(timeout, waiter).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                self.inner.deregister(seq);
                return Err(Error::Connection(format!(
                    "connection closed while waiting for response to '{command}'"
                )));
            }
            Err(_) => {
                self.inner.deregister(seq);
                return Err(Error::Timeout(format!("response to '{command}'")));
            }
        };
        self.inner.deregister(seq);

        if !response.success {
            return Err(Error::Dap {
                command: command.to_string(),
                message: response
                    .message
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            });
        }
        Ok(response)
    }

    /// Register a waiter under `seq` and write the request envelope.
    async fn send_tracked(
        &self,
        seq: i64,
        command: &str,
        arguments: Option<Value>,
    ) -> Result<oneshot::Receiver<DapResponse>> {
        let request = DapRequest::new(seq, command, arguments);
        let (sender, receiver) = oneshot::channel();
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(seq, sender);

        tracing::debug!(seq, command, "sending request");
        if let Err(e) = self.inner.transport.send(&DapMessage::Request(request)).await {
            self.inner.deregister(seq);
            return Err(e.into());
        }
        Ok(receiver)
    }

    /// Send `initialize` with the bridge's fixed capability claims and
    /// cache what the adapter reports back.
    pub async fn initialize(&self) -> Result<Value> {
        let claims = InitializeRequestArguments {
            client_id: Some("dap-bridge".to_string()),
            client_name: Some("DAP Bridge".to_string()),
            adapter_id: self.inner.adapter_id.clone(),
            lines_start_at1: Some(true),
            columns_start_at1: Some(true),
            path_format: Some("path".to_string()),
            supports_variable_type: Some(true),
            supports_variable_paging: Some(true),
            supports_run_in_terminal_request: Some(false),
            supports_memory_references: Some(false),
            supports_progress_reporting: Some(false),
            supports_invalidated_event: Some(true),
        };
        let response = self.request("initialize", Some(to_arguments(&claims)?)).await?;
        if let Some(body) = &response.body {
            *self.inner.capabilities.lock().unwrap_or_else(|e| e.into_inner()) = body.clone();
        }
        Ok(self.capabilities())
    }

    /// Send `configurationDone`, completing the breakpoint-arming phase.
    pub async fn configuration_done(&self) -> Result<()> {
        self.request("configurationDone", None).await?;
        Ok(())
    }

    /// Start the launch handshake: send `launch`, wait for `initialized`,
    /// retain the deferred response waiter for [`DapClient::finish_launch`].
    pub async fn begin_launch(&self, arguments: Value) -> Result<()> {
        self.begin_sequence("launch", arguments).await
    }

    /// Start the attach handshake; otherwise identical to
    /// [`DapClient::begin_launch`].
    pub async fn begin_attach(&self, arguments: Value) -> Result<()> {
        self.begin_sequence("attach", arguments).await
    }

    async fn begin_sequence(&self, command: &'static str, arguments: Value) -> Result<()> {
        if self.inner.pending_launch.lock().unwrap_or_else(|e| e.into_inner()).is_some() {
            return Err(Error::InvalidRequest(
                "a launch or attach is already in progress".to_string(),
            ));
        }

        // Reset both signals before sending: the edges we are about to wait
        // for must be the ones this request produces.
        self.inner.initialized_signal.clear();
        self.inner.stopped_signal.clear();

        let seq = self.inner.next_seq();
        let waiter = self.send_tracked(seq, command, Some(arguments)).await?;
        *self.inner.pending_launch.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(PendingLaunch { seq, command, waiter });

        if tokio::time::timeout(INITIALIZED_TIMEOUT, self.inner.initialized_signal.wait())
            .await
            .is_err()
        {
            self.inner.deregister(seq);
            self.inner.pending_launch.lock().unwrap_or_else(|e| e.into_inner()).take();
            return Err(Error::Timeout("initialized event".to_string()));
        }
        Ok(())
    }

    /// Await the deferred `launch`/`attach` response with the default
    /// timeout, promoting a failure response to [`Error::Dap`].
    pub async fn finish_launch(&self) -> Result<()> {
        self.finish_launch_with_timeout(DEFAULT_REQUEST_TIMEOUT).await
    }

    /// Await the deferred `launch`/`attach` response.
    pub async fn finish_launch_with_timeout(&self, timeout: Duration) -> Result<()> {
        let Some(launch) =
            self.inner.pending_launch.lock().unwrap_or_else(|e| e.into_inner()).take()
        else {
            return Err(Error::InvalidRequest("no launch or attach in progress".to_string()));
        };

        let response = match tokio::time::timeout(timeout, launch.waiter).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                self.inner.deregister(launch.seq);
                return Err(Error::Connection(format!(
                    "connection closed while waiting for {} response",
                    launch.command
                )));
            }
            Err(_) => {
                self.inner.deregister(launch.seq);
                return Err(Error::Timeout(format!("{} response", launch.command)));
            }
        };
        self.inner.deregister(launch.seq);

        if !response.success {
            return Err(Error::Dap {
                command: launch.command.to_string(),
                message: response.message.unwrap_or_else(|| "Unknown error".to_string()),
            });
        }
        Ok(())
    }

    /// Clear the stopped signal, then wait for the next `stopped` event and
    /// return a copy of its body.
    pub async fn wait_for_stop(&self, timeout: Duration) -> Result<Value> {
        self.inner.stopped_signal.clear();
        if tokio::time::timeout(timeout, self.inner.stopped_signal.wait()).await.is_err() {
            return Err(Error::Timeout("stop event".to_string()));
        }
        Ok(self.last_stop_info())
    }

    // ========================================================================
    // Operation wrappers
    // ========================================================================

    /// Replace the breakpoint set of a source file; returns the adapter's
    /// verified list.
    pub async fn set_breakpoints(
        &self,
        source_path: &str,
        breakpoints: &[SourceBreakpoint],
    ) -> Result<Vec<dap_protocol::Breakpoint>> {
        let arguments = SetBreakpointsArguments {
            source: Source::from_path(source_path),
            breakpoints: breakpoints.to_vec(),
        };
        let response = self.request("setBreakpoints", Some(to_arguments(&arguments)?)).await?;
        let body: SetBreakpointsResponseBody = response.parse_body()?;
        Ok(body.breakpoints)
    }

    /// Activate exception breakpoint filters.
    pub async fn set_exception_breakpoints(&self, filters: &[String]) -> Result<()> {
        let arguments = SetExceptionBreakpointsArguments { filters: filters.to_vec() };
        self.request("setExceptionBreakpoints", Some(to_arguments(&arguments)?)).await?;
        Ok(())
    }

    /// Resume a thread; returns whether all threads were continued.
    pub async fn continue_execution(&self, thread_id: i64, single_thread: bool) -> Result<bool> {
        let arguments = ContinueArguments { thread_id, single_thread };
        let response = self.request("continue", Some(to_arguments(&arguments)?)).await?;
        let body: ContinueResponseBody = response.parse_body()?;
        Ok(body.all_threads_continued)
    }

    /// Step over the current line.
    pub async fn next(&self, thread_id: i64) -> Result<()> {
        self.request("next", Some(to_arguments(&NextArguments { thread_id })?)).await?;
        Ok(())
    }

    /// Step into the call at the current line.
    pub async fn step_in(&self, thread_id: i64) -> Result<()> {
        self.request("stepIn", Some(to_arguments(&StepInArguments { thread_id })?)).await?;
        Ok(())
    }

    /// Step out of the current function.
    pub async fn step_out(&self, thread_id: i64) -> Result<()> {
        self.request("stepOut", Some(to_arguments(&StepOutArguments { thread_id })?)).await?;
        Ok(())
    }

    /// Ask the adapter to suspend a thread; the `stopped` event arrives
    /// asynchronously.
    pub async fn pause(&self, thread_id: i64) -> Result<()> {
        self.request("pause", Some(to_arguments(&PauseArguments { thread_id })?)).await?;
        Ok(())
    }

    /// List the debuggee's threads.
    pub async fn threads(&self) -> Result<Vec<Thread>> {
        let response = self.request("threads", None).await?;
        let body: ThreadsResponseBody = response.parse_body()?;
        Ok(body.threads)
    }

    /// Fetch a window of a thread's call stack; returns the frames and the
    /// adapter's total frame count (0 when unreported).
    pub async fn stack_trace(
        &self,
        thread_id: i64,
        start_frame: i64,
        levels: i64,
    ) -> Result<(Vec<StackFrame>, i64)> {
        let arguments = StackTraceArguments { thread_id, start_frame, levels };
        let response = self.request("stackTrace", Some(to_arguments(&arguments)?)).await?;
        let body: StackTraceResponseBody = response.parse_body()?;
        let total = body.total_frames.unwrap_or(0);
        Ok((body.stack_frames, total))
    }

    /// Fetch the scopes of a stack frame.
    pub async fn scopes(&self, frame_id: i64) -> Result<Vec<Scope>> {
        let arguments = ScopesArguments { frame_id };
        let response = self.request("scopes", Some(to_arguments(&arguments)?)).await?;
        let body: ScopesResponseBody = response.parse_body()?;
        Ok(body.scopes)
    }

    /// Exchange a variables reference for its children.
    pub async fn variables(
        &self,
        variables_reference: i64,
        filter: Option<&str>,
        start: Option<i64>,
        count: Option<i64>,
    ) -> Result<Vec<Variable>> {
        let arguments = VariablesArguments {
            variables_reference,
            filter: filter.map(str::to_string),
            start,
            count,
        };
        let response = self.request("variables", Some(to_arguments(&arguments)?)).await?;
        let body: VariablesResponseBody = response.parse_body()?;
        Ok(body.variables)
    }

    /// Evaluate an expression, optionally in a frame's context.
    pub async fn evaluate(
        &self,
        expression: &str,
        frame_id: Option<i64>,
        context: &str,
    ) -> Result<EvaluateResponseBody> {
        let arguments = EvaluateArguments {
            expression: expression.to_string(),
            frame_id,
            context: context.to_string(),
        };
        let response = self.request("evaluate", Some(to_arguments(&arguments)?)).await?;
        response.parse_body().map_err(Error::Protocol)
    }

    /// Send the DAP `disconnect` request.
    pub async fn disconnect_debuggee(&self, terminate: bool, restart: bool) -> Result<()> {
        let arguments = DisconnectArguments { terminate_debuggee: terminate, restart };
        self.request("disconnect", Some(to_arguments(&arguments)?)).await?;
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Adapter capabilities cached from the `initialize` response.
    pub fn capabilities(&self) -> Value {
        self.inner.capabilities.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Body of the most recent `stopped` event.
    pub fn last_stop_info(&self) -> Value {
        self.inner.last_stop_info.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Whether the underlying transport is connected.
    pub fn is_connected(&self) -> bool {
        self.inner.transport.is_connected()
    }
}

impl Drop for DapClient {
    fn drop(&mut self) {
        // Drop is synchronous; aborting the receive task releases the last
        // Arc so the transport (and any child it owns) is torn down.
        if let Some(task) = self.inner.receive_task.lock().unwrap_or_else(|e| e.into_inner()).take()
        {
            task.abort();
        }
    }
}

fn to_arguments<T: serde::Serialize>(arguments: &T) -> Result<Value> {
    serde_json::to_value(arguments)
        .map_err(|e| Error::Protocol(dap_protocol::ProtocolError::Serialize(e.to_string())))
}
