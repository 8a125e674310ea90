//! Debug session: a client wrapped in domain state.
//!
//! A session tracks the lifecycle state machine, the last stop, verified
//! breakpoints per source file, and two drainable queues (raw events and
//! program output). It registers itself as an event handler on its client
//! at construction, so state changes ride the client's receive task.
//!
//! # Ownership
//!
//! The session exclusively owns its client, the client its transport, and
//! the transport any child process it spawned; disposing the session
//! releases all of them.

use crate::adapter::{AttachOptions, DebugAdapter, LaunchOptions};
use crate::client::DapClient;
use crate::error::{Error, Result};
use crate::sync::Signal;
use crate::types::{
    Breakpoint, EvaluateResult, OutputRecord, Scope, SessionInfo, SessionState, StackFrame,
    StopReason, StoppedEvent, Thread, Variable,
};
use dap_protocol::{DapEvent, SourceBreakpoint};
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How long a waited continue/step will sit on the stop signal.
const STOP_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Observer of a session's events; receives `(session_id, event)`.
pub type SessionEventCallback = Arc<dyn Fn(&str, &DapEvent) + Send + Sync>;

/// Mutable session state, guarded as one unit so every event is applied
/// atomically between suspension points.
#[derive(Default)]
struct SessionCore {
    state: SessionState,
    program: Option<String>,
    threads: Vec<Thread>,
    stopped_thread_id: Option<i64>,
    stop_reason: Option<StopReason>,
    pending_events: Vec<DapEvent>,
    output: Vec<OutputRecord>,
    breakpoints: HashMap<String, Vec<Breakpoint>>,
}

struct SessionShared {
    id: String,
    core: Mutex<SessionCore>,
    stop_signal: Signal,
    callbacks: Mutex<Vec<SessionEventCallback>>,
}

impl SessionShared {
    fn core(&self) -> std::sync::MutexGuard<'_, SessionCore> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Applied from the client's receive task, in adapter-send order.
    fn handle_event(&self, event: &DapEvent) {
        {
            let mut core = self.core();
            core.pending_events.push(event.clone());

            match event.event.as_str() {
                "stopped" => {
                    let body = event.body.as_ref();
                    core.state = SessionState::Stopped;
                    core.stopped_thread_id =
                        body.and_then(|b| b.get("threadId")).and_then(Value::as_i64);
                    let reason = body
                        .and_then(|b| b.get("reason"))
                        .and_then(Value::as_str)
                        .unwrap_or("unknown");
                    core.stop_reason = Some(StopReason::from_wire(reason));
                }
                "continued" => {
                    core.state = SessionState::Running;
                    core.stopped_thread_id = None;
                    core.stop_reason = None;
                }
                "terminated" => {
                    core.state = SessionState::Terminated;
                }
                "output" => {
                    let record = event
                        .body
                        .clone()
                        .and_then(|b| serde_json::from_value::<OutputRecord>(b).ok())
                        .unwrap_or_default();
                    core.output.push(record);
                }
                // Threads come and go; they are re-queried on demand.
                "thread" => {}
                _ => {}
            }
        }

        // Signal transitions happen outside the core lock so a woken waiter
        // can read state immediately.
        match event.event.as_str() {
            "stopped" => self.stop_signal.set(),
            "continued" => self.stop_signal.clear(),
            "terminated" => self.stop_signal.set(),
            _ => {}
        }

        let callbacks: Vec<SessionEventCallback> =
            self.callbacks.lock().unwrap_or_else(|e| e.into_inner()).clone();
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(&self.id, event))).is_err() {
                tracing::warn!(session_id = %self.id, "session event callback panicked");
            }
        }
    }
}

/// A debug session with a single debug adapter.
pub struct DebugSession {
    adapter: Arc<dyn DebugAdapter>,
    client: DapClient,
    shared: Arc<SessionShared>,
    disconnected: AtomicBool,
}

impl std::fmt::Debug for DebugSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugSession")
            .field("id", &self.shared.id)
            .field("disconnected", &self.disconnected.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl DebugSession {
    /// Wrap a client in session state and hook session event handling into
    /// the client's dispatch.
    pub fn new(session_id: String, adapter: Arc<dyn DebugAdapter>, client: DapClient) -> Self {
        let shared = Arc::new(SessionShared {
            id: session_id,
            core: Mutex::new(SessionCore::default()),
            stop_signal: Signal::new(),
            callbacks: Mutex::new(Vec::new()),
        });

        let hook = shared.clone();
        client.add_event_handler(move |event| hook.handle_event(event));

        Self { adapter, client, shared, disconnected: AtomicBool::new(false) }
    }

    /// Opaque session identifier.
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// The adapter driving this session.
    pub fn adapter(&self) -> &Arc<dyn DebugAdapter> {
        &self.adapter
    }

    /// The underlying DAP client.
    pub fn client(&self) -> &DapClient {
        &self.client
    }

    /// Run `initialize` and return the adapter's capabilities. The session
    /// stays in `Initializing` until a launch or attach succeeds.
    pub async fn initialize(&self) -> Result<Value> {
        self.client.initialize().await
    }

    /// Launch a program under the debugger.
    ///
    /// Runs the full handshake (begin → configurationDone → finish),
    /// arming any breakpoints carried in `options` between `initialized`
    /// and `configurationDone` so they exist before the debuggee runs. On
    /// success the session is `Running`, unless an immediate stop already
    /// moved it to `Stopped`; on failure it stays in `Initializing` and
    /// the original error surfaces.
    pub async fn launch(&self, options: LaunchOptions) -> Result<()> {
        if options.program.is_none() {
            return Err(Error::InvalidRequest("'program' is required to launch".to_string()));
        }
        self.shared.core().program = options.program.clone();

        let launch_args = self.adapter.get_launch_arguments(&options)?;
        self.client.begin_launch(launch_args).await?;

        let mut sources: Vec<&String> = options.breakpoints.keys().collect();
        sources.sort();
        for source_path in sources {
            self.set_breakpoints(source_path, &options.breakpoints[source_path]).await?;
        }

        self.client.configuration_done().await?;
        self.client.finish_launch().await?;

        self.mark_running_after_handshake();
        Ok(())
    }

    /// Attach to an already-running debuggee. Symmetric to
    /// [`DebugSession::launch`].
    pub async fn attach(&self, options: AttachOptions) -> Result<()> {
        let attach_args = self.adapter.get_attach_arguments(&options)?;
        self.client.begin_attach(attach_args).await?;
        self.client.configuration_done().await?;
        self.client.finish_launch().await?;

        self.mark_running_after_handshake();
        Ok(())
    }

    /// Promote to `Running` at the end of the handshake, unless an event
    /// already moved the session on. A `stopped` (stop-on-entry, an armed
    /// breakpoint) or `terminated` that races the deferred response must
    /// not be overwritten.
    fn mark_running_after_handshake(&self) {
        let mut core = self.shared.core();
        if core.state == SessionState::Initializing {
            core.state = SessionState::Running;
        }
    }

    /// End the session: send DAP `disconnect`, then close the client.
    ///
    /// Idempotent; a second call is a no-op. The stop signal is raised by
    /// the `terminated` handler, so an in-flight wait is released rather
    /// than left hanging.
    pub async fn disconnect(&self, terminate: bool) -> Result<()> {
        if self.disconnected.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.shared.core().state = SessionState::Terminated;
        self.shared.stop_signal.set();

        // Best effort: the adapter may already be gone.
        if let Err(e) = self.client.disconnect_debuggee(terminate, false).await {
            tracing::debug!(session_id = %self.shared.id, error = %e, "disconnect request failed");
        }
        self.client.disconnect().await;
        Ok(())
    }

    /// Replace the breakpoints of one source file.
    ///
    /// The stored (and returned) list is the adapter's verified reply, not
    /// the requested specs. Replacement, not merge: DAP itself is
    /// source-wise replace-all.
    pub async fn set_breakpoints(
        &self,
        source_path: &str,
        breakpoints: &[SourceBreakpoint],
    ) -> Result<Vec<Breakpoint>> {
        let verified = self.client.set_breakpoints(source_path, breakpoints).await?;
        let stored: Vec<Breakpoint> = verified
            .into_iter()
            .map(|wire| Breakpoint::from_wire(source_path, wire))
            .collect();
        self.shared.core().breakpoints.insert(source_path.to_string(), stored.clone());
        Ok(stored)
    }

    /// Remove every breakpoint in a source file.
    pub async fn clear_breakpoints(&self, source_path: &str) -> Result<()> {
        self.client.set_breakpoints(source_path, &[]).await?;
        self.shared.core().breakpoints.remove(source_path);
        Ok(())
    }

    /// Activate exception breakpoint filters for the session.
    pub async fn set_exception_breakpoints(&self, filters: &[String]) -> Result<()> {
        self.client.set_exception_breakpoints(filters).await
    }

    /// Resume execution.
    ///
    /// With `wait`, blocks until the next stop (up to 300 s) and returns
    /// its record; `None` means the wait timed out or the session
    /// terminated without stopping.
    pub async fn continue_execution(
        &self,
        thread_id: Option<i64>,
        wait: bool,
    ) -> Result<Option<StoppedEvent>> {
        let tid = self.resolve_thread(thread_id);
        {
            let mut core = self.shared.core();
            core.state = SessionState::Running;
            core.stopped_thread_id = None;
            core.stop_reason = None;
        }
        // Clear before issuing: the stop that satisfies the wait must be
        // the one this continue produces.
        self.shared.stop_signal.clear();

        self.client.continue_execution(tid, false).await?;

        if wait {
            return Ok(self.wait_for_stop_event(STOP_WAIT_TIMEOUT).await);
        }
        Ok(None)
    }

    /// Step over the current line. Same wait contract as
    /// [`DebugSession::continue_execution`].
    pub async fn step_over(
        &self,
        thread_id: Option<i64>,
        wait: bool,
    ) -> Result<Option<StoppedEvent>> {
        let tid = self.resolve_thread(thread_id);
        self.shared.core().state = SessionState::Running;
        self.shared.stop_signal.clear();

        self.client.next(tid).await?;

        if wait {
            return Ok(self.wait_for_stop_event(STOP_WAIT_TIMEOUT).await);
        }
        Ok(None)
    }

    /// Step into the call at the current line.
    pub async fn step_into(
        &self,
        thread_id: Option<i64>,
        wait: bool,
    ) -> Result<Option<StoppedEvent>> {
        let tid = self.resolve_thread(thread_id);
        self.shared.core().state = SessionState::Running;
        self.shared.stop_signal.clear();

        self.client.step_in(tid).await?;

        if wait {
            return Ok(self.wait_for_stop_event(STOP_WAIT_TIMEOUT).await);
        }
        Ok(None)
    }

    /// Step out of the current function.
    pub async fn step_out(
        &self,
        thread_id: Option<i64>,
        wait: bool,
    ) -> Result<Option<StoppedEvent>> {
        let tid = self.resolve_thread(thread_id);
        self.shared.core().state = SessionState::Running;
        self.shared.stop_signal.clear();

        self.client.step_out(tid).await?;

        if wait {
            return Ok(self.wait_for_stop_event(STOP_WAIT_TIMEOUT).await);
        }
        Ok(None)
    }

    /// Fire-and-forget suspend request; the `stopped` event arrives
    /// asynchronously through the normal event path.
    pub async fn pause(&self, thread_id: Option<i64>) -> Result<()> {
        self.client.pause(thread_id.unwrap_or(1)).await
    }

    /// Wait until the session is suspended (or released by termination).
    ///
    /// Unlike the waited step family this does not clear the stop signal:
    /// if the session is already stopped it returns immediately. `None`
    /// means the timeout elapsed or the session terminated without a stop.
    pub async fn wait_for_stop(&self, timeout: Duration) -> Option<StoppedEvent> {
        self.wait_for_stop_event(timeout).await
    }

    /// Query the debuggee's threads; the result is cached for
    /// [`DebugSession::get_info`].
    pub async fn get_threads(&self) -> Result<Vec<Thread>> {
        let threads: Vec<Thread> = self
            .client
            .threads()
            .await?
            .into_iter()
            .map(|thread| Thread {
                name: if thread.name.is_empty() {
                    format!("Thread {}", thread.id)
                } else {
                    thread.name
                },
                ..thread
            })
            .collect();
        self.shared.core().threads = threads.clone();
        Ok(threads)
    }

    /// Fetch a window of a thread's call stack.
    pub async fn get_stack_trace(
        &self,
        thread_id: Option<i64>,
        start_frame: i64,
        levels: i64,
    ) -> Result<Vec<StackFrame>> {
        let tid = self.resolve_thread(thread_id);
        let (frames, _total) = self.client.stack_trace(tid, start_frame, levels).await?;
        Ok(frames)
    }

    /// Fetch the scopes of a stack frame.
    pub async fn get_scopes(&self, frame_id: i64) -> Result<Vec<Scope>> {
        self.client.scopes(frame_id).await
    }

    /// Exchange a variables reference for its children.
    pub async fn get_variables(
        &self,
        variables_reference: i64,
        filter: Option<&str>,
    ) -> Result<Vec<Variable>> {
        self.client.variables(variables_reference, filter, None, None).await
    }

    /// Evaluate an expression, optionally in a frame's context.
    pub async fn evaluate(
        &self,
        expression: &str,
        frame_id: Option<i64>,
        context: &str,
    ) -> Result<EvaluateResult> {
        self.client.evaluate(expression, frame_id, context).await
    }

    /// Atomically drain the pending event queue, in adapter-send order.
    pub fn get_pending_events(&self) -> Vec<DapEvent> {
        std::mem::take(&mut self.shared.core().pending_events)
    }

    /// Atomically drain the output queue.
    pub fn get_output(&self) -> Vec<OutputRecord> {
        std::mem::take(&mut self.shared.core().output)
    }

    /// Snapshot the session for the agent-facing surface.
    pub fn get_info(&self) -> SessionInfo {
        let core = self.shared.core();
        SessionInfo {
            session_id: self.shared.id.clone(),
            adapter: self.adapter.name().to_string(),
            state: core.state,
            program: core.program.clone(),
            threads: core.threads.clone(),
            stopped_thread_id: core.stopped_thread_id,
            stop_reason: core.stop_reason,
        }
    }

    /// Register an observer for this session's events.
    pub fn add_event_callback(&self, callback: SessionEventCallback) {
        self.shared.callbacks.lock().unwrap_or_else(|e| e.into_inner()).push(callback);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.core().state
    }

    /// The suspended thread, when stopped.
    pub fn stopped_thread_id(&self) -> Option<i64> {
        self.shared.core().stopped_thread_id
    }

    /// Why the debuggee is suspended, when stopped.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.shared.core().stop_reason
    }

    /// Verified breakpoints by source path.
    pub fn breakpoints(&self) -> HashMap<String, Vec<Breakpoint>> {
        self.shared.core().breakpoints.clone()
    }

    /// Explicit thread, else the last stopped thread, else 1 as a guard
    /// against adapters that misbehave on unspecified threads.
    fn resolve_thread(&self, thread_id: Option<i64>) -> i64 {
        thread_id.or(self.shared.core().stopped_thread_id).unwrap_or(1)
    }

    /// Wait on the stop signal and translate the outcome.
    async fn wait_for_stop_event(&self, timeout: Duration) -> Option<StoppedEvent> {
        if tokio::time::timeout(timeout, self.shared.stop_signal.wait()).await.is_err() {
            return None;
        }
        let core = self.shared.core();
        match (core.stopped_thread_id, core.stop_reason) {
            (Some(thread_id), Some(reason)) => Some(StoppedEvent { reason, thread_id }),
            // Terminated (or otherwise released) without a stop record.
            _ => None,
        }
    }
}
