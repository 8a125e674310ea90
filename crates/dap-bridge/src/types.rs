//! Domain types observable through the agent-facing surface.
//!
//! Wire-mirroring records (threads, frames, scopes, variables, evaluate
//! results) come straight from `dap-protocol`; the types here exist only
//! where the session layer adds meaning of its own.

use dap_protocol::Source;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use dap_protocol::EvaluateResponseBody as EvaluateResult;
pub use dap_protocol::{Scope, StackFrame, Thread, Variable};

/// Lifecycle state of a debug session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Constructed; may or may not have completed `initialize`.
    #[default]
    Initializing,
    /// The debuggee is progressing.
    Running,
    /// The debuggee is suspended; stopped thread and reason are defined.
    Stopped,
    /// The debuggee ended or was disconnected. Terminal.
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Initializing => "initializing",
            SessionState::Running => "running",
            SessionState::Stopped => "stopped",
            SessionState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Why the debuggee suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A source breakpoint was hit. Also the fallback for reasons outside
    /// this vocabulary.
    Breakpoint,
    /// A step request completed.
    Step,
    /// An exception was raised.
    Exception,
    /// A pause request took effect.
    Pause,
    /// Stopped on entry before running any code.
    Entry,
    /// A goto target was reached.
    Goto,
    /// A function breakpoint was hit.
    FunctionBreakpoint,
    /// A data breakpoint was hit.
    DataBreakpoint,
}

impl StopReason {
    /// Decode an adapter-supplied reason string.
    ///
    /// Adapters spell the multi-word reasons with spaces; unknown reasons
    /// collapse to `Breakpoint`.
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "breakpoint" => StopReason::Breakpoint,
            "step" => StopReason::Step,
            "exception" => StopReason::Exception,
            "pause" => StopReason::Pause,
            "entry" => StopReason::Entry,
            "goto" => StopReason::Goto,
            "function breakpoint" | "function_breakpoint" => StopReason::FunctionBreakpoint,
            "data breakpoint" | "data_breakpoint" => StopReason::DataBreakpoint,
            _ => StopReason::Breakpoint,
        }
    }
}

/// A breakpoint as the session tracks it after verification.
///
/// After a successful `setBreakpoints` call, the session's list for a
/// source path reflects exactly the adapter's reply, not the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
    /// Adapter-assigned identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Whether the adapter could bind the breakpoint.
    pub verified: bool,
    /// Source file the breakpoint lives in.
    pub source_path: String,
    /// Bound line, which may differ from the requested line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
    /// Bound column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
    /// End line of the bound range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<i64>,
    /// End column of the bound range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column: Option<i64>,
    /// Adapter diagnostic, usually present when unverified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Breakpoint {
    /// Attach a source path to an adapter-verified breakpoint.
    pub fn from_wire(source_path: &str, wire: dap_protocol::Breakpoint) -> Self {
        Self {
            id: wire.id,
            verified: wire.verified,
            source_path: source_path.to_string(),
            line: wire.line,
            column: wire.column,
            end_line: wire.end_line,
            end_column: wire.end_column,
            message: wire.message,
        }
    }
}

/// Resolution of a wait on the session's stop signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedEvent {
    /// Decoded stop reason.
    pub reason: StopReason,
    /// The primary suspended thread.
    pub thread_id: i64,
}

/// One entry of the session's output queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    /// Output channel: console, stdout, stderr, telemetry, ...
    #[serde(default = "default_category")]
    pub category: String,
    /// The emitted text.
    #[serde(default)]
    pub output: String,
    /// Output grouping directive ("start", "startCollapsed", "end").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Reference for structured output, exchangeable for children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables_reference: Option<i64>,
    /// Source location the output refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Line the output refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
    /// Column the output refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
}

fn default_category() -> String {
    "console".to_string()
}

impl Default for OutputRecord {
    fn default() -> Self {
        Self {
            category: default_category(),
            output: String::new(),
            group: None,
            variables_reference: None,
            source: None,
            line: None,
            column: None,
        }
    }
}

/// Snapshot of a session for the agent-facing surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Opaque session identifier.
    pub session_id: String,
    /// Name of the adapter driving the session.
    pub adapter: String,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Program being debugged, when launched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    /// Threads as of the last `get_threads` call.
    pub threads: Vec<Thread>,
    /// The suspended thread, when stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_thread_id: Option<i64>,
    /// Why the debuggee is suspended, when stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
}
