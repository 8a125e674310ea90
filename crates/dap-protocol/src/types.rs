//! Typed arguments, bodies, and records for the DAP command vocabulary.
//!
//! These mirror the field names of the DAP specification. Everything here is
//! `camelCase` on the wire except where the DAP schema says otherwise
//! (`adapterID`, `clientID`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Initialize
// ============================================================================

/// Arguments for the `initialize` request: the client's capability claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequestArguments {
    /// Client ID.
    #[serde(rename = "clientID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Human-readable client name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    /// Adapter ID the client intends to talk to.
    #[serde(rename = "adapterID")]
    pub adapter_id: String,
    /// Lines are 1-based.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines_start_at1: Option<bool>,
    /// Columns are 1-based.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns_start_at1: Option<bool>,
    /// Path format ("path" or "uri").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_format: Option<String>,
    /// Client understands the `type` attribute on variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_variable_type: Option<bool>,
    /// Client can page variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_variable_paging: Option<bool>,
    /// Client implements the reverse `runInTerminal` request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_run_in_terminal_request: Option<bool>,
    /// Client understands memory references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_memory_references: Option<bool>,
    /// Client understands progress events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_progress_reporting: Option<bool>,
    /// Client understands the `invalidated` event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_invalidated_event: Option<bool>,
}

// ============================================================================
// Breakpoints
// ============================================================================

/// Source reference used in breakpoint and stack frame messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// File name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Absolute file path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Adapter-assigned reference for sources without a path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<i64>,
}

impl Source {
    /// A source identified by its file path.
    pub fn from_path(path: impl Into<String>) -> Self {
        Self { name: None, path: Some(path.into()), source_reference: None }
    }
}

/// A requested breakpoint in a `setBreakpoints` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakpoint {
    /// Line number (1-based).
    pub line: i64,
    /// Column number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
    /// Breakpoint condition expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Hit-condition expression, e.g. `>= 10`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_condition: Option<String>,
    /// Logpoint message. When present the breakpoint logs and continues.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_message: Option<String>,
}

impl SourceBreakpoint {
    /// A plain line breakpoint.
    pub fn at_line(line: i64) -> Self {
        Self { line, column: None, condition: None, hit_condition: None, log_message: None }
    }
}

/// Arguments for the `setBreakpoints` request.
///
/// DAP is replace-all per source: the list sent here becomes the complete
/// set of breakpoints for that file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointsArguments {
    /// Source file reference.
    pub source: Source,
    /// The complete breakpoint set for the source.
    pub breakpoints: Vec<SourceBreakpoint>,
}

/// A breakpoint as verified by the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
    /// Adapter-assigned breakpoint identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Whether the adapter could bind the breakpoint.
    #[serde(default)]
    pub verified: bool,
    /// Actual line (may differ from the requested line).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
    /// Actual column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
    /// End line of the breakpoint location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<i64>,
    /// End column of the breakpoint location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column: Option<i64>,
    /// Adapter diagnostic when not verified or adjusted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response body for `setBreakpoints`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointsResponseBody {
    /// Verified breakpoints, in request order.
    #[serde(default)]
    pub breakpoints: Vec<Breakpoint>,
}

/// Arguments for the `setExceptionBreakpoints` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetExceptionBreakpointsArguments {
    /// Exception filter IDs to activate (e.g. `["raised", "uncaught"]`).
    pub filters: Vec<String>,
}

// ============================================================================
// Execution control
// ============================================================================

/// Arguments for the `continue` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueArguments {
    /// Thread to continue.
    pub thread_id: i64,
    /// Continue only this thread.
    pub single_thread: bool,
}

/// Response body for `continue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueResponseBody {
    /// Whether all threads were continued.
    #[serde(default = "default_true")]
    pub all_threads_continued: bool,
}

impl Default for ContinueResponseBody {
    fn default() -> Self {
        Self { all_threads_continued: true }
    }
}

fn default_true() -> bool {
    true
}

/// Arguments for the `next` (step over) request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextArguments {
    /// Thread to step.
    pub thread_id: i64,
}

/// Arguments for the `stepIn` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInArguments {
    /// Thread to step.
    pub thread_id: i64,
}

/// Arguments for the `stepOut` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutArguments {
    /// Thread to step.
    pub thread_id: i64,
}

/// Arguments for the `pause` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseArguments {
    /// Thread to pause.
    pub thread_id: i64,
}

// ============================================================================
// Inspection
// ============================================================================

/// A thread in the debuggee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    /// Thread identifier.
    pub id: i64,
    /// Human-readable thread name.
    #[serde(default)]
    pub name: String,
}

/// Response body for `threads`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ThreadsResponseBody {
    /// All threads in the debuggee.
    #[serde(default)]
    pub threads: Vec<Thread>,
}

/// Arguments for the `stackTrace` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceArguments {
    /// Thread to retrieve the stack for.
    pub thread_id: i64,
    /// Index of the first frame to return (0-based).
    pub start_frame: i64,
    /// Maximum number of frames to return.
    pub levels: i64,
}

/// A stack frame in the call stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    /// Frame identifier, valid while the debuggee is suspended.
    pub id: i64,
    /// Frame name, typically the function name.
    #[serde(default)]
    pub name: String,
    /// Source location of the frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Line number (1-based).
    #[serde(default)]
    pub line: i64,
    /// Column number (1-based).
    #[serde(default)]
    pub column: i64,
    /// End line of the frame's range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<i64>,
    /// End column of the frame's range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column: Option<i64>,
    /// Module the frame belongs to (number or string per adapter).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_id: Option<Value>,
}

/// Response body for `stackTrace`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceResponseBody {
    /// Frames in the requested window.
    #[serde(default)]
    pub stack_frames: Vec<StackFrame>,
    /// Total number of frames available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<i64>,
}

/// Arguments for the `scopes` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopesArguments {
    /// Frame to retrieve scopes for.
    pub frame_id: i64,
}

/// A scope within a stack frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    /// Scope name (e.g. "Locals", "Globals").
    #[serde(default)]
    pub name: String,
    /// Presentation hint ("arguments", "locals", "registers").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_hint: Option<String>,
    /// Reference exchangeable for the scope's variables.
    pub variables_reference: i64,
    /// Number of named child variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_variables: Option<i64>,
    /// Number of indexed child variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_variables: Option<i64>,
    /// Whether fetching the scope's variables is expensive.
    #[serde(default)]
    pub expensive: bool,
    /// Source of the scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// First line of the scope's range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
    /// First column of the scope's range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
    /// Last line of the scope's range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<i64>,
    /// Last column of the scope's range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column: Option<i64>,
}

/// Response body for `scopes`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScopesResponseBody {
    /// Scopes of the requested frame.
    #[serde(default)]
    pub scopes: Vec<Scope>,
}

/// Arguments for the `variables` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesArguments {
    /// Reference to the variable container.
    pub variables_reference: i64,
    /// Optional filter ("indexed" or "named").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Start index for paging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    /// Number of variables to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

/// A variable in the debuggee.
///
/// `variables_reference == 0` marks a leaf: there are no children to fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Variable name.
    #[serde(default)]
    pub name: String,
    /// Rendered value.
    #[serde(default)]
    pub value: String,
    /// Type of the variable.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    /// Adapter presentation hint (opaque object).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_hint: Option<Value>,
    /// Expression that re-evaluates to this variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluate_name: Option<String>,
    /// Reference for child variables; 0 means leaf.
    #[serde(default)]
    pub variables_reference: i64,
    /// Number of named child variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_variables: Option<i64>,
    /// Number of indexed child variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_variables: Option<i64>,
}

/// Response body for `variables`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VariablesResponseBody {
    /// Variables in the requested container.
    #[serde(default)]
    pub variables: Vec<Variable>,
}

/// Arguments for the `evaluate` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateArguments {
    /// Expression to evaluate.
    pub expression: String,
    /// Stack frame context for the evaluation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<i64>,
    /// Evaluation context ("watch", "repl", "hover", "clipboard").
    pub context: String,
}

/// Response body for `evaluate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponseBody {
    /// Rendered result.
    #[serde(default)]
    pub result: String,
    /// Type of the result.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    /// Adapter presentation hint (opaque object).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_hint: Option<Value>,
    /// Reference for a structured result; 0 means leaf.
    #[serde(default)]
    pub variables_reference: i64,
    /// Number of named child variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_variables: Option<i64>,
    /// Number of indexed child variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_variables: Option<i64>,
}

// ============================================================================
// Session lifecycle
// ============================================================================

/// Arguments for the `disconnect` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectArguments {
    /// Whether to terminate the debuggee process.
    pub terminate_debuggee: bool,
    /// Whether the session is being restarted.
    pub restart: bool,
}
