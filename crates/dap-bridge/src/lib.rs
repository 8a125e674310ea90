//! Debug session engine for driving DAP adapters programmatically.
//!
//! This crate is the core of a bridge that exposes the Debug Adapter
//! Protocol — the wire protocol spoken by debuggers such as debugpy,
//! delve, CodeLLDB and js-debug — as a structured surface an external
//! agent can drive: launch a program with breakpoints pre-armed, step,
//! inspect frames and variables, evaluate expressions, and poll event and
//! output queues, across multiple concurrent sessions.
//!
//! # Layers
//!
//! - [`DapClient`] — sequence-numbered request/response correlation, event
//!   dispatch, and the deferred launch/attach handshake, over any
//!   [`dap_transport::Transport`].
//! - [`DebugSession`] — one client wrapped in domain state: the lifecycle
//!   state machine, stop tracking, breakpoint bookkeeping, and drainable
//!   event/output queues.
//! - [`SessionManager`] — a registry of sessions keyed by opaque IDs, with
//!   manager-wide event fan-out.
//!
//! Adapters are pluggable: anything implementing [`DebugAdapter`] can hand
//! the engine a transport and the launch/attach argument objects its
//! debugger expects.
//!
//! # Example
//!
//! ```no_run
//! use dap_bridge::{AdapterRegistry, CreateSessionOptions, LaunchOptions, SessionManager};
//! # async fn run(registry: AdapterRegistry) -> dap_bridge::Result<()> {
//! let manager = SessionManager::new(registry);
//!
//! let session = manager
//!     .create_session("debugpy", CreateSessionOptions::default())
//!     .await?;
//! session.launch(LaunchOptions::new("/work/app.py")).await?;
//!
//! let stopped = session.step_over(None, true).await?;
//! println!("stopped: {stopped:?}");
//!
//! manager.close_all().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod client;
mod error;
mod manager;
mod session;
mod sync;
mod types;

pub use adapter::{AdapterRegistry, AttachOptions, DebugAdapter, LaunchOptions, TransportOptions};
pub use client::{DEFAULT_REQUEST_TIMEOUT, DapClient, EventHandler, HandlerId};
pub use error::{Error, Result};
pub use manager::{CreateSessionOptions, SessionManager};
pub use session::{DebugSession, SessionEventCallback};
pub use types::{
    Breakpoint, EvaluateResult, OutputRecord, Scope, SessionInfo, SessionState, StackFrame,
    StopReason, StoppedEvent, Thread, Variable,
};

pub use dap_protocol as protocol;
pub use dap_transport as transport;
