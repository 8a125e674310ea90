//! The adapter capability and its registry.
//!
//! An adapter knows three things the core does not: how to acquire a
//! transport to its debugger back-end, and how to shape the `launch` and
//! `attach` argument objects that back-end expects. Everything else about a
//! vendor (discovery on the filesystem, per-language option translation)
//! lives outside the engine.
//!
//! The registry is constructed once at the composition root and handed to
//! the [`SessionManager`](crate::SessionManager) by value; nothing mutates
//! it afterwards.

use crate::error::Result;
use dap_protocol::SourceBreakpoint;
use dap_transport::Transport;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Inputs for building a transport to the adapter.
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Program to debug, when known at transport-build time.
    pub program: Option<String>,
    /// Working directory for a spawned adapter.
    pub cwd: Option<PathBuf>,
    /// Environment for a spawned adapter (replaces, not extends).
    pub env: Option<HashMap<String, String>>,
    /// Host to connect to, for socket-based adapters.
    pub host: Option<String>,
    /// Port to connect to, for socket-based adapters.
    pub port: Option<u16>,
    /// Adapter-specific options passed through untouched.
    pub extra: Map<String, Value>,
}

/// Inputs for shaping a DAP `launch` request.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Path of the program to debug.
    pub program: Option<String>,
    /// Command line arguments for the program.
    pub args: Vec<String>,
    /// Working directory for the program.
    pub cwd: Option<String>,
    /// Environment variables for the program.
    pub env: HashMap<String, String>,
    /// Stop at the program entry point.
    pub stop_on_entry: bool,
    /// Breakpoints to arm during the handshake, between `initialized` and
    /// `configurationDone`. Keyed by source path. Not part of the `launch`
    /// arguments; adapters ignore this field.
    pub breakpoints: HashMap<String, Vec<SourceBreakpoint>>,
    /// Adapter-specific options passed through untouched.
    pub extra: Map<String, Value>,
}

impl LaunchOptions {
    /// Launch options for a program with everything else defaulted.
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: Some(program.into()), ..Self::default() }
    }
}

/// Inputs for shaping a DAP `attach` request.
#[derive(Debug, Clone, Default)]
pub struct AttachOptions {
    /// Host where the debuggee is reachable.
    pub host: Option<String>,
    /// Debug port on that host.
    pub port: Option<u16>,
    /// Adapter-specific options passed through untouched.
    pub extra: Map<String, Value>,
}

/// Capability the engine requires of every debug adapter.
pub trait DebugAdapter: Send + Sync {
    /// Primary adapter name, used as the registry key.
    fn name(&self) -> &str;

    /// DAP adapter ID advertised during `initialize`.
    fn adapter_id(&self) -> &str;

    /// File extensions this adapter debugs.
    fn file_extensions(&self) -> &[&'static str] {
        &[]
    }

    /// Alternate names resolving to this adapter.
    fn aliases(&self) -> &[&'static str] {
        &[]
    }

    /// Build (but do not connect) a transport to the debugger back-end.
    fn create_transport(&self, options: &TransportOptions) -> Result<Box<dyn Transport>>;

    /// Shape the `arguments` object of the DAP `launch` request.
    fn get_launch_arguments(&self, options: &LaunchOptions) -> Result<Value>;

    /// Shape the `arguments` object of the DAP `attach` request.
    fn get_attach_arguments(&self, options: &AttachOptions) -> Result<Value>;
}

/// Name- and alias-keyed table of adapters.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn DebugAdapter>>,
    aliases: HashMap<String, String>,
}

impl AdapterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its name and all of its aliases.
    ///
    /// A later registration with the same name replaces the earlier one,
    /// aliases included.
    pub fn register(&mut self, adapter: Arc<dyn DebugAdapter>) {
        let name = adapter.name().to_string();
        for alias in adapter.aliases() {
            self.aliases.insert((*alias).to_string(), name.clone());
        }
        self.adapters.insert(name, adapter);
    }

    /// Look up an adapter by name or alias.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn DebugAdapter>> {
        if let Some(adapter) = self.adapters.get(name) {
            return Some(adapter.clone());
        }
        let primary = self.aliases.get(name)?;
        self.adapters.get(primary).cloned()
    }

    /// Registered primary names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered adapters.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Whether the registry has no adapters.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
