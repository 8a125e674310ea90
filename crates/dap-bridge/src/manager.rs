//! Registry of live debug sessions.

use crate::adapter::{AdapterRegistry, TransportOptions};
use crate::client::DapClient;
use crate::error::{Error, Result};
use crate::session::{DebugSession, SessionEventCallback};
use crate::types::SessionInfo;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use uuid::Uuid;

/// Inputs for [`SessionManager::create_session`].
#[derive(Debug, Clone, Default)]
pub struct CreateSessionOptions {
    /// Session ID to use; generated when absent. IDs are opaque to
    /// callers and never reused once retired.
    pub session_id: Option<String>,
    /// Program to debug (launch-mode adapters may spawn around it).
    pub program: Option<String>,
    /// Working directory for a spawned adapter.
    pub cwd: Option<PathBuf>,
    /// Environment for a spawned adapter.
    pub env: Option<HashMap<String, String>>,
    /// Host to connect to (attach-mode adapters).
    pub host: Option<String>,
    /// Port to connect to (attach-mode adapters).
    pub port: Option<u16>,
    /// Adapter-specific options passed through untouched.
    pub extra: Map<String, Value>,
}

impl CreateSessionOptions {
    fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            program: self.program.clone(),
            cwd: self.cwd.clone(),
            env: self.env.clone(),
            host: self.host.clone(),
            port: self.port,
            extra: self.extra.clone(),
        }
    }
}

/// Owner of every live [`DebugSession`], keyed by opaque ID.
///
/// The manager guarantees that an ID resolves to the same session for as
/// long as that session exists, and that a removed ID is never handed out
/// again.
pub struct SessionManager {
    registry: AdapterRegistry,
    sessions: Mutex<HashMap<String, Arc<DebugSession>>>,
    retired: Mutex<HashSet<String>>,
    callbacks: Mutex<Vec<SessionEventCallback>>,
}

impl SessionManager {
    /// Create a manager over a caller-supplied adapter registry. The
    /// registry is fixed for the manager's lifetime.
    pub fn new(registry: AdapterRegistry) -> Self {
        Self {
            registry,
            sessions: Mutex::new(HashMap::new()),
            retired: Mutex::new(HashSet::new()),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// The adapter registry this manager resolves names against.
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Build, connect, and initialize a new session.
    ///
    /// Resolves the adapter (name or alias), wires transport → client →
    /// session, registers manager-wide callbacks, then connects and
    /// initializes. Any failure tears the half-built client down; a
    /// session is never registered in a half-built state.
    pub async fn create_session(
        &self,
        adapter_name: &str,
        options: CreateSessionOptions,
    ) -> Result<Arc<DebugSession>> {
        let adapter =
            self.registry.resolve(adapter_name).ok_or_else(|| Error::AdapterNotFound {
                name: adapter_name.to_string(),
                available: self.registry.names(),
            })?;

        let session_id =
            options.session_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        {
            let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            let retired = self.retired.lock().unwrap_or_else(|e| e.into_inner());
            if sessions.contains_key(&session_id) || retired.contains(&session_id) {
                return Err(Error::SessionAlreadyExists(session_id));
            }
        }

        let transport = adapter.create_transport(&options.transport_options())?;
        let client = DapClient::new(transport, adapter.adapter_id());
        let session = Arc::new(DebugSession::new(session_id.clone(), adapter, client));

        for callback in
            self.callbacks.lock().unwrap_or_else(|e| e.into_inner()).iter().cloned()
        {
            session.add_event_callback(callback);
        }

        if let Err(e) = session.client().connect().await {
            session.client().disconnect().await;
            return Err(e);
        }
        if let Err(e) = session.initialize().await {
            session.client().disconnect().await;
            return Err(e);
        }

        let lost_race = {
            let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            // A racing create with the same explicit ID loses here.
            if sessions.contains_key(&session_id) {
                true
            } else {
                sessions.insert(session_id.clone(), session.clone());
                false
            }
        };
        if lost_race {
            session.client().disconnect().await;
            return Err(Error::SessionAlreadyExists(session_id));
        }
        tracing::info!(session_id = %session_id, adapter = %session.adapter().name(), "session created");
        Ok(session)
    }

    /// Look up a session by ID.
    pub fn get_session(&self, session_id: &str) -> Result<Arc<DebugSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))
    }

    /// Remove a session and disconnect it. Quietly succeeds when the ID is
    /// unknown; the removed ID is retired permanently.
    pub async fn close_session(&self, session_id: &str, terminate: bool) -> Result<()> {
        let session =
            self.sessions.lock().unwrap_or_else(|e| e.into_inner()).remove(session_id);
        let Some(session) = session else {
            return Ok(());
        };
        self.retired.lock().unwrap_or_else(|e| e.into_inner()).insert(session_id.to_string());
        tracing::info!(session_id, "closing session");
        session.disconnect(terminate).await
    }

    /// Close every session, never aborting on a single failure.
    pub async fn close_all(&self) {
        let ids: Vec<String> =
            self.sessions.lock().unwrap_or_else(|e| e.into_inner()).keys().cloned().collect();
        for session_id in ids {
            if let Err(e) = self.close_session(&session_id, true).await {
                tracing::warn!(session_id = %session_id, error = %e, "failed to close session");
            }
        }
    }

    /// Snapshot of every live session.
    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|session| session.get_info())
            .collect()
    }

    /// Register an observer for events from every session, existing ones
    /// included.
    pub fn add_event_callback(&self, callback: SessionEventCallback) {
        self.callbacks.lock().unwrap_or_else(|e| e.into_inner()).push(callback.clone());
        for session in self.sessions.lock().unwrap_or_else(|e| e.into_inner()).values() {
            session.add_event_callback(callback.clone());
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a session with this ID is live.
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).contains_key(session_id)
    }
}
