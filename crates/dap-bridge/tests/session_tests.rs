//! End-to-end session scenarios against the scripted adapter double.

mod support;

use dap_bridge::{
    DapClient, DebugAdapter, DebugSession, Error, LaunchOptions, SessionState, StopReason,
    TransportOptions,
};
use dap_protocol::SourceBreakpoint;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use support::{ScriptedBehavior, TestAdapter};

/// Build a connected, initialized session over the given behavior.
async fn scripted_session(behavior: ScriptedBehavior) -> (Arc<TestAdapter>, DebugSession) {
    support::init_tracing();
    let adapter = Arc::new(TestAdapter::with_behavior("python", behavior));
    let transport = adapter
        .create_transport(&TransportOptions::default())
        .expect("scripted transport");
    let client = DapClient::new(transport, "python");
    let session = DebugSession::new("sess-1".to_string(), adapter.clone(), client);
    session.client().connect().await.unwrap();
    session.initialize().await.unwrap();
    (adapter, session)
}

#[tokio::test]
async fn minimum_launch_reaches_running() {
    let (adapter, session) = scripted_session(ScriptedBehavior::default()).await;

    assert_eq!(session.state(), SessionState::Initializing);
    session.launch(LaunchOptions::new("/a.py")).await.unwrap();
    assert_eq!(session.state(), SessionState::Running);

    // Exact wire order of the minimum launch.
    assert_eq!(adapter.commands(), vec!["initialize", "launch", "configurationDone"]);

    let info = session.get_info();
    assert_eq!(info.program.as_deref(), Some("/a.py"));
    assert_eq!(info.adapter, "python");
}

#[tokio::test]
async fn launch_with_breakpoints_arms_them_before_configuration_done() {
    let mut behavior = ScriptedBehavior::default();
    behavior.stop_on_launch = Some(json!({"reason": "breakpoint", "threadId": 1}));
    let (adapter, session) = scripted_session(behavior).await;

    let mut breakpoints = HashMap::new();
    breakpoints.insert("/a.py".to_string(), vec![SourceBreakpoint::at_line(10)]);
    let mut options = LaunchOptions::new("/a.py");
    options.breakpoints = breakpoints;
    session.launch(options).await.unwrap();

    assert_eq!(
        adapter.commands(),
        vec!["initialize", "launch", "setBreakpoints", "configurationDone"]
    );

    // The stop emitted after the launch response lands asynchronously.
    let stopped = session
        .wait_for_stop(Duration::from_secs(5))
        .await
        .expect("stop record");
    assert_eq!(stopped.reason, StopReason::Breakpoint);
    assert_eq!(stopped.thread_id, 1);
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.stopped_thread_id(), Some(1));

    // The session's breakpoint map holds the adapter's verified reply.
    let stored = &session.breakpoints()["/a.py"];
    assert_eq!(stored.len(), 1);
    assert!(stored[0].verified);
    assert_eq!(stored[0].line, Some(10));
    assert_eq!(stored[0].id, Some(1));
}

#[tokio::test]
async fn step_over_race_stop_before_response() {
    // The adapter sends `stopped` before answering `next`; the step call
    // must still return the correct record.
    let mut behavior = ScriptedBehavior::default();
    behavior.stop_before_step_response = true;
    behavior.stop_on_launch = Some(json!({"reason": "entry", "threadId": 1}));
    let (_adapter, session) = scripted_session(behavior).await;
    session.launch(LaunchOptions::new("/a.py")).await.unwrap();
    session.wait_for_stop(Duration::from_secs(5)).await.expect("stop record");

    let stopped = session.step_over(None, true).await.unwrap().expect("stop record");
    assert_eq!(stopped.reason, StopReason::Step);
    assert_eq!(stopped.thread_id, 1);
    assert_eq!(session.state(), SessionState::Stopped);
}

#[tokio::test]
async fn adapter_initiated_continue_forces_running() {
    let mut behavior = ScriptedBehavior::default();
    behavior.stop_on_launch = Some(json!({"reason": "breakpoint", "threadId": 1}));
    let (adapter, session) = scripted_session(behavior).await;
    session.launch(LaunchOptions::new("/a.py")).await.unwrap();
    session.wait_for_stop(Duration::from_secs(5)).await.expect("stop record");
    assert_eq!(session.state(), SessionState::Stopped);

    // Unprompted `continued` (adapter resumed after internal exception
    // handling, no client request involved).
    adapter.io().emit("continued", Some(json!({"threadId": 1, "allThreadsContinued": true})));

    tokio::time::timeout(Duration::from_secs(1), async {
        while session.state() != SessionState::Running {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert_eq!(session.stopped_thread_id(), None);
    assert_eq!(session.stop_reason(), None);
}

#[tokio::test]
async fn missing_response_times_out_and_leaves_session_intact() {
    let mut behavior = ScriptedBehavior::default();
    behavior.ignore.insert("threads".to_string());
    let (_adapter, session) = scripted_session(behavior).await;
    session.launch(LaunchOptions::new("/a.py")).await.unwrap();

    let err = session
        .client()
        .request_with_timeout("threads", None, Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    // Per-operation failure: the session stays where it was.
    assert_eq!(session.state(), SessionState::Running);

    // The waiter was deregistered; the next request pairs correctly.
    let result = session.evaluate("1 + 1", None, "repl").await.unwrap();
    assert_eq!(result.result, "42");
}

#[tokio::test]
async fn force_disconnect_mid_session() {
    let mut behavior = ScriptedBehavior::default();
    behavior.stop_on_launch = Some(json!({"reason": "breakpoint", "threadId": 1}));
    let (adapter, session) = scripted_session(behavior).await;
    let session = Arc::new(session);
    session.launch(LaunchOptions::new("/a.py")).await.unwrap();
    session.wait_for_stop(Duration::from_secs(5)).await.expect("stop record");

    // A continue that waits for a stop which will never come...
    let waiter = {
        let session = session.clone();
        tokio::spawn(async move { session.continue_execution(Some(1), true).await })
    };
    tokio::task::yield_now().await;

    // ...is released by the disconnect instead of hanging.
    session.disconnect(true).await.unwrap();
    assert_eq!(session.state(), SessionState::Terminated);

    let outcome = tokio::time::timeout(Duration::from_secs(2), waiter)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(outcome, Ok(None)), "got: {outcome:?}");

    // The wire saw disconnect with terminateDebuggee.
    let log = adapter.log.lock().unwrap_or_else(|e| e.into_inner());
    let disconnect = log.iter().find(|r| r.command == "disconnect").unwrap();
    assert_eq!(disconnect.arguments.as_ref().unwrap()["terminateDebuggee"], json!(true));
    drop(log);

    // Second disconnect is a no-op.
    session.disconnect(true).await.unwrap();
    assert!(!session.client().is_connected());
}

#[tokio::test]
async fn breakpoint_replacement_keeps_only_the_latest_reply() {
    let (_adapter, session) = scripted_session(ScriptedBehavior::default()).await;
    session.launch(LaunchOptions::new("/a.py")).await.unwrap();

    session
        .set_breakpoints(
            "/a.py",
            &[SourceBreakpoint::at_line(10), SourceBreakpoint::at_line(20)],
        )
        .await
        .unwrap();
    let replaced = session
        .set_breakpoints("/a.py", &[SourceBreakpoint::at_line(30)])
        .await
        .unwrap();

    assert_eq!(replaced.len(), 1);
    assert_eq!(replaced[0].line, Some(30));
    // Stored state reflects the second reply only.
    let stored = session.breakpoints();
    assert_eq!(stored["/a.py"], replaced);
}

#[tokio::test]
async fn clear_breakpoints_removes_the_source_entry() {
    let (_adapter, session) = scripted_session(ScriptedBehavior::default()).await;
    session.launch(LaunchOptions::new("/a.py")).await.unwrap();

    session
        .set_breakpoints("/a.py", &[SourceBreakpoint::at_line(10)])
        .await
        .unwrap();
    assert!(session.breakpoints().contains_key("/a.py"));

    session.clear_breakpoints("/a.py").await.unwrap();
    assert!(!session.breakpoints().contains_key("/a.py"));
}

#[tokio::test]
async fn step_family_uses_last_stopped_thread() {
    let mut behavior = ScriptedBehavior::default();
    behavior.stop_on_launch = Some(json!({"reason": "breakpoint", "threadId": 7}));
    let (adapter, session) = scripted_session(behavior).await;
    session.launch(LaunchOptions::new("/a.py")).await.unwrap();
    session.wait_for_stop(Duration::from_secs(5)).await.expect("stop record");
    assert_eq!(session.stopped_thread_id(), Some(7));

    session.step_into(None, true).await.unwrap();

    let log = adapter.log.lock().unwrap_or_else(|e| e.into_inner());
    let step = log.iter().find(|r| r.command == "stepIn").unwrap();
    assert_eq!(step.arguments.as_ref().unwrap()["threadId"], json!(7));
}

#[tokio::test]
async fn continue_without_wait_returns_immediately() {
    let mut behavior = ScriptedBehavior::default();
    behavior.stop_on_launch = Some(json!({"reason": "breakpoint", "threadId": 1}));
    let (_adapter, session) = scripted_session(behavior).await;
    session.launch(LaunchOptions::new("/a.py")).await.unwrap();
    session.wait_for_stop(Duration::from_secs(5)).await.expect("stop record");

    let outcome = session.continue_execution(None, false).await.unwrap();
    assert_eq!(outcome, None);
    assert_eq!(session.state(), SessionState::Running);
    assert_eq!(session.stopped_thread_id(), None);
    assert_eq!(session.stop_reason(), None);
}

#[tokio::test]
async fn pause_stops_asynchronously() {
    let (_adapter, session) = scripted_session(ScriptedBehavior::default()).await;
    session.launch(LaunchOptions::new("/a.py")).await.unwrap();

    session.pause(None).await.unwrap();
    let stopped = session
        .wait_for_stop(Duration::from_secs(5))
        .await
        .expect("stop record");
    assert_eq!(stopped.reason, StopReason::Pause);
    assert_eq!(session.state(), SessionState::Stopped);
}

#[tokio::test]
async fn event_and_output_queues_drain_in_order() {
    let (adapter, session) = scripted_session(ScriptedBehavior::default()).await;
    session.launch(LaunchOptions::new("/a.py")).await.unwrap();
    // Flush queue noise from the handshake.
    session.get_pending_events();

    let mut io = adapter.io();
    io.emit("output", Some(json!({"category": "stdout", "output": "first\n"})));
    io.emit("output", Some(json!({"category": "stderr", "output": "second\n"})));
    io.emit("thread", Some(json!({"reason": "started", "threadId": 2})));

    // Dispatch rides the receive task; give it a beat to apply all three.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let output = session.get_output();
    assert_eq!(output.len(), 2);
    assert_eq!(output[0].category, "stdout");
    assert_eq!(output[0].output, "first\n");
    assert_eq!(output[1].category, "stderr");
    // Drained atomically: a second poll is empty.
    assert!(session.get_output().is_empty());

    let events: Vec<String> =
        session.get_pending_events().into_iter().map(|e| e.event).collect();
    assert_eq!(events, vec!["output", "output", "thread"]);
    assert!(session.get_pending_events().is_empty());
}

#[tokio::test]
async fn get_threads_caches_for_info() {
    let (_adapter, session) = scripted_session(ScriptedBehavior::default()).await;
    session.launch(LaunchOptions::new("/a.py")).await.unwrap();

    let threads = session.get_threads().await.unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].name, "MainThread");

    let info = session.get_info();
    assert_eq!(info.threads, threads);
}

#[tokio::test]
async fn launch_without_program_is_rejected() {
    let (_adapter, session) = scripted_session(ScriptedBehavior::default()).await;
    let err = session.launch(LaunchOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
    assert_eq!(session.state(), SessionState::Initializing);
}

#[tokio::test]
async fn session_callbacks_see_session_id_and_events() {
    let (_adapter, session) = scripted_session(ScriptedBehavior::default()).await;

    let seen: Arc<std::sync::Mutex<Vec<(String, String)>>> =
        Arc::new(std::sync::Mutex::new(Vec::new()));
    {
        let seen = seen.clone();
        session.add_event_callback(Arc::new(move |session_id, event| {
            seen.lock()
                .unwrap_or_else(|e| e.into_inner())
                .push((session_id.to_string(), event.event.clone()));
        }));
    }

    session.launch(LaunchOptions::new("/a.py")).await.unwrap();

    let seen = seen.lock().unwrap_or_else(|e| e.into_inner()).clone();
    assert!(seen.iter().any(|(id, event)| id == "sess-1" && event == "initialized"));
}
