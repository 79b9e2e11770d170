//! Exercises `RemoteRuntimeAdapter` against a fake host over a real
//! WebSocket connection: request/reply round trips, the `list_sessions`
//! cache, and connection-loss behavior.

mod support;

use std::time::Duration;

use swarmhost::adapter::{AdapterError, RemoteRuntimeAdapter, StartSessionOptions};

#[tokio::test]
async fn start_session_round_trips_through_the_wire() {
    let host = support::FakeHost::start().await;
    let adapter = RemoteRuntimeAdapter::connect_ws(&host.ws_url).await.expect("connect");

    let started = adapter
        .start_session_with_message("/tmp/project", "do the thing", StartSessionOptions { name: Some("my-session".into()) })
        .await
        .expect("start session");
    assert_eq!(started.session_id, "my-session");

    let transcript = adapter.get_transcript(&started.session_id).await.expect("get transcript");
    assert!(transcript.is_empty());

    host.push_assistant(&started.session_id, "hello from the model");
    let transcript = adapter.get_transcript(&started.session_id).await.expect("get transcript again");
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].content.as_text(), "hello from the model");
}

#[tokio::test]
async fn list_sessions_is_cached_until_force_refresh() {
    let host = support::FakeHost::start().await;
    let adapter = RemoteRuntimeAdapter::connect_ws(&host.ws_url).await.expect("connect");

    adapter
        .start_session_with_message("/tmp", "hi", StartSessionOptions { name: Some("s1".into()) })
        .await
        .expect("start s1");
    let first = adapter.list_sessions(false, true).await.expect("list sessions");
    assert_eq!(first.len(), 1);

    // A session appears on the host without going through this adapter, so
    // there is no invalidating call to react to.
    host.add_bare_session("s2");

    // Within the 2s TTL, the cached result is stale and still reports one
    // session.
    let cached = adapter.list_sessions(false, true).await.expect("list sessions cached");
    assert_eq!(cached.len(), 1);

    let refreshed = adapter.list_sessions(true, true).await.expect("list sessions forced");
    assert_eq!(refreshed.len(), 2);
}

#[tokio::test]
async fn list_sessions_cache_is_invalidated_by_start_session() {
    let host = support::FakeHost::start().await;
    let adapter = RemoteRuntimeAdapter::connect_ws(&host.ws_url).await.expect("connect");

    adapter
        .start_session_with_message("/tmp", "hi", StartSessionOptions { name: Some("s1".into()) })
        .await
        .expect("start s1");
    let first = adapter.list_sessions(false, true).await.expect("list sessions");
    assert_eq!(first.len(), 1);

    adapter
        .start_session_with_message("/tmp", "hi again", StartSessionOptions { name: Some("s2".into()) })
        .await
        .expect("start s2");

    // `startSessionWithMessage` invalidates the cache, so even a
    // non-forced call observes the new session immediately.
    let refreshed = adapter.list_sessions(false, true).await.expect("list sessions after start");
    assert_eq!(refreshed.len(), 2);
}

#[tokio::test]
async fn list_sessions_hides_worker_sessions_unless_included() {
    let host = support::FakeHost::start().await;
    let adapter = RemoteRuntimeAdapter::connect_ws(&host.ws_url).await.expect("connect");

    adapter
        .start_session_with_message("/tmp", "hi", StartSessionOptions { name: Some("main-1".into()) })
        .await
        .expect("start main session");
    adapter
        .start_session_with_message(
            "/tmp",
            "hi",
            StartSessionOptions { name: Some("__orch_o1_worker_t1".into()) },
        )
        .await
        .expect("start worker session");

    let visible = adapter.list_sessions(true, false).await.expect("list visible");
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].session_id, "main-1");

    let all = adapter.list_sessions(true, true).await.expect("list all");
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn disconnect_fails_subsequent_calls_with_connection_lost() {
    let host = support::FakeHost::start().await;
    let adapter = RemoteRuntimeAdapter::connect_ws(&host.ws_url).await.expect("connect");
    adapter.disconnect().await;

    // Give the actor task a beat to process the disconnect before the next
    // call races it.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let result = adapter.evaluate("1 + 1", false).await;
    assert!(matches!(result, Err(AdapterError::ConnectionLost)));
}
