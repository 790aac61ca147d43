// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;
use tokio::net::UnixListener;

/// Answer each incoming request with the next canned response.
fn fake_daemon(dir: &TempDir, responses: Vec<Response>) -> (PathBuf, tokio::task::JoinHandle<Vec<Request>>) {
    let socket = dir.path().join("daemon.sock");
    let listener = UnixListener::bind(&socket).unwrap();
    let handle = tokio::spawn(async move {
        let mut seen = Vec::new();
        for response in responses {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut reader, mut writer) = stream.into_split();
            seen.push(tb_wire::read_request(&mut reader).await.unwrap());
            tb_wire::write_response(&mut writer, &response).await.unwrap();
        }
        seen
    });
    (socket, handle)
}

#[tokio::test]
async fn send_round_trips_one_request_per_connection() {
    let dir = TempDir::new().unwrap();
    let status = DaemonStatus { version: "0.2.0".into(), projects: 2, ..Default::default() };
    let (socket, server) = fake_daemon(&dir, vec![Response::Pong, Response::Status { status: status.clone() }]);

    let client = DaemonClient::at(socket, Duration::from_secs(2));
    client.ping().await.unwrap();
    assert_eq!(client.status().await.unwrap(), status);

    let seen = server.await.unwrap();
    assert_eq!(seen, vec![Request::Ping, Request::Status]);
}

#[tokio::test]
async fn error_responses_become_rejections() {
    let dir = TempDir::new().unwrap();
    let (socket, _server) =
        fake_daemon(&dir, vec![Response::error(ErrorKind::ReplayConflict, "overlaps replay 1234")]);

    let client = DaemonClient::at(socket, Duration::from_secs(2));
    let err = client.cancel_replay("1234").await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected { kind: ErrorKind::ReplayConflict, .. }), "{err:?}");
    assert_eq!(err.exit_code(), 3);
    assert_eq!(err.to_string(), "overlaps replay 1234");
}

#[tokio::test]
async fn mismatched_response_is_unexpected() {
    let dir = TempDir::new().unwrap();
    let (socket, _server) = fake_daemon(&dir, vec![Response::Ok]);

    let client = DaemonClient::at(socket, Duration::from_secs(2));
    let err = client.list_jobs("p", None).await.unwrap_err();
    assert!(matches!(err, ClientError::Unexpected(_)), "{err:?}");
}

#[tokio::test]
async fn silent_daemon_times_out() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("daemon.sock");
    let _listener = UnixListener::bind(&socket).unwrap();

    let client = DaemonClient::at(socket, Duration::from_millis(50));
    let err = client.ping().await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)), "{err:?}");
}

#[tokio::test]
async fn missing_socket_reads_as_not_running() {
    let dir = TempDir::new().unwrap();
    let client = DaemonClient::at(dir.path().join("daemon.sock"), Duration::from_millis(50));
    let err = client.ping().await.unwrap_err();
    assert!(err.is_not_running(), "{err:?}");
}
