//! End-to-end terminal session tests over a real WebSocket.

#![cfg(unix)]

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

mod common;
use common::{test_app, test_app_with_token};

async fn spawn_server(app: axum::Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test(flavor = "multi_thread")]
async fn terminal_echo_round_trip() {
    let (app, token) = test_app_with_token();
    let addr = spawn_server(app).await;

    let url = format!("ws://{addr}/api/terminal?token={token}");
    let (mut socket, _) = connect_async(url).await.expect("upgrade should succeed");

    socket
        .send(Message::Text("echo hi\n".into()))
        .await
        .unwrap();

    // Shell output comes back as binary frames; collect until the echo
    // shows up.
    let mut collected = String::new();
    let result = timeout(Duration::from_secs(15), async {
        while let Some(msg) = socket.next().await {
            match msg.unwrap() {
                Message::Binary(data) => {
                    collected.push_str(&String::from_utf8_lossy(&data));
                    if collected.contains("hi") {
                        return;
                    }
                }
                Message::Close(_) => return,
                _ => {}
            }
        }
    })
    .await;

    assert!(result.is_ok(), "timed out waiting for shell output");
    assert!(collected.contains("hi"), "missing echo output: {collected:?}");

    let _ = socket.close(None).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn terminal_rejects_missing_token() {
    let app = test_app();
    let addr = spawn_server(app).await;

    let url = format!("ws://{addr}/api/terminal");
    let err = connect_async(url).await.expect_err("upgrade should fail");

    match err {
        tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 401);
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn terminal_rejects_garbage_token() {
    let app = test_app();
    let addr = spawn_server(app).await;

    let url = format!("ws://{addr}/api/terminal?token=not.a.jwt");
    let err = connect_async(url).await.expect_err("upgrade should fail");

    match err {
        tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 401);
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn terminal_client_close_ends_session() {
    let (app, token) = test_app_with_token();
    let addr = spawn_server(app).await;

    let url = format!("ws://{addr}/api/terminal?token={token}");
    let (mut socket, _) = connect_async(url).await.unwrap();

    // Wait for the prompt so the shell is definitely up.
    let _ = timeout(Duration::from_secs(10), socket.next()).await;

    socket.close(None).await.unwrap();

    // The server should finish the close handshake rather than hang.
    let drained = timeout(Duration::from_secs(10), async {
        while let Some(Ok(_)) = socket.next().await {}
    })
    .await;
    assert!(drained.is_ok(), "server never completed the close");
}

/// Find `pid=<digits>` in shell output. The echoed keystrokes contain the
/// literal `pid=%s`, so only a digits-then-newline match counts, and a
/// number split across chunks is left for the next read.
fn extract_pid(text: &str) -> Option<u32> {
    for (idx, _) in text.match_indices("pid=") {
        let rest = &text[idx + 4..];
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        let terminated = matches!(rest.chars().nth(digits.len()), Some('\r') | Some('\n'));
        if !digits.is_empty() && terminated {
            return digits.parse().ok();
        }
    }
    None
}

async fn wait_for_shell_exit(pid: u32) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Err(_) => return,
            Ok(stat) if stat.split_whitespace().nth(2) == Some("Z") => return,
            Ok(_) => {}
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "shell {pid} still running after disconnect"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn terminal_disconnect_reaps_shell_across_cycles() {
    let (app, token) = test_app_with_token();
    let addr = spawn_server(app).await;
    let url = format!("ws://{addr}/api/terminal?token={token}");

    for cycle in 0..3 {
        let (mut socket, _) = connect_async(&url).await.unwrap();

        socket
            .send(Message::Text("printf 'pid=%s\\n' $$\n".into()))
            .await
            .unwrap();

        let mut collected = String::new();
        let pid = timeout(Duration::from_secs(15), async {
            loop {
                match socket.next().await {
                    Some(Ok(Message::Binary(data))) => {
                        collected.push_str(&String::from_utf8_lossy(&data));
                        if let Some(pid) = extract_pid(&collected) {
                            return pid;
                        }
                    }
                    Some(Ok(_)) => {}
                    other => panic!("socket ended before pid output: {other:?}"),
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("cycle {cycle}: timed out waiting for shell pid"));

        assert!(
            std::path::Path::new(&format!("/proc/{pid}")).exists(),
            "cycle {cycle}: shell {pid} not running"
        );

        socket.close(None).await.unwrap();
        let _ = timeout(Duration::from_secs(5), async {
            while let Some(Ok(_)) = socket.next().await {}
        })
        .await;

        wait_for_shell_exit(pid).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn terminal_spawn_failure_sends_single_diagnostic_frame() {
    use opsdeck::api::{self, AppState};
    use opsdeck::auth::AuthState;
    use opsdeck::terminal::TerminalConfig;

    let auth_state = AuthState::new(common::test_auth_config());
    let user = auth_state
        .validate_credentials("admin", "adminpassword")
        .unwrap()
        .clone();
    let token = auth_state.generate_token(&user).unwrap();

    let config = TerminalConfig {
        shell: "/nonexistent/shell-binary".to_string(),
        ..TerminalConfig::default()
    };
    let app = api::build_router(AppState::new(auth_state, config));
    let addr = spawn_server(app).await;

    let url = format!("ws://{addr}/api/terminal?token={token}");
    let (mut socket, _) = connect_async(url).await.unwrap();

    let mut text_frames = Vec::new();
    let _ = timeout(Duration::from_secs(10), async {
        while let Some(Ok(msg)) = socket.next().await {
            match msg {
                Message::Text(text) => text_frames.push(text.to_string()),
                Message::Close(_) => break,
                _ => {}
            }
        }
    })
    .await;

    assert_eq!(text_frames.len(), 1, "expected one diagnostic frame");
    assert!(text_frames[0].starts_with("Error starting shell:"));
}
