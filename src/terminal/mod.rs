//! Interactive shell sessions over WebSocket.
//!
//! One session couples an authenticated user, a shell child running on a
//! pseudo-terminal and a socket. Text frames from the client are written to
//! the shell's stdin; everything the shell prints comes back as binary
//! frames. When either side ends, the whole session is torn down and the
//! child is killed.

use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use portable_pty::{CommandBuilder, PtySize, native_pty_system};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Output is relayed in chunks of this size, matching the classic
/// terminal-emulator read granularity.
const READ_BUF_SIZE: usize = 1024;

/// Backpressure bound between the blocking reader and the socket writer.
const OUTPUT_CHANNEL_CAPACITY: usize = 64;

/// Terminal session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Shell binary to run for each session.
    pub shell: String,
    pub rows: u16,
    pub cols: u16,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            shell: "/bin/bash".to_string(),
            rows: 24,
            cols: 80,
        }
    }
}

/// A shell child attached to a pseudo-terminal.
///
/// The master handle must stay alive for the whole session; dropping it
/// closes the terminal under the shell. Dropping the whole struct kills
/// the child, which is the teardown path for every way a session can end.
///
/// The master is not `Sync`, so the struct never crosses task boundaries;
/// relay tasks get a [`PtyWriter`] instead.
pub struct PtyShell {
    child: Box<dyn portable_pty::Child + Send + Sync>,
    #[allow(dead_code)]
    master: Box<dyn portable_pty::MasterPty + Send>,
    writer: PtyWriter,
}

/// Cloneable handle for feeding keystrokes to the shell's stdin.
#[derive(Clone)]
pub struct PtyWriter(Arc<Mutex<Box<dyn Write + Send>>>);

impl PtyWriter {
    pub fn write(&self, data: &[u8]) -> std::io::Result<()> {
        let mut writer = self
            .0
            .lock()
            .map_err(|_| std::io::Error::other("pty writer poisoned"))?;
        writer.write_all(data)?;
        writer.flush()
    }
}

impl PtyShell {
    /// Spawn a shell for `username` and start draining its output into the
    /// returned channel.
    ///
    /// The reader runs on a dedicated thread because the pty master only
    /// offers blocking reads. It exits when the shell closes its side or
    /// when the session drops the receiver.
    pub fn spawn(
        config: &TerminalConfig,
        username: &str,
    ) -> anyhow::Result<(Self, mpsc::Receiver<Vec<u8>>)> {
        let pty_system = native_pty_system();
        let pair = pty_system.openpty(PtySize {
            rows: config.rows,
            cols: config.cols,
            pixel_width: 0,
            pixel_height: 0,
        })?;

        let mut cmd = CommandBuilder::new(&config.shell);
        cmd.env("TERM", "xterm-256color");
        cmd.env("PS1", "\\u@\\h:\\w\\$ ");
        cmd.env(
            "PATH",
            "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin",
        );
        cmd.env("USER", username);

        let child = pair.slave.spawn_command(cmd)?;
        drop(pair.slave);

        let mut reader = pair.master.try_clone_reader()?;
        let writer = pair.master.take_writer()?;

        let (output_tx, output_rx) = mpsc::channel::<Vec<u8>>(OUTPUT_CHANNEL_CAPACITY);

        std::thread::spawn(move || {
            let mut buf = [0u8; READ_BUF_SIZE];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if output_tx.blocking_send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        Ok((
            Self {
                child,
                master: pair.master,
                writer: PtyWriter(Arc::new(Mutex::new(writer))),
            },
            output_rx,
        ))
    }

    /// Write keystrokes to the shell's stdin.
    pub fn write(&self, data: &[u8]) -> std::io::Result<()> {
        self.writer.write(data)
    }

    /// Handle for writing from another task.
    pub fn writer(&self) -> PtyWriter {
        self.writer.clone()
    }

    /// OS process id of the shell child, when still known.
    pub fn process_id(&self) -> Option<u32> {
        self.child.process_id()
    }
}

impl Drop for PtyShell {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

/// Run one terminal session to completion.
///
/// If the shell cannot be started, the client gets exactly one diagnostic
/// text frame before the socket closes. Otherwise two relay tasks run until
/// either direction ends; the first to finish cancels the other and the
/// shell is killed on the way out.
pub async fn run_session(socket: WebSocket, username: String, config: Arc<TerminalConfig>) {
    debug!(user = %username, "terminal session starting");

    let (shell, mut output_rx) = match PtyShell::spawn(&config, &username) {
        Ok(pair) => pair,
        Err(err) => {
            warn!(user = %username, error = %err, "failed to start shell");
            let mut socket = socket;
            let _ = socket
                .send(Message::Text(
                    format!("Error starting shell: {}", err).into(),
                ))
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = socket.split();
    let cancel = CancellationToken::new();

    let inbound_cancel = cancel.clone();
    let inbound_writer = shell.writer();
    let inbound_user = username.clone();
    let inbound = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = inbound_cancel.cancelled() => break,
                msg = ws_rx.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(err) = inbound_writer.write(text.as_bytes()) {
                            warn!(user = %inbound_user, error = %err, "pty write failed");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(user = %inbound_user, "client closed terminal");
                        break;
                    }
                    // Binary, ping and pong frames are not session input.
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(user = %inbound_user, error = %err, "websocket read ended");
                        break;
                    }
                },
            }
        }
        inbound_cancel.cancel();
    });

    let outbound_cancel = cancel.clone();
    let outbound_user = username.clone();
    let outbound = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = outbound_cancel.cancelled() => break,
                chunk = output_rx.recv() => match chunk {
                    Some(chunk) => {
                        if let Err(err) = ws_tx.send(Message::Binary(chunk.into())).await {
                            debug!(user = %outbound_user, error = %err, "websocket write ended");
                            break;
                        }
                    }
                    // Shell exited; reader thread closed the channel.
                    None => break,
                },
            }
        }
        outbound_cancel.cancel();
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    let _ = tokio::join!(inbound, outbound);
    drop(shell);
    debug!(user = %username, "terminal session ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn collect_output(
        rx: &mut mpsc::Receiver<Vec<u8>>,
        needle: &str,
        limit: Duration,
    ) -> String {
        let mut collected = String::new();
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match timeout(remaining, rx.recv()).await {
                Ok(Some(chunk)) => {
                    collected.push_str(&String::from_utf8_lossy(&chunk));
                    if collected.contains(needle) {
                        return collected;
                    }
                }
                _ => return collected,
            }
        }
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn shell_echo_round_trip() {
        let config = TerminalConfig::default();
        let (shell, mut rx) = PtyShell::spawn(&config, "tester").unwrap();

        shell.write(b"echo hi\n").unwrap();
        let output = collect_output(&mut rx, "hi", Duration::from_secs(10)).await;
        assert!(output.contains("hi"), "missing echo output: {output:?}");
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn shell_sees_session_username() {
        let config = TerminalConfig::default();
        let (shell, mut rx) = PtyShell::spawn(&config, "alice").unwrap();

        shell.write(b"printf 'user=%s\\n' \"$USER\"\n").unwrap();
        let output = collect_output(&mut rx, "user=alice", Duration::from_secs(10)).await;
        assert!(output.contains("user=alice"), "unexpected output: {output:?}");
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn sessions_are_isolated() {
        let config = TerminalConfig::default();
        let (shell_a, mut rx_a) = PtyShell::spawn(&config, "usera").unwrap();
        let (shell_b, mut rx_b) = PtyShell::spawn(&config, "userb").unwrap();

        shell_a.write(b"echo from-a\n").unwrap();
        shell_b.write(b"echo from-b\n").unwrap();

        let out_a = collect_output(&mut rx_a, "from-a", Duration::from_secs(10)).await;
        let out_b = collect_output(&mut rx_b, "from-b", Duration::from_secs(10)).await;

        assert!(out_a.contains("from-a"));
        assert!(out_b.contains("from-b"));
        assert!(!out_a.contains("from-b"));
        assert!(!out_b.contains("from-a"));
    }

    #[test]
    fn relay_captures_are_send() {
        // The relay tasks run under tokio::spawn, so everything they
        // capture has to be Send; the shell itself stays on the session
        // task and only needs to move in, not be shared.
        fn assert_send<T: Send>() {}
        assert_send::<PtyShell>();
        assert_send::<PtyWriter>();
        assert_send::<mpsc::Receiver<Vec<u8>>>();
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn dropping_shell_kills_child_process() {
        let config = TerminalConfig::default();
        let (shell, _rx) = PtyShell::spawn(&config, "tester").unwrap();
        let pid = shell.process_id().expect("child pid");

        let proc_path = format!("/proc/{pid}");
        assert!(std::path::Path::new(&proc_path).exists());

        drop(shell);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            // A zombie entry still counts as not reaped; wait for the kill
            // wave from Drop to land and the entry to vanish or zombify.
            match std::fs::read_to_string(format!("{proc_path}/stat")) {
                Err(_) => break,
                Ok(stat) if stat.split_whitespace().nth(2) == Some("Z") => break,
                Ok(_) => {}
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "shell process {pid} survived drop"
            );
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    #[test]
    fn spawn_failure_reports_error() {
        let config = TerminalConfig {
            shell: "/nonexistent/shell-binary".to_string(),
            ..TerminalConfig::default()
        };
        assert!(PtyShell::spawn(&config, "tester").is_err());
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn dropping_shell_closes_output() {
        let config = TerminalConfig::default();
        let (shell, mut rx) = PtyShell::spawn(&config, "tester").unwrap();
        drop(shell);

        // The reader thread sees EOF once the child dies and closes the
        // channel; drain anything buffered first.
        let closed = timeout(Duration::from_secs(10), async {
            while rx.recv().await.is_some() {}
        })
        .await;
        assert!(closed.is_ok(), "output channel never closed");
    }
}
