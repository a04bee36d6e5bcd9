use chrono::Utc;
use preview_protocol::{
    ArtifactEntry, EventEnvelope, MainWindowAction, Method, PreviewEvent, PreviewState,
    PreviewToolAction, Request, Response, SessionId, SessionSnapshot, StateActionPair,
    PROTOCOL_VERSION,
};
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tempfile::TempDir;

struct DaemonGuard {
    child: Child,
}

impl Drop for DaemonGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn spawn_daemon(home: &Path) -> Child {
    Command::new(env!("CARGO_BIN_EXE_preview-daemon"))
        .env("HOME", home)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn preview-daemon")
}

fn socket_path(home: &Path) -> PathBuf {
    home.join(".preview-sync").join("daemon.sock")
}

fn artifact_dir(home: &Path) -> PathBuf {
    home.join("artifacts")
}

fn write_config(home: &Path) {
    let app_dir = home.join(".preview-sync");
    std::fs::create_dir_all(&app_dir).expect("Failed to create app dir");
    std::fs::write(
        app_dir.join("config.toml"),
        format!("artifact_dir = {:?}\n", artifact_dir(home).display().to_string()),
    )
    .expect("Failed to write config");
}

fn wait_for_socket(path: &Path, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if path.exists() {
            return;
        }
        sleep(Duration::from_millis(25));
    }
    panic!("Timed out waiting for daemon socket at {}", path.display());
}

fn start(home: &Path) -> DaemonGuard {
    write_config(home);
    let guard = DaemonGuard {
        child: spawn_daemon(home),
    };
    wait_for_socket(&socket_path(home), Duration::from_secs(5));
    guard
}

fn send_request(socket: &Path, request: Request) -> Response {
    let mut stream = UnixStream::connect(socket).expect("Failed to connect to daemon socket");
    serde_json::to_writer(&mut stream, &request).expect("Failed to serialize request");
    stream.write_all(b"\n").expect("Failed to write request");
    stream.flush().ok();
    read_response(&mut stream)
}

fn read_response(stream: &mut UnixStream) -> Response {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).expect("Failed to read response");
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if chunk[..n].contains(&b'\n') {
            break;
        }
    }

    let newline_index = buffer.iter().position(|b| *b == b'\n');
    let response_bytes = match newline_index {
        Some(index) => &buffer[..index],
        None => buffer.as_slice(),
    };

    serde_json::from_slice(response_bytes).expect("Failed to parse response JSON")
}

fn event_request(event: PreviewEvent) -> Request {
    let envelope = EventEnvelope {
        event_id: format!("evt-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default()),
        recorded_at: Utc::now().to_rfc3339(),
        event,
    };
    Request {
        protocol_version: PROTOCOL_VERSION,
        method: Method::Event,
        id: Some("event-1".to_string()),
        params: Some(serde_json::to_value(envelope).expect("Failed to serialize event")),
    }
}

fn snapshot(session: &str, buffer: Option<&Path>, html: Option<&Path>) -> SessionSnapshot {
    SessionSnapshot {
        session_id: SessionId::new(session),
        preview: PreviewState {
            buffer: buffer.map(Path::to_path_buf),
            html: html.map(Path::to_path_buf),
        },
    }
}

#[test]
fn ipc_smoke_health() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let home = temp.path();
    let _guard = start(home);

    let request = Request {
        protocol_version: PROTOCOL_VERSION,
        method: Method::GetHealth,
        id: Some("health-1".to_string()),
        params: None,
    };
    let response = send_request(&socket_path(home), request);
    assert!(response.ok, "Expected ok response, got: {:?}", response);

    let data = response.data.expect("Missing health data");
    assert_eq!(data["status"], "ok");
    assert_eq!(data["protocol_version"], PROTOCOL_VERSION);
    assert_eq!(data["artifacts"], 0);
}

#[test]
fn ipc_smoke_startup_removes_orphans() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let home = temp.path();
    let dir = artifact_dir(home);
    std::fs::create_dir_all(&dir).expect("Failed to create artifact dir");
    std::fs::write(dir.join("old-session.html"), "stale").expect("Failed to write orphan");

    let _guard = start(home);

    assert!(!dir.join("old-session.html").exists());
}

#[test]
fn ipc_smoke_preview_lifecycle() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let home = temp.path();
    let _guard = start(home);
    let socket = socket_path(home);

    let source = home.join("a.md");
    std::fs::write(&source, "hi").expect("Failed to write source");
    let target = artifact_dir(home).join("window-1.html");

    let response = send_request(
        &socket,
        event_request(PreviewEvent::MainWindow(StateActionPair {
            state: snapshot("window-1", Some(&source), Some(&target)),
            action: MainWindowAction::BufferWritten,
        })),
    );
    assert!(response.ok, "Expected ok response, got: {:?}", response);
    assert_eq!(response.data.expect("Missing outcome")["outcome"], "rendered");
    let html = std::fs::read_to_string(&target).expect("Artifact should exist");
    assert!(html.contains("<title>a.md</title>"));
    assert!(html.contains("<p>hi</p>"));

    let response = send_request(
        &socket,
        Request {
            protocol_version: PROTOCOL_VERSION,
            method: Method::GetArtifacts,
            id: None,
            params: None,
        },
    );
    let artifacts: Vec<ArtifactEntry> =
        serde_json::from_value(response.data.expect("Missing artifacts")).expect("artifacts");
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].artifact_path, target);

    // Irrelevant action with an empty preview must not tear anything down.
    let response = send_request(
        &socket,
        event_request(PreviewEvent::PreviewTool(StateActionPair {
            state: snapshot("window-1", None, None),
            action: PreviewToolAction::ScrollSync,
        })),
    );
    assert_eq!(response.data.expect("Missing outcome")["outcome"], "ignored");
    assert!(target.exists());

    let response = send_request(
        &socket,
        event_request(PreviewEvent::PreviewTool(StateActionPair {
            state: snapshot("window-1", None, None),
            action: PreviewToolAction::RefreshNow,
        })),
    );
    assert_eq!(response.data.expect("Missing outcome")["outcome"], "removed");
    assert!(!target.exists());
}

#[test]
fn ipc_smoke_render_failure_reports_and_keeps_artifact() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let home = temp.path();
    let _guard = start(home);
    let socket = socket_path(home);

    let source = home.join("a.md");
    std::fs::write(&source, "hi").expect("Failed to write source");
    let target = artifact_dir(home).join("window-2.html");
    send_request(
        &socket,
        event_request(PreviewEvent::MainWindow(StateActionPair {
            state: snapshot("window-2", Some(&source), Some(&target)),
            action: MainWindowAction::NewCurrentBuffer,
        })),
    );
    let before = std::fs::read_to_string(&target).expect("Artifact should exist");

    let missing = home.join("missing.md");
    let response = send_request(
        &socket,
        event_request(PreviewEvent::MainWindow(StateActionPair {
            state: snapshot("window-2", Some(&missing), Some(&target)),
            action: MainWindowAction::BufferWritten,
        })),
    );
    assert!(response.ok);
    assert_eq!(response.data.expect("Missing outcome")["outcome"], "failed");
    assert_eq!(
        std::fs::read_to_string(&target).expect("Artifact should remain"),
        before
    );
}

#[test]
fn ipc_smoke_end_session() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let home = temp.path();
    let _guard = start(home);
    let socket = socket_path(home);

    let source = home.join("a.md");
    std::fs::write(&source, "hi").expect("Failed to write source");
    let target = artifact_dir(home).join("window-3.html");
    send_request(
        &socket,
        event_request(PreviewEvent::MainWindow(StateActionPair {
            state: snapshot("window-3", Some(&source), Some(&target)),
            action: MainWindowAction::BufferWritten,
        })),
    );
    assert!(target.exists());

    let response = send_request(
        &socket,
        Request {
            protocol_version: PROTOCOL_VERSION,
            method: Method::EndSession,
            id: None,
            params: Some(serde_json::json!({ "session_id": "window-3" })),
        },
    );
    assert!(response.ok, "Expected ok response, got: {:?}", response);
    assert!(!target.exists());
}

#[test]
fn ipc_smoke_rejects_invalid_event() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let home = temp.path();
    let _guard = start(home);

    let request = Request {
        protocol_version: PROTOCOL_VERSION,
        method: Method::Event,
        id: Some("bad-1".to_string()),
        params: Some(serde_json::json!({
            "event_id": "evt-1",
            "recorded_at": "2026-01-31T00:00:00Z",
            "event": {
                "source": "main_window",
                "state": { "session_id": "w", "preview": { "buffer": "a.md", "html": "b.html" } },
                "action": "buffer_written"
            }
        })),
    };
    let response = send_request(&socket_path(home), request);
    assert!(!response.ok);
    assert_eq!(response.error.expect("Missing error").code, "invalid_path");
}

#[test]
fn ipc_smoke_protocol_mismatch() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let home = temp.path();
    let _guard = start(home);

    let request = Request {
        protocol_version: PROTOCOL_VERSION + 1,
        method: Method::GetHealth,
        id: None,
        params: None,
    };
    let response = send_request(&socket_path(home), request);
    assert!(!response.ok);
    assert_eq!(response.error.expect("Missing error").code, "protocol_mismatch");
}
