//! Client for the preview daemon socket.
//!
//! One request per connection, newline-delimited JSON both ways.

use chrono::Utc;
use preview_protocol::{
    ArtifactEntry, EndSessionParams, EventEnvelope, Method, PreviewEvent, Request, Response,
    SessionId, MAX_REQUEST_BYTES, PROTOCOL_VERSION,
};
use rand::RngCore;
use serde_json::Value;
use std::env;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::Duration;

const SOCKET_ENV: &str = "PREVIEW_DAEMON_SOCKET";
// Rendering happens inside the request, so allow more than a bare round trip.
const READ_TIMEOUT_MS: u64 = 5_000;
const WRITE_TIMEOUT_MS: u64 = 600;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Home directory not found")]
    NoHomeDir,

    #[error("Failed to connect to daemon socket {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Daemon I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timed out waiting for daemon response")]
    Timeout,

    #[error("Daemon response was empty")]
    EmptyResponse,

    #[error("Response exceeded maximum size")]
    ResponseTooLarge,

    #[error("{code}: {message}")]
    Daemon { code: String, message: String },
}

pub struct DaemonClient {
    socket: PathBuf,
}

impl DaemonClient {
    pub fn new(socket: PathBuf) -> Self {
        Self { socket }
    }

    /// Socket from `PREVIEW_DAEMON_SOCKET`, else `~/.preview-sync/daemon.sock`.
    pub fn from_env() -> Result<Self, ClientError> {
        if let Ok(path) = env::var(SOCKET_ENV) {
            return Ok(Self::new(PathBuf::from(path)));
        }
        preview_core::get_socket_path()
            .map(Self::new)
            .ok_or(ClientError::NoHomeDir)
    }

    pub fn health(&self) -> Result<Value, ClientError> {
        self.call(Method::GetHealth, None)
    }

    pub fn send_event(&self, event: PreviewEvent) -> Result<Value, ClientError> {
        let envelope = EventEnvelope {
            event_id: make_event_id(),
            recorded_at: Utc::now().to_rfc3339(),
            event,
        };
        tracing::debug!(
            event_id = %envelope.event_id,
            session_id = %envelope.event.session_id(),
            "Sending preview event"
        );
        self.call(Method::Event, Some(serde_json::to_value(envelope)?))
    }

    pub fn end_session(&self, session_id: SessionId) -> Result<Value, ClientError> {
        let params = serde_json::to_value(EndSessionParams { session_id })?;
        self.call(Method::EndSession, Some(params))
    }

    pub fn artifacts(&self) -> Result<Vec<ArtifactEntry>, ClientError> {
        let data = self.call(Method::GetArtifacts, None)?;
        Ok(serde_json::from_value(data)?)
    }

    fn call(&self, method: Method, params: Option<Value>) -> Result<Value, ClientError> {
        let response = self.send_request(Request::new(method, params))?;
        if response.ok {
            return Ok(response.data.unwrap_or(Value::Null));
        }
        let (code, message) = response
            .error
            .map(|err| (err.code, err.message))
            .unwrap_or_else(|| ("unknown".to_string(), "Unknown daemon error".to_string()));
        Err(ClientError::Daemon { code, message })
    }

    fn send_request(&self, request: Request) -> Result<Response, ClientError> {
        let mut stream =
            UnixStream::connect(&self.socket).map_err(|source| ClientError::Connect {
                path: self.socket.clone(),
                source,
            })?;
        let _ = stream.set_read_timeout(Some(Duration::from_millis(READ_TIMEOUT_MS)));
        let _ = stream.set_write_timeout(Some(Duration::from_millis(WRITE_TIMEOUT_MS)));

        serde_json::to_writer(&mut stream, &request)?;
        stream.write_all(b"\n")?;
        stream.flush().ok();

        read_response(&mut stream)
    }
}

fn read_response(stream: &mut UnixStream) -> Result<Response, ClientError> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if buffer.len() > MAX_REQUEST_BYTES {
                    return Err(ClientError::ResponseTooLarge);
                }
                if chunk[..n].contains(&b'\n') {
                    break;
                }
            }
            Err(err)
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut =>
            {
                return Err(ClientError::Timeout);
            }
            Err(err) => return Err(ClientError::Io(err)),
        }
    }

    let newline_index = buffer.iter().position(|b| *b == b'\n');
    let response_bytes = match newline_index {
        Some(index) => &buffer[..index],
        None => buffer.as_slice(),
    };

    if response_bytes.is_empty() {
        return Err(ClientError::EmptyResponse);
    }

    Ok(serde_json::from_slice(response_bytes)?)
}

fn make_event_id() -> String {
    let mut random = rand::thread_rng();
    format!(
        "evt-{}-{}-{:x}",
        Utc::now().timestamp_millis(),
        std::process::id(),
        random.next_u64()
    )
}
