//! Event and IPC protocol types for preview-daemon.
//!
//! This crate is shared by the daemon, the core library, and clients so that
//! editor integrations and the daemon agree on one schema. Upstream actions
//! are closed enums per event source; anything the preview does not react to
//! still deserializes, it just isn't relevant.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024; // 1MB

const MAX_SESSION_ID_LEN: usize = 128;

// ═══════════════════════════════════════════════════════════════════════════════
// IPC envelope
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Method {
    GetHealth,
    Event,
    EndSession,
    GetArtifacts,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    pub protocol_version: u32,
    pub method: Method,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(method: Method, params: Option<Value>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            method,
            id: None,
            params,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl Response {
    pub fn ok(id: Option<String>, data: Value) -> Self {
        Self {
            ok: true,
            id,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(id: Option<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(ErrorInfo::new(code, message)),
        }
    }

    pub fn error_with_info(id: Option<String>, error: ErrorInfo) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(error),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Sessions and editor state
// ═══════════════════════════════════════════════════════════════════════════════

/// Identifier of one editing session (one editor window).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Preview portion of an editor state snapshot.
///
/// `buffer` is the document being previewed and `html` the file the preview
/// should be written to. The editor clears both when the preview is closed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreviewState {
    #[serde(default)]
    pub buffer: Option<PathBuf>,
    #[serde(default)]
    pub html: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    #[serde(default)]
    pub preview: PreviewState,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Upstream actions
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewToolAction {
    RefreshNow,
    ReverseSearch,
    ScrollSync,
    ToggleAutomaticRefresh,
}

impl PreviewToolAction {
    pub fn is_preview_relevant(&self) -> bool {
        matches!(self, PreviewToolAction::RefreshNow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffersListAction {
    Open,
    Close,
}

impl BuffersListAction {
    pub fn is_preview_relevant(&self) -> bool {
        matches!(self, BuffersListAction::Open)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MainWindowAction {
    NewCurrentBuffer,
    BufferWritten,
    Cd,
    Close,
    ToggleTool,
    SetTheme,
    Focus,
}

impl MainWindowAction {
    pub fn is_preview_relevant(&self) -> bool {
        matches!(
            self,
            MainWindowAction::NewCurrentBuffer | MainWindowAction::BufferWritten
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateActionPair<A> {
    pub state: SessionSnapshot,
    pub action: A,
}

/// One state transition from any of the three upstream sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PreviewEvent {
    PreviewTool(StateActionPair<PreviewToolAction>),
    BuffersList(StateActionPair<BuffersListAction>),
    MainWindow(StateActionPair<MainWindowAction>),
}

impl PreviewEvent {
    pub fn state(&self) -> &SessionSnapshot {
        match self {
            PreviewEvent::PreviewTool(pair) => &pair.state,
            PreviewEvent::BuffersList(pair) => &pair.state,
            PreviewEvent::MainWindow(pair) => &pair.state,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.state().session_id
    }

    pub fn is_preview_relevant(&self) -> bool {
        match self {
            PreviewEvent::PreviewTool(pair) => pair.action.is_preview_relevant(),
            PreviewEvent::BuffersList(pair) => pair.action.is_preview_relevant(),
            PreviewEvent::MainWindow(pair) => pair.action.is_preview_relevant(),
        }
    }

    pub fn validate(&self) -> Result<(), ErrorInfo> {
        let state = self.state();
        validate_session_id(&state.session_id)?;
        require_absolute(state.preview.buffer.as_deref(), "preview.buffer")?;
        require_absolute(state.preview.html.as_deref(), "preview.html")?;
        Ok(())
    }
}

/// Event as it travels over the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventEnvelope {
    pub event_id: String,
    pub recorded_at: String,
    pub event: PreviewEvent,
}

impl EventEnvelope {
    pub fn validate(&self) -> Result<(), ErrorInfo> {
        if self.event_id.trim().is_empty() {
            return Err(ErrorInfo::new("invalid_event_id", "event_id is required"));
        }
        if self.event_id.len() > 128 {
            return Err(ErrorInfo::new(
                "invalid_event_id",
                "event_id must be 128 characters or fewer",
            ));
        }

        if DateTime::parse_from_rfc3339(&self.recorded_at).is_err() {
            return Err(ErrorInfo::new(
                "invalid_timestamp",
                "recorded_at must be RFC3339",
            ));
        }

        self.event.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndSessionParams {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub session_id: SessionId,
    pub artifact_path: PathBuf,
}

pub fn parse_event(params: Value) -> Result<EventEnvelope, ErrorInfo> {
    let envelope: EventEnvelope = serde_json::from_value(params).map_err(|err| {
        ErrorInfo::new(
            "invalid_params",
            format!("event payload is invalid JSON: {}", err),
        )
    })?;
    envelope.validate()?;
    Ok(envelope)
}

pub fn parse_end_session(params: Value) -> Result<EndSessionParams, ErrorInfo> {
    let parsed: EndSessionParams = serde_json::from_value(params).map_err(|err| {
        ErrorInfo::new(
            "invalid_params",
            format!("end_session payload is invalid JSON: {}", err),
        )
    })?;
    validate_session_id(&parsed.session_id)?;
    Ok(parsed)
}

fn validate_session_id(session_id: &SessionId) -> Result<(), ErrorInfo> {
    let value = session_id.as_str();
    if value.trim().is_empty() {
        return Err(ErrorInfo::new(
            "invalid_session_id",
            "session_id is required",
        ));
    }
    if value.len() > MAX_SESSION_ID_LEN {
        return Err(ErrorInfo::new(
            "invalid_session_id",
            "session_id must be 128 characters or fewer",
        ));
    }
    // Session ids become artifact file names.
    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return Err(ErrorInfo::new(
            "invalid_session_id",
            "session_id must not contain path separators",
        ));
    }
    Ok(())
}

fn require_absolute(path: Option<&Path>, field: &str) -> Result<(), ErrorInfo> {
    match path {
        Some(path) if !path.is_absolute() => Err(ErrorInfo::new(
            "invalid_path",
            format!("{} must be an absolute path", field),
        )),
        _ => Ok(()),
    }
}
