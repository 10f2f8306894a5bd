use thiserror::Error;

use crate::version::ApiVersion;

/// Top-level error type for the `zabbix-api` crate.
///
/// Every retrieval operation returns either a complete table or one of
/// these. Only [`SessionExpired`](Self::SessionExpired) is ever handled
/// internally (one re-login and retry); everything else reaches the caller
/// as produced.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected, or the session was rejected again right after a
    /// fresh login.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The server reported the auth token as invalid or expired.
    #[error("Session expired (code {code}): {message}")]
    SessionExpired { code: i64, message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Connection, DNS or I/O failure below HTTP.
    #[error("HTTP transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-2xx HTTP status.
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS or HTTP client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── JSON-RPC ────────────────────────────────────────────────────
    /// Body was not a JSON-RPC response, with the raw body for debugging.
    #[error("Malformed response: {message}")]
    Parse { message: String, body: String },

    /// Application error reported by the server, code and text preserved.
    #[error("JSON-RPC error {code}: {message}{}", .data.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    Rpc {
        code: i64,
        message: String,
        data: Option<String>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// A well-formed response lacks a field or has it in the wrong shape.
    #[error("Schema violation in {entity}.{field}: {reason}")]
    Schema {
        entity: &'static str,
        field: String,
        reason: String,
    },

    /// The server is older than the configured minimum API version.
    #[error("Server API version {server} is older than required {required}")]
    UnsupportedVersion {
        server: ApiVersion,
        required: ApiVersion,
    },

    /// Caller passed a value the API cannot express.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub(crate) fn schema(
        entity: &'static str,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Schema {
            entity,
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if re-authenticating might resolve this error.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Returns `true` for authentication-class errors.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::SessionExpired { .. })
    }

    /// Returns `true` if this is a transient error worth retrying on the
    /// next polling cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The server's JSON-RPC error code, if this error carries one.
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } | Self::SessionExpired { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}
