// Auth session state
//
// Tracks the token obtained by `user.login` and decides which RPC errors
// mean "the token is no longer valid". The transitions are driven by the
// client; this module only holds state and notifies the token listener.

use tracing::debug;

use crate::error::Error;

/// Receives every freshly issued auth token.
///
/// Closures taking `&str` implement this trait, so callers that only want
/// to persist or log the token can pass one directly.
pub trait AuthTokenListener: Send {
    fn on_auth_token_updated(&mut self, token: &str);
}

impl<F> AuthTokenListener for F
where
    F: FnMut(&str) + Send,
{
    fn on_auth_token_updated(&mut self, token: &str) {
        self(token);
    }
}

/// Observable authentication state of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// A `user.login` request is in flight.
    Authenticating,
    Authenticated,
}

/// Decides whether an RPC error reports an invalid or expired session.
///
/// An error matches when its code is listed in `codes` and, if any
/// `patterns` are configured, one of them occurs in the error's message
/// or data (ASCII case-insensitive). Zabbix reuses `-32602` for ordinary
/// parameter errors, so the code alone is not enough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionExpiryRule {
    pub codes: Vec<i64>,
    pub patterns: Vec<String>,
}

impl Default for SessionExpiryRule {
    fn default() -> Self {
        Self {
            codes: vec![-32602, -32500],
            patterns: vec![
                "Session terminated".into(),
                "re-login".into(),
                "Not authorised".into(),
                "Not authorized".into(),
            ],
        }
    }
}

impl SessionExpiryRule {
    pub fn matches(&self, code: i64, message: &str, data: Option<&str>) -> bool {
        if !self.codes.contains(&code) {
            return false;
        }
        if self.patterns.is_empty() {
            return true;
        }
        let haystacks = [Some(message), data];
        self.patterns.iter().any(|pattern| {
            let pattern = pattern.to_ascii_lowercase();
            haystacks
                .iter()
                .flatten()
                .any(|text| text.to_ascii_lowercase().contains(&pattern))
        })
    }

    /// Reclassify a matching [`Error::Rpc`] as [`Error::SessionExpired`].
    pub fn classify(&self, err: Error) -> Error {
        match err {
            Error::Rpc {
                code,
                message,
                data,
            } if self.matches(code, &message, data.as_deref()) => {
                let message = match data {
                    Some(data) => format!("{message} {data}"),
                    None => message,
                };
                Error::SessionExpired { code, message }
            }
            other => other,
        }
    }
}

/// Token and state for one client. Never leaves the crate.
pub(crate) struct AuthSession {
    state: AuthState,
    token: Option<String>,
    listener: Option<Box<dyn AuthTokenListener>>,
}

impl AuthSession {
    pub(crate) fn new() -> Self {
        Self {
            state: AuthState::Unauthenticated,
            token: None,
            listener: None,
        }
    }

    pub(crate) fn set_listener(&mut self, listener: Box<dyn AuthTokenListener>) {
        self.listener = Some(listener);
    }

    pub(crate) fn state(&self) -> AuthState {
        self.state
    }

    pub(crate) fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub(crate) fn begin(&mut self) {
        self.state = AuthState::Authenticating;
    }

    /// Store a new token and notify the listener.
    pub(crate) fn complete(&mut self, token: String) {
        if let Some(listener) = self.listener.as_mut() {
            listener.on_auth_token_updated(&token);
        }
        self.token = Some(token);
        self.state = AuthState::Authenticated;
    }

    pub(crate) fn clear(&mut self) {
        if self.token.take().is_some() {
            debug!("auth token cleared");
        }
        self.state = AuthState::Unauthenticated;
    }
}
