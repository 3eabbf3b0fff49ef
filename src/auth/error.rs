//! Error types for the session gateway.
//!
//! None of these ever reach the end user. The gateway folds every one of
//! them into "authenticated" or "unauthenticated"; they exist so the logs
//! can tell a rejected refresh token apart from an unreachable server.

use thiserror::Error;

/// Why a token string could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected 3 dot-separated segments, found {0}")]
    SegmentCount(usize),
    #[error("payload is not valid base64url")]
    Base64,
    #[error("payload is not a JSON object with an exp claim: {0}")]
    Payload(String),
}

/// Failure talking to the authorization server.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("authorization server rejected the request: {0}")]
    Rejected(reqwest::StatusCode),
    #[error("authorization server unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),
    #[error("authorization server sent an unreadable response: {0}")]
    InvalidResponse(#[source] reqwest::Error),
    #[error("authorization server response carried no refresh token")]
    MissingRefreshToken,
}

/// Everything that can go wrong while resolving a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed token: {0}")]
    MalformedToken(#[from] DecodeError),
    #[error("token expired")]
    ExpiredToken,
    #[error("refresh rejected: {0}")]
    RefreshRejected(String),
    #[error("refresh unreachable: {0}")]
    RefreshUnreachable(String),
    #[error("could not write credential cookies: {0}")]
    StorageWriteFailure(String),
}

impl From<RefreshError> for SessionError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Rejected(status) => SessionError::RefreshRejected(status.to_string()),
            RefreshError::InvalidResponse(e) => SessionError::RefreshRejected(e.to_string()),
            RefreshError::MissingRefreshToken => {
                SessionError::RefreshRejected(RefreshError::MissingRefreshToken.to_string())
            }
            RefreshError::Unreachable(e) => SessionError::RefreshUnreachable(e.to_string()),
        }
    }
}

impl SessionError {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::MalformedToken(_) => "malformed_token",
            SessionError::ExpiredToken => "expired_token",
            SessionError::RefreshRejected(_) => "refresh_rejected",
            SessionError::RefreshUnreachable(_) => "refresh_unreachable",
            SessionError::StorageWriteFailure(_) => "storage_write_failure",
        }
    }
}
