//! Error taxonomy for directory authentication.
//!
//! Three failure classes matter to callers: credential rejection
//! (expected, frequent), protocol anomalies (malformed or missing
//! attributes), and system failures (network, TLS, configuration).
//! None of them cross the public `authenticate` contract; they only
//! steer log severity.

use thiserror::Error;

/// Result type for directory authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The directory rejected the bind credentials (result code 49).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The directory returned data that violates the expected schema,
    /// e.g. a user entry without a `uid` attribute.
    #[error("directory protocol error: {0}")]
    Protocol(String),

    /// Connectivity, TLS, or server-side failure unrelated to the
    /// supplied credentials.
    #[error("directory error: {0}")]
    Directory(String),

    /// The resolved `uidNumber` was absent or not a positive integer.
    #[error("invalid uid for {username}: {uid:?}")]
    InvalidUid {
        username: String,
        uid: Option<i64>,
    },

    /// A numeric attribute could not be parsed.
    #[error("malformed numeric attribute {attribute}: {value:?}")]
    Parse {
        attribute: String,
        value: String,
    },

    /// Rejected directory configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn directory(msg: impl Into<String>) -> Self {
        Self::Directory(msg.into())
    }

    pub fn parse(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Parse {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// True for the one failure that means "wrong username/password".
    pub const fn is_credential_error(&self) -> bool {
        matches!(self, Self::InvalidCredentials)
    }

    /// True for failures that do not implicate the credentials.
    pub const fn is_system_error(&self) -> bool {
        matches!(
            self,
            Self::Directory(_) | Self::InvalidUid { .. } | Self::Parse { .. } | Self::Configuration(_)
        )
    }
}

impl From<ldap3::LdapError> for AuthError {
    fn from(err: ldap3::LdapError) -> Self {
        Self::Directory(err.to_string())
    }
}

impl From<dirgate_core::Error> for AuthError {
    fn from(err: dirgate_core::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}
