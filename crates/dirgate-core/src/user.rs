//! Identity types produced and consumed by the authentication flow

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Opaque marker stored in place of a real credential on the output
/// record. The password supplied at bind time is never retained.
pub const PLACEHOLDER_CREDENTIAL: &str = "********";

/// A user that passed directory authentication.
///
/// Only ever constructed after a successful bind and a positive
/// `uidNumber`; the group set may legitimately be empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub username: String,
    pub credential: String,
    pub groups: HashSet<String>,
    pub uid: i64,
    pub active: bool,
}

impl AuthenticatedUser {
    pub fn new(username: impl Into<String>, uid: i64, groups: HashSet<String>) -> Self {
        Self {
            username: username.into(),
            credential: PLACEHOLDER_CREDENTIAL.to_string(),
            groups,
            uid,
            active: true,
        }
    }

    pub fn is_member_of(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}

/// Transient username/password pair.
///
/// Held only for the duration of one authentication call, never
/// persisted or serialized.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// The password must never reach a log line, including via {:?}.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
