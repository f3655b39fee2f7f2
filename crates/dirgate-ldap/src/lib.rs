//! LDAP bind-authentication and group resolution for dirgate
//!
//! Authenticates a username/password pair by binding against the
//! directory as the user, validates the entry's `uidNumber`, and
//! aggregates group memberships through a templated subtree search.

pub mod error;
pub mod provider;
pub mod resolve;
pub mod session;

pub use error::{AuthError, AuthResult};
pub use provider::LdapAuthProvider;
pub use resolve::{DirectoryGroup, DirectoryIdentity};
pub use session::{Directory, DirectorySession, LdapDirectory, LdapSession};

#[cfg(test)]
pub(crate) mod test_support;
