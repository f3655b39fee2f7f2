//! Dirgate Core Library
//!
//! Configuration and identity types for the dirgate directory
//! authentication service.

pub mod config;
pub mod error;
pub mod user;

pub use config::{AppConfig, DirectoryConfig, LoggingConfig};
pub use error::{Error, Result};
pub use user::{AuthenticatedUser, Credentials, PLACEHOLDER_CREDENTIAL};

/// Dirgate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Attribute holding the POSIX numeric user id
pub const UID_NUMBER_ATTRIBUTE: &str = "uidNumber";

/// Attribute holding the POSIX numeric group id
pub const GID_NUMBER_ATTRIBUTE: &str = "gidNumber";

/// Attribute holding the canonical directory username
pub const UID_ATTRIBUTE: &str = "uid";

/// Attribute holding the group common name
pub const CN_ATTRIBUTE: &str = "cn";
