//! Directory sessions.
//!
//! A session is an authenticated LDAP connection: opening one *is*
//! the credential check, since the protocol conflates authentication
//! with connection establishment. The traits here form the seam
//! between the orchestrating provider and the wire, so the flow can
//! be driven against a scripted directory in tests.

use std::time::Duration;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use tracing::{debug, info, warn};

use dirgate_core::DirectoryConfig;

use crate::error::{AuthError, AuthResult};

/// LDAP result code for a rejected simple bind.
const RC_INVALID_CREDENTIALS: u32 = 49;

/// LDAP result code for a missing entry.
const RC_NO_SUCH_OBJECT: u32 = 32;

/// A directory server that can be bound to with user credentials.
#[async_trait]
pub trait Directory: Send + Sync {
    type Session: DirectorySession;

    /// Opens an authenticated session by binding as `principal`.
    ///
    /// A rejected credential is [`AuthError::InvalidCredentials`];
    /// every other failure (network, TLS, malformed URL) surfaces as
    /// [`AuthError::Directory`].
    async fn bind(&self, principal: &str, password: &str) -> AuthResult<Self::Session>;
}

/// An authenticated directory connection.
///
/// Must be closed on every exit path once opened; `close` is
/// idempotent.
#[async_trait]
pub trait DirectorySession: Send {
    /// Reads a single entry by DN. An absent entry is `None`, not an
    /// error.
    async fn entry(&mut self, dn: &str, attrs: &[&str]) -> AuthResult<Option<SearchEntry>>;

    /// Subtree search below `base`, fully drained before returning.
    async fn search(&mut self, base: &str, filter: &str, attrs: &[&str])
        -> AuthResult<Vec<SearchEntry>>;

    /// Releases the connection. Calling it twice is a no-op.
    async fn close(&mut self);
}

/// The live ldap3-backed directory.
pub struct LdapDirectory {
    config: DirectoryConfig,
}

impl LdapDirectory {
    pub fn new(config: DirectoryConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Directory for LdapDirectory {
    type Session = LdapSession;

    async fn bind(&self, principal: &str, password: &str) -> AuthResult<Self::Session> {
        let url = self.config.connect_url();
        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(self.config.timeout_seconds));

        // Connection environment, minus the credential.
        debug!(
            url = %url,
            server = %self.config.server_url(),
            principal = %principal,
            timeout_seconds = self.config.timeout_seconds,
            "connecting to directory"
        );

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| AuthError::directory(format!("failed to connect to {url}: {e}")))?;

        ldap3::drive!(conn);

        let result = ldap
            .simple_bind(principal, password)
            .await
            .map_err(|e| AuthError::directory(format!("bind failed: {e}")))?;

        match result.rc {
            0 => {
                info!(principal = %principal, "directory bind succeeded");
                Ok(LdapSession { ldap: Some(ldap) })
            }
            RC_INVALID_CREDENTIALS => {
                let _ = ldap.unbind().await;
                Err(AuthError::InvalidCredentials)
            }
            rc => {
                let _ = ldap.unbind().await;
                Err(AuthError::directory(format!("bind failed with result code {rc}")))
            }
        }
    }
}

/// A bound ldap3 connection. The inner handle is taken on close so a
/// double close is a guarded no-op.
pub struct LdapSession {
    ldap: Option<Ldap>,
}

impl LdapSession {
    fn handle(&mut self) -> AuthResult<&mut Ldap> {
        self.ldap
            .as_mut()
            .ok_or_else(|| AuthError::directory("session is closed"))
    }
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn entry(&mut self, dn: &str, attrs: &[&str]) -> AuthResult<Option<SearchEntry>> {
        let ldap = self.handle()?;

        let result = ldap
            .search(dn, Scope::Base, "(objectClass=*)", attrs.to_vec())
            .await?;

        match result.success() {
            Ok((entries, _res)) => Ok(entries.into_iter().next().map(SearchEntry::construct)),
            Err(LdapError::LdapResult { result }) if result.rc == RC_NO_SUCH_OBJECT => {
                warn!(dn = %dn, "directory entry not found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> AuthResult<Vec<SearchEntry>> {
        let ldap = self.handle()?;

        let (entries, _res) = ldap
            .search(base, Scope::Subtree, filter, attrs.to_vec())
            .await?
            .success()?;

        Ok(entries.into_iter().map(SearchEntry::construct).collect())
    }

    async fn close(&mut self) {
        if let Some(mut ldap) = self.ldap.take() {
            if let Err(e) = ldap.unbind().await {
                debug!(error = %e, "unbind failed while closing session");
            }
        }
    }
}
