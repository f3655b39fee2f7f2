//! The authentication provider.
//!
//! Sequences bind, uid validation and group resolution into a single
//! non-failing call: every failure mode collapses to "no identity",
//! distinguished only through log severity so operators can tell a
//! typo'd password from a broken directory.

use tracing::{debug, error, info, trace, warn};

use dirgate_core::{AuthenticatedUser, Credentials, DirectoryConfig};

use crate::error::{AuthError, AuthResult};
use crate::resolve::{resolve_directory_username, resolve_groups, resolve_uid, DirectoryIdentity};
use crate::session::{Directory, DirectorySession, LdapDirectory};

/// Directory-backed authentication provider.
///
/// Configuration and the directory backend are injected at
/// construction; each `authenticate` call opens and releases its own
/// session, so concurrent calls are independent.
pub struct LdapAuthProvider<D: Directory> {
    config: DirectoryConfig,
    directory: D,
}

impl LdapAuthProvider<LdapDirectory> {
    /// Builds a provider over a live LDAP directory.
    pub fn from_config(config: DirectoryConfig) -> AuthResult<Self> {
        config.validate()?;
        let directory = LdapDirectory::new(config.clone());
        Ok(Self::new(config, directory))
    }
}

impl<D: Directory> LdapAuthProvider<D> {
    pub fn new(config: DirectoryConfig, directory: D) -> Self {
        Self { config, directory }
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Authenticates a username/password pair.
    ///
    /// Never fails outright: a rejected credential, a malformed user
    /// entry and an unreachable server all yield `None`.
    pub async fn authenticate(&self, username: &str, password: &str) -> Option<AuthenticatedUser> {
        match self.try_authenticate(username, password).await {
            Ok(user) => {
                info!(
                    username,
                    uid = user.uid,
                    groups = user.groups.len(),
                    "directory authentication succeeded"
                );
                Some(user)
            }
            Err(err) if err.is_credential_error() => {
                error!(username, "directory bind rejected: invalid credentials");
                None
            }
            Err(err) if err.is_system_error() => {
                error!(username, error = %err, "directory authentication failed");
                None
            }
            Err(err) => {
                warn!(username, error = %err, "directory returned an anomalous entry");
                None
            }
        }
    }

    async fn try_authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> AuthResult<AuthenticatedUser> {
        // Held only for this attempt; the Debug impl masks the password.
        let credentials = Credentials::new(username, password);

        let principal = self.config.full_dn(&credentials.username);
        trace!(
            principal = %principal,
            server = %self.config.server_url(),
            credentials = ?credentials,
            "computed bind principal"
        );

        let mut session = self
            .directory
            .bind(&principal, &credentials.password)
            .await?;

        // The session exists from here on; release it on every path.
        let outcome = self.resolve_identity(&mut session, username).await;
        session.close().await;

        let identity = outcome?;
        let groups = identity.groups.into_iter().map(|group| group.name).collect();

        Ok(AuthenticatedUser::new(username, identity.uid, groups))
    }

    async fn resolve_identity(
        &self,
        session: &mut D::Session,
        username: &str,
    ) -> AuthResult<DirectoryIdentity> {
        let uid = match resolve_uid(session, &self.config, username).await? {
            Some(uid) if uid > 0 => uid,
            other => {
                return Err(AuthError::InvalidUid {
                    username: username.to_string(),
                    uid: other,
                })
            }
        };

        let ldap_username = resolve_directory_username(session, &self.config, username)
            .await?
            .ok_or_else(|| AuthError::protocol(format!("missing uid for {username}")))?;
        debug!(username, ldap_username = %ldap_username, "resolved directory username");

        let groups = resolve_groups(session, &self.config, &ldap_username).await?;

        Ok(DirectoryIdentity { uid, groups })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{entry, example_config, MockDirectory};
    use dirgate_core::PLACEHOLDER_CREDENTIAL;

    const JDOE_DN: &str = "uid=jdoe,ou=people,dc=example,dc=org";

    fn directory_with_jdoe() -> MockDirectory {
        MockDirectory::new("secret")
            .with_entry(entry(JDOE_DN, &[("uidNumber", "1001"), ("uid", "jdoe")]))
            .with_groups(vec![
                entry(
                    "cn=staff,ou=groups,dc=example,dc=org",
                    &[("cn", "staff"), ("gidNumber", "100")],
                ),
                entry(
                    "cn=admins,ou=groups,dc=example,dc=org",
                    &[("cn", "admins"), ("gidNumber", "200")],
                ),
            ])
    }

    #[tokio::test]
    async fn end_to_end_success() {
        let directory = directory_with_jdoe();
        let closes = directory.closes.clone();
        let binds = directory.binds.clone();
        let provider = LdapAuthProvider::new(example_config(), directory);

        let user = provider.authenticate("jdoe", "secret").await.unwrap();

        assert_eq!(user.username, "jdoe");
        assert_eq!(user.uid, 1001);
        assert_eq!(user.credential, PLACEHOLDER_CREDENTIAL);
        assert!(user.active);
        assert_eq!(user.groups.len(), 2);
        assert!(user.is_member_of("staff"));
        assert!(user.is_member_of("admins"));

        assert_eq!(binds.lock().unwrap().as_slice(), [JDOE_DN.to_string()]);
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wrong_password_yields_no_identity() {
        let directory = directory_with_jdoe();
        let closes = directory.closes.clone();
        let provider = LdapAuthProvider::new(example_config(), directory);

        assert!(provider.authenticate("jdoe", "wrong").await.is_none());

        // The bind never produced a session, so there is nothing to close.
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreachable_directory_yields_no_identity() {
        let provider = LdapAuthProvider::new(example_config(), MockDirectory::unavailable());

        assert!(provider.authenticate("jdoe", "secret").await.is_none());
    }

    #[tokio::test]
    async fn missing_uid_number_fails_after_valid_bind() {
        let directory = MockDirectory::new("secret").with_entry(entry(JDOE_DN, &[("uid", "jdoe")]));
        let closes = directory.closes.clone();
        let provider = LdapAuthProvider::new(example_config(), directory);

        assert!(provider.authenticate("jdoe", "secret").await.is_none());
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_positive_uid_fails() {
        let directory = MockDirectory::new("secret")
            .with_entry(entry(JDOE_DN, &[("uidNumber", "0"), ("uid", "jdoe")]));
        let provider = LdapAuthProvider::new(example_config(), directory);

        assert!(provider.authenticate("jdoe", "secret").await.is_none());
    }

    #[tokio::test]
    async fn missing_directory_username_fails() {
        let directory =
            MockDirectory::new("secret").with_entry(entry(JDOE_DN, &[("uidNumber", "1001")]));
        let closes = directory.closes.clone();
        let provider = LdapAuthProvider::new(example_config(), directory);

        assert!(provider.authenticate("jdoe", "secret").await.is_none());
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_group_set_is_still_a_success() {
        let directory = MockDirectory::new("secret")
            .with_entry(entry(JDOE_DN, &[("uidNumber", "1001"), ("uid", "jdoe")]));
        let provider = LdapAuthProvider::new(example_config(), directory);

        let user = provider.authenticate("jdoe", "secret").await.unwrap();
        assert!(user.groups.is_empty());
        assert_eq!(user.uid, 1001);
    }

    #[tokio::test]
    async fn malformed_gid_fails_the_attempt() {
        let directory = MockDirectory::new("secret")
            .with_entry(entry(JDOE_DN, &[("uidNumber", "1001"), ("uid", "jdoe")]))
            .with_groups(vec![entry(
                "cn=staff,ou=groups,dc=example,dc=org",
                &[("cn", "staff"), ("gidNumber", "x")],
            )]);
        let closes = directory.closes.clone();
        let provider = LdapAuthProvider::new(example_config(), directory);

        assert!(provider.authenticate("jdoe", "secret").await.is_none());
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn from_config_rejects_invalid_configuration() {
        let config = DirectoryConfig::default();
        assert!(LdapAuthProvider::from_config(config).is_err());
    }
}
