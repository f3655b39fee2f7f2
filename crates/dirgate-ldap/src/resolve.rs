//! Attribute and group resolution over an open session.
//!
//! "Missing attribute" is always an absent value here; the provider
//! decides what absence means for the overall outcome.

use ldap3::SearchEntry;
use tracing::{debug, warn};

use dirgate_core::{
    DirectoryConfig, CN_ATTRIBUTE, GID_NUMBER_ATTRIBUTE, UID_ATTRIBUTE, UID_NUMBER_ATTRIBUTE,
};

use crate::error::{AuthError, AuthResult};
use crate::session::DirectorySession;

/// One resolved group membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryGroup {
    pub gid: i64,
    pub name: String,
}

/// Intermediate identity, assembled before the output record.
/// Valid only when `uid` is positive.
#[derive(Debug, Clone)]
pub struct DirectoryIdentity {
    pub uid: i64,
    pub groups: Vec<DirectoryGroup>,
}

/// Reads the POSIX `uidNumber` of the user entry.
///
/// An absent entry or attribute resolves to `None`; only a value
/// that is present but non-numeric is an error.
pub async fn resolve_uid<S: DirectorySession>(
    session: &mut S,
    config: &DirectoryConfig,
    username: &str,
) -> AuthResult<Option<i64>> {
    let dn = config.full_dn(username);

    let Some(entry) = session.entry(&dn, &[UID_NUMBER_ATTRIBUTE]).await? else {
        return Ok(None);
    };

    match first_attr(&entry, UID_NUMBER_ATTRIBUTE) {
        Some(raw) => match raw.parse::<i64>() {
            Ok(uid) => {
                debug!(username, uid, "resolved uidNumber");
                Ok(Some(uid))
            }
            Err(_) => Err(AuthError::parse(UID_NUMBER_ATTRIBUTE, raw)),
        },
        None => Ok(None),
    }
}

/// Reads the canonical directory username (`uid` attribute) of the
/// user entry.
pub async fn resolve_directory_username<S: DirectorySession>(
    session: &mut S,
    config: &DirectoryConfig,
    username: &str,
) -> AuthResult<Option<String>> {
    let dn = config.full_dn(username);

    let Some(entry) = session.entry(&dn, &[UID_ATTRIBUTE]).await? else {
        return Ok(None);
    };

    Ok(first_attr(&entry, UID_ATTRIBUTE))
}

/// Runs the templated group query and aggregates memberships.
///
/// Directories may return partial entries; anything lacking `cn` or
/// `gidNumber` is skipped. A non-numeric `gidNumber` fails the call.
pub async fn resolve_groups<S: DirectorySession>(
    session: &mut S,
    config: &DirectoryConfig,
    ldap_username: &str,
) -> AuthResult<Vec<DirectoryGroup>> {
    let filter = config.group_query(ldap_username);
    debug!(filter = %filter, base = %config.search_base, "searching group memberships");

    let entries = session
        .search(&config.search_base, &filter, &[CN_ATTRIBUTE, GID_NUMBER_ATTRIBUTE])
        .await?;

    let mut groups = Vec::new();
    let mut skipped = 0usize;

    for entry in entries {
        let name = first_attr(&entry, CN_ATTRIBUTE);
        let gid_raw = first_attr(&entry, GID_NUMBER_ATTRIBUTE);

        let (Some(name), Some(gid_raw)) = (name, gid_raw) else {
            debug!(dn = %entry.dn, "group entry missing cn or gidNumber, skipped");
            skipped += 1;
            continue;
        };

        let gid = gid_raw
            .parse::<i64>()
            .map_err(move |_| AuthError::parse(GID_NUMBER_ATTRIBUTE, gid_raw))?;

        groups.push(DirectoryGroup { gid, name });
    }

    if skipped > 0 {
        warn!(skipped, "ignored malformed group entries");
    }
    debug!(count = groups.len(), "resolved group memberships");

    Ok(groups)
}

/// First value of an attribute, if any.
fn first_attr(entry: &SearchEntry, attr: &str) -> Option<String> {
    entry.attrs.get(attr).and_then(|values| values.first().cloned())
}
