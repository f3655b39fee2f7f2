//! Configuration for dirgate
//!
//! The directory section carries everything needed to derive bind
//! principals and group queries for a POSIX-style LDAP schema
//! (`uidNumber`/`gidNumber`/`cn` attributes, RFC 2307 or 2307bis
//! group membership).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Placeholder substituted with the directory username in
/// [`DirectoryConfig::group_query_template`].
pub const USERNAME_PLACEHOLDER: &str = "{username}";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        toml::from_str(&content).map_err(|e| Error::ParseConfig(e.to_string()))
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("DIRGATE_LDAP_HOST") {
            config.directory.host = host;
        }
        if let Ok(base) = std::env::var("DIRGATE_SEARCH_BASE") {
            config.directory.search_base = base;
        }
        if let Ok(subtree) = std::env::var("DIRGATE_USER_SUBTREE") {
            config.directory.user_subtree = subtree;
        }
        if let Ok(attr) = std::env::var("DIRGATE_USER_ATTRIBUTE") {
            config.directory.user_attribute = attr;
        }
        if let Ok(attr) = std::env::var("DIRGATE_GROUP_ATTRIBUTE") {
            config.directory.group_attribute = attr;
        }
        if let Ok(template) = std::env::var("DIRGATE_GROUP_QUERY") {
            config.directory.group_query_template = template;
        }
        if std::env::var("DIRGATE_USE_SSL").map(|v| v == "true").unwrap_or(false) {
            config.directory.use_ssl = true;
        }
        if std::env::var("DIRGATE_RFC2307BIS").map(|v| v == "true").unwrap_or(false) {
            config.directory.rfc2307bis = true;
        }
        if let Ok(level) = std::env::var("DIRGATE_LOG_LEVEL") {
            config.logging.level = level;
        }

        config
    }
}

/// Directory server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DirectoryConfig {
    /// Connect over ldaps:// instead of ldap://
    #[serde(default)]
    pub use_ssl: bool,

    /// Directory server host, optionally with port
    /// Example: "ldap.example.org:389"
    pub host: String,

    /// Base DN every full DN is anchored under
    /// Example: "dc=example,dc=org"
    pub search_base: String,

    /// Naming attribute of user entries
    #[serde(default = "default_user_attribute")]
    pub user_attribute: String,

    /// Group membership attribute
    /// Holds a full DN under RFC 2307bis, a bare username otherwise
    #[serde(default = "default_group_attribute")]
    pub group_attribute: String,

    /// RDN sequence between the user entry and the search base
    #[serde(default = "default_user_subtree")]
    pub user_subtree: String,

    /// RDN sequence of the group branch.
    /// Deserialized for compatibility but not consumed by group
    /// resolution, which searches from the base context.
    #[serde(default = "default_group_subtree")]
    pub group_subtree: String,

    /// Group membership query with a {username} placeholder
    /// Example: "(&(objectClass=posixGroup)(memberUid={username}))"
    #[serde(default = "default_group_query_template")]
    pub group_query_template: String,

    /// Group membership attributes hold full DNs (RFC 2307bis)
    /// rather than bare usernames (RFC 2307)
    #[serde(default)]
    pub rfc2307bis: bool,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_user_attribute() -> String {
    "uid".to_string()
}

fn default_group_attribute() -> String {
    "uniqueMember".to_string()
}

fn default_user_subtree() -> String {
    "ou=people".to_string()
}

fn default_group_subtree() -> String {
    "ou=groups".to_string()
}

fn default_group_query_template() -> String {
    "(&(objectClass=posixGroup)(memberUid={username}))".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            use_ssl: false,
            host: String::new(),
            search_base: String::new(),
            user_attribute: default_user_attribute(),
            group_attribute: default_group_attribute(),
            user_subtree: default_user_subtree(),
            group_subtree: default_group_subtree(),
            group_query_template: default_group_query_template(),
            rfc2307bis: false,
            timeout_seconds: default_timeout(),
        }
    }
}

impl DirectoryConfig {
    /// DN of the user entry relative to the search base.
    ///
    /// No escaping of DN metacharacters is performed; usernames are
    /// expected to be plain account names.
    pub fn relative_dn(&self, username: &str) -> String {
        format!("{}={},{}", self.user_attribute, username, self.user_subtree)
    }

    /// Absolute DN of the user entry, used as the bind principal.
    pub fn full_dn(&self, username: &str) -> String {
        format!("{},{}", self.relative_dn(username), self.search_base)
    }

    /// Server URL in its diagnostic form, base DN included.
    pub fn server_url(&self) -> String {
        format!("{}://{}/{}", self.scheme(), self.host, self.search_base)
    }

    /// URL actually dialled. Directory operations name entries
    /// absolutely, so the base DN is not part of the connection URL.
    pub fn connect_url(&self) -> String {
        format!("{}://{}", self.scheme(), self.host)
    }

    fn scheme(&self) -> &'static str {
        if self.use_ssl {
            "ldaps"
        } else {
            "ldap"
        }
    }

    /// Membership filter for the configured group attribute.
    ///
    /// Under RFC 2307bis the attribute stores member DNs, so the
    /// user's full DN is embedded; under plain RFC 2307 it stores
    /// bare usernames.
    pub fn group_search_filter(&self, username: &str) -> String {
        if self.rfc2307bis {
            format!("(&(cn=*)({}={}))", self.group_attribute, self.full_dn(username))
        } else {
            format!("(&(cn=*)({}={}))", self.group_attribute, username)
        }
    }

    /// Group query with the username substituted into the template.
    pub fn group_query(&self, ldap_username: &str) -> String {
        self.group_query_template
            .replace(USERNAME_PLACEHOLDER, ldap_username)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::InvalidConfig("directory host is required".to_string()));
        }

        if self.search_base.is_empty() {
            return Err(Error::InvalidConfig("search base is required".to_string()));
        }

        if self.user_attribute.is_empty() {
            return Err(Error::InvalidConfig("user attribute is required".to_string()));
        }

        if self.group_attribute.is_empty() {
            return Err(Error::InvalidConfig("group attribute is required".to_string()));
        }

        if !self.group_query_template.contains(USERNAME_PLACEHOLDER) {
            return Err(Error::InvalidConfig(format!(
                "group query template must contain the {} placeholder",
                USERNAME_PLACEHOLDER
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
