//! Scripted directory backend for exercising the authentication flow
//! without a live server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ldap3::SearchEntry;

use dirgate_core::DirectoryConfig;

use crate::error::{AuthError, AuthResult};
use crate::session::{Directory, DirectorySession};

/// The configuration used throughout the crate's tests.
pub(crate) fn example_config() -> DirectoryConfig {
    DirectoryConfig {
        host: "ldap.example.org".to_string(),
        search_base: "dc=example,dc=org".to_string(),
        group_attribute: "uniqueMember".to_string(),
        rfc2307bis: true,
        ..Default::default()
    }
}

/// Builds a search entry from attribute pairs.
pub(crate) fn entry(dn: &str, attrs: &[(&str, &str)]) -> SearchEntry {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in attrs {
        map.entry((*name).to_string())
            .or_default()
            .push((*value).to_string());
    }

    SearchEntry {
        dn: dn.to_string(),
        attrs: map,
        bin_attrs: HashMap::new(),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedSearch {
    pub base: String,
    pub filter: String,
}

/// A scripted session: entries keyed by DN, one canned result set for
/// subtree searches, and counters for the release discipline.
#[derive(Default)]
pub(crate) struct MockSession {
    entries: HashMap<String, SearchEntry>,
    groups: Vec<SearchEntry>,
    searches: Arc<Mutex<Vec<RecordedSearch>>>,
    closes: Arc<AtomicUsize>,
    closed: bool,
}

impl MockSession {
    pub fn with_entry(mut self, entry: SearchEntry) -> Self {
        self.entries.insert(entry.dn.clone(), entry);
        self
    }

    pub fn with_groups(mut self, groups: Vec<SearchEntry>) -> Self {
        self.groups = groups;
        self
    }

    pub fn searches(&self) -> Vec<RecordedSearch> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl DirectorySession for MockSession {
    async fn entry(&mut self, dn: &str, _attrs: &[&str]) -> AuthResult<Option<SearchEntry>> {
        if self.closed {
            return Err(AuthError::directory("session is closed"));
        }
        Ok(self.entries.get(dn).cloned())
    }

    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        _attrs: &[&str],
    ) -> AuthResult<Vec<SearchEntry>> {
        if self.closed {
            return Err(AuthError::directory("session is closed"));
        }
        self.searches.lock().unwrap().push(RecordedSearch {
            base: base.to_string(),
            filter: filter.to_string(),
        });
        Ok(self.groups.clone())
    }

    async fn close(&mut self) {
        self.closed = true;
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

enum BindOutcome {
    CheckPassword,
    Unavailable,
}

/// A scripted directory accepting one password for every principal.
pub(crate) struct MockDirectory {
    password: String,
    outcome: BindOutcome,
    entries: HashMap<String, SearchEntry>,
    groups: Vec<SearchEntry>,
    pub binds: Arc<Mutex<Vec<String>>>,
    pub closes: Arc<AtomicUsize>,
}

impl MockDirectory {
    pub fn new(password: &str) -> Self {
        Self {
            password: password.to_string(),
            outcome: BindOutcome::CheckPassword,
            entries: HashMap::new(),
            groups: Vec::new(),
            binds: Arc::new(Mutex::new(Vec::new())),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A directory that refuses every connection attempt.
    pub fn unavailable() -> Self {
        let mut directory = Self::new("");
        directory.outcome = BindOutcome::Unavailable;
        directory
    }

    pub fn with_entry(mut self, entry: SearchEntry) -> Self {
        self.entries.insert(entry.dn.clone(), entry);
        self
    }

    pub fn with_groups(mut self, groups: Vec<SearchEntry>) -> Self {
        self.groups = groups;
        self
    }
}

#[async_trait]
impl Directory for MockDirectory {
    type Session = MockSession;

    async fn bind(&self, principal: &str, password: &str) -> AuthResult<Self::Session> {
        self.binds.lock().unwrap().push(principal.to_string());

        match self.outcome {
            BindOutcome::Unavailable => Err(AuthError::directory("connection refused")),
            BindOutcome::CheckPassword => {
                if password != self.password {
                    return Err(AuthError::InvalidCredentials);
                }
                Ok(MockSession {
                    entries: self.entries.clone(),
                    groups: self.groups.clone(),
                    searches: Arc::new(Mutex::new(Vec::new())),
                    closes: self.closes.clone(),
                    closed: false,
                })
            }
        }
    }
}
