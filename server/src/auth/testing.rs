//! In-process directory double shared by the auth tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::directory::{
    DirectoryClient, DirectoryConnection, DirectoryEntry, DirectoryError, escape_filter_value,
};
use crate::core::config::{DirectoryAuthMode, DirectoryConfig};

pub const SERVICE_DN: &str = "cn=search,dc=example,dc=org";
pub const SERVICE_PASSWORD: &str = "search-secret";

pub fn directory_config() -> DirectoryConfig {
    DirectoryConfig {
        host: "ldap.example.org".to_string(),
        port: 636,
        tls: true,
        search_base: "ou=people,dc=example,dc=org".to_string(),
        search_user: SERVICE_DN.to_string(),
        search_auth: SERVICE_PASSWORD.to_string(),
        search_attr: "uid".to_string(),
        mail_attr: "email".to_string(),
        name_attr: "sn".to_string(),
        first_name_attr: None,
        last_name_attr: None,
        authenticate: DirectoryAuthMode::Bind,
        password_attr: "userPassword".to_string(),
        timeout: Duration::from_secs(2),
    }
}

/// How the fake server misbehaves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Failure {
    #[default]
    None,
    Connect,
    Search,
    Hang,
}

#[derive(Default)]
struct State {
    entries: Vec<(DirectoryEntry, String)>,
    failure: Failure,
    filters: Vec<String>,
    requested: Vec<Vec<String>>,
}

/// Directory that serves a fixed set of entries keyed by `uid`
#[derive(Clone, Default)]
pub struct FakeDirectory {
    state: Arc<Mutex<State>>,
    connects: Arc<AtomicUsize>,
    unbinds: Arc<AtomicUsize>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, entry: DirectoryEntry, password: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .entries
            .push((entry, password.to_string()));
        self
    }

    pub fn failing(self, failure: Failure) -> Self {
        self.state.lock().unwrap().failure = failure;
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn unbinds(&self) -> usize {
        self.unbinds.load(Ordering::SeqCst)
    }

    pub fn filters(&self) -> Vec<String> {
        self.state.lock().unwrap().filters.clone()
    }

    pub fn requested_attributes(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().requested.clone()
    }
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
    async fn connect(&self) -> Result<Box<dyn DirectoryConnection>, DirectoryError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.state.lock().unwrap().failure == Failure::Connect {
            return Err(DirectoryError::Transport("connection refused".to_string()));
        }
        Ok(Box::new(FakeConnection {
            directory: self.clone(),
        }))
    }
}

struct FakeConnection {
    directory: FakeDirectory,
}

#[async_trait]
impl DirectoryConnection for FakeConnection {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        if dn == SERVICE_DN && password == SERVICE_PASSWORD {
            return Ok(());
        }
        let state = self.directory.state.lock().unwrap();
        let accepted = state
            .entries
            .iter()
            .any(|(entry, pw)| entry.dn == dn && pw == password);
        if accepted {
            Ok(())
        } else {
            Err(DirectoryError::InvalidCredentials)
        }
    }

    async fn search(
        &mut self,
        _base: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let failure = {
            let mut state = self.directory.state.lock().unwrap();
            state.filters.push(filter.to_string());
            state.requested.push(attributes.to_vec());
            state.failure
        };
        match failure {
            Failure::Search => return Err(DirectoryError::Transport("connection reset".into())),
            Failure::Hang => tokio::time::sleep(Duration::from_secs(3600)).await,
            _ => {}
        }

        let state = self.directory.state.lock().unwrap();
        Ok(state
            .entries
            .iter()
            .filter(|(entry, _)| {
                entry
                    .first("uid")
                    .is_some_and(|uid| format!("(uid={})", escape_filter_value(uid)) == filter)
            })
            .map(|(entry, _)| entry.clone())
            .collect())
    }

    async fn unbind(&mut self) -> Result<(), DirectoryError> {
        self.directory.unbinds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// The `tux` account: surname "Tux", mail "tux@example.org"
pub fn tux_entry() -> DirectoryEntry {
    DirectoryEntry::new("uid=tux,ou=people,dc=example,dc=org")
        .with_attribute("uid", &["tux"])
        .with_attribute("sn", &["Tux"])
        .with_attribute("email", &["tux@example.org"])
}
