/// Durable records for chrome.storage.local

use crate::domain::normalize_domain_list;
use crate::error::StoreError;
use crate::session::{SessionState, TimerConfig};
use serde::{Deserialize, Serialize};
#[cfg(test)]
use std::cell::RefCell;
use std::rc::Rc;

/// Key holding the full session record
pub const STATE_KEY: &str = "state";
/// Key holding the focus-domain allowlist, edited directly by the popup
pub const DOMAINS_KEY: &str = "focusUrls";

/// Root storage structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageData {
    #[serde(default)]
    pub state: Option<SessionState>,
    #[serde(default, rename = "focusUrls")]
    pub focus_urls: Option<Vec<String>>,
}

impl StorageData {
    pub fn new() -> Self {
        StorageData {
            state: None,
            focus_urls: None,
        }
    }

    /// Build the session state these records describe.
    ///
    /// Missing records fall back to defaults; the allowlist record wins over the
    /// copy embedded in `state`.
    pub fn to_session_state(&self, config: &TimerConfig) -> SessionState {
        let mut state = self
            .state
            .clone()
            .unwrap_or_else(|| SessionState::new(config));

        if let Some(urls) = &self.focus_urls {
            state.focus_domains = urls.clone();
        }
        state.focus_domains = normalize_domain_list(&state.focus_domains);

        if state.long_break_minutes == 0 {
            state.long_break_minutes = config.default_long_break_minutes.max(1);
        }

        state
    }
}

/// Durable key-value store for the session and allowlist records
pub trait PersistentStore {
    fn load(&self) -> Result<StorageData, StoreError>;
    fn save_state(&self, state: &SessionState) -> Result<(), StoreError>;
    fn save_domains(&self, domains: &[String]) -> Result<(), StoreError>;
}

impl<T: PersistentStore + ?Sized> PersistentStore for Rc<T> {
    fn load(&self) -> Result<StorageData, StoreError> {
        (**self).load()
    }

    fn save_state(&self, state: &SessionState) -> Result<(), StoreError> {
        (**self).save_state(state)
    }

    fn save_domains(&self, domains: &[String]) -> Result<(), StoreError> {
        (**self).save_domains(domains)
    }
}

/// In-process store for tests. Clones share the same records.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryRecords>>,
}

#[cfg(test)]
#[derive(Debug, Default)]
struct MemoryRecords {
    data: StorageData,
    failing: bool,
    writes: usize,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: StorageData) -> Self {
        let store = Self::new();
        store.inner.borrow_mut().data = data;
        store
    }

    /// Make every read and write fail until switched back
    pub fn set_failing(&self, failing: bool) {
        self.inner.borrow_mut().failing = failing;
    }

    pub fn data(&self) -> StorageData {
        self.inner.borrow().data.clone()
    }

    /// Replace the allowlist record the way an external editor would
    pub fn put_domains(&self, domains: Vec<String>) {
        self.inner.borrow_mut().data.focus_urls = Some(domains);
    }

    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.inner.borrow().failing {
            Err(StoreError::Unavailable("memory store is failing".to_string()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
impl PersistentStore for MemoryStore {
    fn load(&self) -> Result<StorageData, StoreError> {
        self.check()?;
        Ok(self.data())
    }

    fn save_state(&self, state: &SessionState) -> Result<(), StoreError> {
        self.check()?;
        let mut records = self.inner.borrow_mut();
        records.data.state = Some(state.clone());
        records.writes += 1;
        Ok(())
    }

    fn save_domains(&self, domains: &[String]) -> Result<(), StoreError> {
        self.check()?;
        let mut records = self.inner.borrow_mut();
        records.data.focus_urls = Some(domains.to_vec());
        records.writes += 1;
        Ok(())
    }
}
