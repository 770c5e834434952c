//! Per-user appliance state storage.
//!
//! The engine treats user persistence as an external collaborator behind the
//! [`UserStore`] trait: get-by-email, create, update-fields. The JSON-file
//! implementation keeps the whole user map in memory and rewrites the file on
//! every mutation, which is plenty for a household-scale deployment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("user store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("user store encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("user already exists: {0}")]
    AlreadyExists(String),
    #[error("user not found: {0}")]
    NotFound(String),
    #[error("user store poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Appliance name -> 0/1.
    pub states: BTreeMap<String, i64>,
    /// Last reported total consumption.
    pub total: f64,
}

pub trait UserStore: Send + Sync {
    fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserStoreError>;
    fn create(&self, record: UserRecord) -> Result<(), UserStoreError>;
    /// Merges the given appliance states (and optionally the total) into an
    /// existing record.
    fn update_fields(
        &self,
        email: &str,
        states: &BTreeMap<String, i64>,
        total: Option<f64>,
    ) -> Result<(), UserStoreError>;
}

/// In-memory store; also the engine behind the file-backed one.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<BTreeMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryUserStore {
    fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserStoreError> {
        let users = self.users.read().map_err(|_| UserStoreError::Poisoned)?;
        Ok(users.get(email).cloned())
    }

    fn create(&self, record: UserRecord) -> Result<(), UserStoreError> {
        let mut users = self.users.write().map_err(|_| UserStoreError::Poisoned)?;
        if users.contains_key(&record.email) {
            return Err(UserStoreError::AlreadyExists(record.email));
        }
        users.insert(record.email.clone(), record);
        Ok(())
    }

    fn update_fields(
        &self,
        email: &str,
        states: &BTreeMap<String, i64>,
        total: Option<f64>,
    ) -> Result<(), UserStoreError> {
        let mut users = self.users.write().map_err(|_| UserStoreError::Poisoned)?;
        let record = users
            .get_mut(email)
            .ok_or_else(|| UserStoreError::NotFound(email.to_string()))?;
        for (name, &value) in states {
            record.states.insert(name.clone(), value);
        }
        if let Some(total) = total {
            record.total = total;
        }
        Ok(())
    }
}

/// File-backed store: a single JSON map of email -> record.
#[derive(Debug)]
pub struct JsonFileUserStore {
    path: PathBuf,
    users: RwLock<BTreeMap<String, UserRecord>>,
}

impl JsonFileUserStore {
    /// Opens the store, loading any existing file. A missing file starts an
    /// empty store; it is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, UserStoreError> {
        let path = path.into();
        let users = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            users: RwLock::new(users),
        })
    }

    fn persist(&self, users: &BTreeMap<String, UserRecord>) -> Result<(), UserStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(users)?)?;
        Ok(())
    }
}

impl UserStore for JsonFileUserStore {
    fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserStoreError> {
        let users = self.users.read().map_err(|_| UserStoreError::Poisoned)?;
        Ok(users.get(email).cloned())
    }

    fn create(&self, record: UserRecord) -> Result<(), UserStoreError> {
        let mut users = self.users.write().map_err(|_| UserStoreError::Poisoned)?;
        if users.contains_key(&record.email) {
            return Err(UserStoreError::AlreadyExists(record.email));
        }
        users.insert(record.email.clone(), record);
        self.persist(&users)
    }

    fn update_fields(
        &self,
        email: &str,
        states: &BTreeMap<String, i64>,
        total: Option<f64>,
    ) -> Result<(), UserStoreError> {
        let mut users = self.users.write().map_err(|_| UserStoreError::Poisoned)?;
        let record = users
            .get_mut(email)
            .ok_or_else(|| UserStoreError::NotFound(email.to_string()))?;
        for (name, &value) in states {
            record.states.insert(name.clone(), value);
        }
        if let Some(total) = total {
            record.total = total;
        }
        self.persist(&users)
    }
}
