//! The storage collaborator's interface (§6). Its behaviour is out of scope for this crate; the
//! in-memory implementation here exists only to give the resource-server HTTP surface something
//! to forward validated requests to.

use lws_core::ValidatedRequest;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
}

#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;
    async fn write(&self, path: &str, body: Vec<u8>) -> Result<(), StorageError>;
    async fn create(&self, path: &str, body: Vec<u8>) -> Result<(), StorageError>;
    async fn append(&self, path: &str, body: Vec<u8>) -> Result<(), StorageError>;
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
    async fn exists(&self, path: &str) -> bool;
}

/// In-memory backend for local development and tests.
#[derive(Default)]
pub struct InMemoryStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StorageBackend for InMemoryStorage {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn write(&self, path: &str, body: Vec<u8>) -> Result<(), StorageError> {
        self.files.lock().insert(path.to_string(), body);
        Ok(())
    }

    async fn create(&self, path: &str, body: Vec<u8>) -> Result<(), StorageError> {
        let mut files = self.files.lock();
        if files.contains_key(path) {
            return Err(StorageError::AlreadyExists);
        }
        files.insert(path.to_string(), body);
        Ok(())
    }

    async fn append(&self, path: &str, body: Vec<u8>) -> Result<(), StorageError> {
        self.files.lock().entry(path.to_string()).or_default().extend(body);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.files
            .lock()
            .remove(path)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    async fn exists(&self, path: &str) -> bool {
        self.files.lock().contains_key(path)
    }
}

/// Dispatches a [`ValidatedRequest`] to the action the action tag names (§4.6 step 9, §6).
pub async fn dispatch(
    backend: &dyn StorageBackend,
    req: &ValidatedRequest,
    body: Vec<u8>,
) -> Result<Vec<u8>, StorageError> {
    match req.action {
        lws_core::Action::Read => backend.read(&req.resource_path).await,
        lws_core::Action::Create => backend.create(&req.resource_path, body).await.map(|()| Vec::new()),
        lws_core::Action::Update => backend.write(&req.resource_path, body).await.map(|()| Vec::new()),
        lws_core::Action::Append => backend.append(&req.resource_path, body).await.map(|()| Vec::new()),
        lws_core::Action::Delete => backend.delete(&req.resource_path).await.map(|()| Vec::new()),
    }
}
