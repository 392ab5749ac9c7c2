//! Last known user, kept on disk for instant startup

use std::sync::Arc;

use spark_auth::SessionStorage;

use crate::error::{Error, Result};
use crate::session::CurrentUser;

/// Storage key of the cached user record.
pub const CACHE_KEY: &str = "sparkUser";

/// A hint, not a source of truth: whatever is read here gets replaced once
/// the backend answers.
#[derive(Clone)]
pub struct LocalCache {
    storage: Arc<dyn SessionStorage>,
}

impl LocalCache {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// A present but unreadable record is an error, not `None`.
    pub fn get(&self) -> Result<Option<CurrentUser>> {
        let raw = match self.storage.get_item(CACHE_KEY).map_err(Error::cache)? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| Error::cache(format!("corrupt cached user: {}", e)))
    }

    pub fn set(&self, user: &CurrentUser) -> Result<()> {
        let raw = serde_json::to_string(user)?;
        self.storage.set_item(CACHE_KEY, &raw).map_err(Error::cache)
    }

    pub fn clear(&self) -> Result<()> {
        self.storage.remove_item(CACHE_KEY).map_err(Error::cache)
    }
}
