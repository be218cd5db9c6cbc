//! Typed access to the two persisted token slots.

use crate::{StorageKeys, StorageResult, TokenStore};

/// High-level API for storing and retrieving session tokens.
pub struct TokenVault {
    storage: Box<dyn TokenStore>,
}

impl TokenVault {
    /// Create a new vault over the given storage backend
    pub fn new(storage: Box<dyn TokenStore>) -> Self {
        Self { storage }
    }

    /// Store the access token
    pub fn set_access_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::ACCESS_TOKEN, token)
    }

    /// Retrieve the access token
    pub fn access_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::ACCESS_TOKEN)
    }

    /// Store the refresh token
    pub fn set_refresh_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::REFRESH_TOKEN, token)
    }

    /// Retrieve the refresh token
    pub fn refresh_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::REFRESH_TOKEN)
    }

    /// Store both tokens after a successful login.
    pub fn store_tokens(&self, access_token: &str, refresh_token: &str) -> StorageResult<()> {
        self.set_access_token(access_token)?;
        self.set_refresh_token(refresh_token)?;
        Ok(())
    }

    /// A stored session needs both slots; absence of either means none.
    pub fn has_session(&self) -> StorageResult<bool> {
        Ok(self.storage.has(StorageKeys::ACCESS_TOKEN)?
            && self.storage.has(StorageKeys::REFRESH_TOKEN)?)
    }

    /// Remove both tokens. Both deletes are attempted even if the first fails.
    pub fn clear(&self) -> StorageResult<()> {
        let access = self.storage.delete(StorageKeys::ACCESS_TOKEN);
        let refresh = self.storage.delete(StorageKeys::REFRESH_TOKEN);
        access?;
        refresh?;
        tracing::debug!("Cleared stored tokens");
        Ok(())
    }
}
