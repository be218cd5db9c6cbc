//! The backend seam for persisted tokens.

use crate::StorageResult;

/// String key-value store. Implementations must persist each write before
/// returning so a crash never leaves a half-updated session.
pub trait TokenStore: Send + Sync {
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Remove `key`, reporting whether it was present.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    fn has(&self, key: &str) -> StorageResult<bool> {
        self.get(key).map(|value| value.is_some())
    }
}
