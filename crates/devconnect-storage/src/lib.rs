//! Token storage for the DevConnect session client.
//!
//! The session persists exactly two opaque strings, the access token and the
//! refresh token. This crate provides:
//! - [`TokenStore`]: the key-value backend trait
//! - [`FileStorage`]: a JSON file backend (`~/.devconnect/tokens.json`)
//! - [`MemoryStorage`]: a process-local backend for tests and ephemeral use
//! - [`TokenVault`]: typed access to the two token slots

mod file;
mod keys;
mod memory;
mod traits;
mod vault;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::TokenStore;
pub use vault::TokenVault;

use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    /// The token file exists but does not hold a JSON string map.
    #[error("token file is corrupt: {0}")]
    Encoding(String),

    #[error("token file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Open (or lazily create) the token file at `path` and wrap it in a vault.
pub fn create_file_vault(path: &Path) -> StorageResult<TokenVault> {
    let storage = FileStorage::open(path)?;
    Ok(TokenVault::new(Box::new(storage)))
}
