//! Cart snapshot storage.

use std::path::{Path, PathBuf};

use mockall::automock;

use crate::{
    cart::CartLineItem,
    storage::{self, StorageError},
};

/// Where the cart snapshot lives between page loads.
#[automock]
pub trait CartStore: Send {
    /// Load the last saved snapshot. An absent snapshot is an empty cart.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if a snapshot exists but cannot be read.
    fn load(&self) -> Result<Vec<CartLineItem>, StorageError>;

    /// Replace the saved snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the snapshot cannot be written.
    fn save(&mut self, lines: &[CartLineItem]) -> Result<(), StorageError>;
}

/// Keeps the snapshot in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStore {
    saved: Vec<CartLineItem>,
    saves: usize,
}

impl MemoryCartStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// The last saved snapshot
    pub fn saved(&self) -> &[CartLineItem] {
        &self.saved
    }

    /// How many times a snapshot has been written
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl CartStore for MemoryCartStore {
    fn load(&self) -> Result<Vec<CartLineItem>, StorageError> {
        Ok(self.saved.clone())
    }

    fn save(&mut self, lines: &[CartLineItem]) -> Result<(), StorageError> {
        self.saved = lines.to_vec();
        self.saves += 1;

        Ok(())
    }
}

/// Keeps the snapshot in a JSON file, the equivalent of the browser's local storage.
#[derive(Debug, Clone)]
pub struct JsonFileCartStore {
    path: PathBuf,
}

impl JsonFileCartStore {
    /// Store the snapshot at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Snapshot location
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CartStore for JsonFileCartStore {
    fn load(&self) -> Result<Vec<CartLineItem>, StorageError> {
        storage::read_json_or_default(&self.path)
    }

    fn save(&mut self, lines: &[CartLineItem]) -> Result<(), StorageError> {
        storage::write_json_atomic(&self.path, lines)
    }
}
