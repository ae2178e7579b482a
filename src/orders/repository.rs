//! Order storage.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;
use tokio::task::JoinError;

use crate::{
    orders::Order,
    storage::{self, StorageError},
};

/// Order storage errors
#[derive(Debug, Error)]
pub enum OrderStoreError {
    /// The backing file could not be read or written
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The blocking storage task did not complete
    #[error("order storage task failed: {0}")]
    Task(#[from] JoinError),
}

/// Durable, append-only order collection.
#[automock]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Every stored order, in insertion order.
    async fn load(&self) -> Result<Vec<Order>, OrderStoreError>;

    /// Append an order to the end of the collection.
    async fn append(&self, order: Order) -> Result<(), OrderStoreError>;
}

#[async_trait]
impl<R: OrderRepository + ?Sized> OrderRepository for Arc<R> {
    async fn load(&self) -> Result<Vec<Order>, OrderStoreError> {
        (**self).load().await
    }

    async fn append(&self, order: Order) -> Result<(), OrderStoreError> {
        (**self).append(order).await
    }
}

/// Keeps orders in process memory.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: Mutex<Vec<Order>>,
}

impl InMemoryOrderRepository {
    /// Creates an empty repository
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn load(&self) -> Result<Vec<Order>, OrderStoreError> {
        Ok(self
            .orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn append(&self, order: Order) -> Result<(), OrderStoreError> {
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(order);

        Ok(())
    }
}

/// Keeps orders in a JSON array on disk. Every append reads the whole array and rewrites it.
#[derive(Debug)]
pub struct JsonFileOrderRepository {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileOrderRepository {
    /// Store orders at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Collection location
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OrderRepository for JsonFileOrderRepository {
    async fn load(&self) -> Result<Vec<Order>, OrderStoreError> {
        let path = self.path.clone();

        let orders = tokio::task::spawn_blocking(move || {
            storage::read_json_or_default::<Vec<Order>>(&path)
        })
        .await??;

        Ok(orders)
    }

    async fn append(&self, order: Order) -> Result<(), OrderStoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || {
            let mut orders: Vec<Order> = storage::read_json_or_default(&path)?;
            orders.push(order);
            storage::write_json_atomic(&path, &orders)
        })
        .await??;

        Ok(())
    }
}
