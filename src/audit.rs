//! Download audit log
//!
//! A session-scoped, append-only record of template downloads. Entries live as long as the
//! session that created them.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::TemplateId;

/// Audit log errors
#[derive(Debug, Error)]
pub enum AuditLogError {
    /// The log backend rejected the entry
    #[error("download audit log unavailable: {0}")]
    Unavailable(String),
}

/// One completed download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// Template id
    pub template_id: TemplateId,

    /// Template name
    pub template_name: String,

    /// Format the shopper asked for, upper case (`PNG`, `JPG`, `PDF`)
    pub format: String,

    /// Whether the original asset was delivered instead of a conversion
    pub fallback: bool,

    /// When the file was saved
    pub downloaded_at: Timestamp,
}

/// Append-only download log.
#[automock]
#[async_trait]
pub trait DownloadAuditLog: Send + Sync {
    /// Every entry in append order.
    async fn load(&self) -> Result<Vec<DownloadRecord>, AuditLogError>;

    /// Append an entry.
    async fn append(&self, record: DownloadRecord) -> Result<(), AuditLogError>;
}

/// In-memory log that lives for the session.
#[derive(Debug, Default)]
pub struct SessionDownloadLog {
    records: Mutex<Vec<DownloadRecord>>,
}

impl SessionDownloadLog {
    /// Creates an empty log
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DownloadAuditLog for SessionDownloadLog {
    async fn load(&self) -> Result<Vec<DownloadRecord>, AuditLogError> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn append(&self, record: DownloadRecord) -> Result<(), AuditLogError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);

        Ok(())
    }
}
