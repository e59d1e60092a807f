//! In-process ledger backed by a `HashMap`.
//!
//! Not durable. Used by tests and by `ledger = "memory"` deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::record::{RequestRecord, RequestStatus};
use crate::traits::RequestLedger;

#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: RwLock<HashMap<String, RequestStatus>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records, sorted by request id.
    pub async fn records(&self) -> Vec<RequestRecord> {
        let records = self.records.read().await;
        let mut out: Vec<RequestRecord> = records
            .iter()
            .map(|(id, status)| RequestRecord {
                request_id: id.clone(),
                status: *status,
            })
            .collect();
        out.sort_by(|a, b| a.request_id.cmp(&b.request_id));
        out
    }
}

#[async_trait]
impl RequestLedger for MemoryLedger {
    async fn exists(&self, request_id: &str) -> Result<bool, StorageError> {
        Ok(self.records.read().await.contains_key(request_id))
    }

    async fn insert(&self, request_id: &str, status: RequestStatus) -> Result<(), StorageError> {
        if self.insert_if_absent(request_id, status).await? {
            Ok(())
        } else {
            Err(StorageError::AlreadyExists {
                request_id: request_id.to_string(),
            })
        }
    }

    async fn insert_if_absent(
        &self,
        request_id: &str,
        status: RequestStatus,
    ) -> Result<bool, StorageError> {
        let mut records = self.records.write().await;
        if records.contains_key(request_id) {
            return Ok(false);
        }
        records.insert(request_id.to_string(), status);
        Ok(true)
    }

    async fn set_status(
        &self,
        request_id: &str,
        status: RequestStatus,
    ) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        let current = records
            .get_mut(request_id)
            .ok_or_else(|| StorageError::NotFound {
                request_id: request_id.to_string(),
            })?;
        if !current.can_transition_to(status) {
            return Err(StorageError::IllegalTransition {
                request_id: request_id.to_string(),
                from: *current,
                to: status,
            });
        }
        *current = status;
        Ok(())
    }

    async fn get_status(&self, request_id: &str) -> Result<RequestStatus, StorageError> {
        self.records
            .read()
            .await
            .get(request_id)
            .copied()
            .ok_or_else(|| StorageError::NotFound {
                request_id: request_id.to_string(),
            })
    }
}
