use std::future::Future;

use super::TestResult;
use crate::{RequestLedger, RequestStatus, StorageError};

pub(super) async fn run_error_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "error",
            "get_status_nonexistent",
            get_status_nonexistent(factory).await,
        ),
        TestResult::from_result(
            "error",
            "set_status_nonexistent",
            set_status_nonexistent(factory).await,
        ),
        TestResult::from_result(
            "error",
            "set_status_nonexistent_does_not_create",
            set_status_nonexistent_does_not_create(factory).await,
        ),
    ]
}

// ── 1. get_status on an empty ledger returns NotFound with the id ────────────

async fn get_status_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.get_status("loan-42-mint").await {
        Err(StorageError::NotFound { request_id }) => {
            if request_id != "loan-42-mint" {
                return Err(format!(
                    "expected request_id \"loan-42-mint\", got \"{}\"",
                    request_id
                ));
            }
            Ok(())
        }
        other => Err(format!("expected NotFound, got {:?}", other)),
    }
}

// ── 2. set_status on a missing id returns NotFound ───────────────────────────

async fn set_status_nonexistent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.set_status("ghost-mint", RequestStatus::Succeeded).await {
        Err(StorageError::NotFound { .. }) => Ok(()),
        other => Err(format!("expected NotFound, got {:?}", other)),
    }
}

// ── 3. a failed set_status is not an upsert ──────────────────────────────────

async fn set_status_nonexistent_does_not_create<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let _ = s.set_status("ghost-mint", RequestStatus::Failed).await;
    let exists = s
        .exists("ghost-mint")
        .await
        .map_err(|e| format!("exists: {e}"))?;
    if exists {
        return Err("set_status on a missing id created a record".to_string());
    }
    Ok(())
}
