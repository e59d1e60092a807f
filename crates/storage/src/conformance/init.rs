use std::future::Future;

use super::TestResult;
use crate::{RequestLedger, RequestStatus, StorageError};

pub(super) async fn run_init_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "init",
            "empty_ledger_has_no_records",
            empty_ledger_has_no_records(factory).await,
        ),
        TestResult::from_result(
            "init",
            "insert_then_exists_and_get",
            insert_then_exists_and_get(factory).await,
        ),
        TestResult::from_result(
            "init",
            "insert_duplicate_fails",
            insert_duplicate_fails(factory).await,
        ),
        TestResult::from_result(
            "init",
            "insert_if_absent_reports_creation",
            insert_if_absent_reports_creation(factory).await,
        ),
        TestResult::from_result(
            "init",
            "ids_are_independent",
            ids_are_independent(factory).await,
        ),
    ]
}

async fn empty_ledger_has_no_records<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let exists = s
        .exists("abc123-mint")
        .await
        .map_err(|e| format!("exists: {e}"))?;
    if exists {
        return Err("fresh ledger reports abc123-mint as existing".to_string());
    }
    Ok(())
}

async fn insert_then_exists_and_get<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert("abc123-mint", RequestStatus::Pending)
        .await
        .map_err(|e| format!("insert: {e}"))?;

    if !s
        .exists("abc123-mint")
        .await
        .map_err(|e| format!("exists: {e}"))?
    {
        return Err("inserted record not reported by exists".to_string());
    }
    let status = s
        .get_status("abc123-mint")
        .await
        .map_err(|e| format!("get_status: {e}"))?;
    if status != RequestStatus::Pending {
        return Err(format!("expected pending, got {status}"));
    }
    Ok(())
}

async fn insert_duplicate_fails<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert("abc123-transfer", RequestStatus::Pending)
        .await
        .map_err(|e| format!("first insert: {e}"))?;

    match s.insert("abc123-transfer", RequestStatus::Failed).await {
        Err(StorageError::AlreadyExists { request_id }) if request_id == "abc123-transfer" => {}
        other => return Err(format!("expected AlreadyExists, got {:?}", other)),
    }

    // The rejected insert must not have touched the stored status.
    let status = s
        .get_status("abc123-transfer")
        .await
        .map_err(|e| format!("get_status: {e}"))?;
    if status != RequestStatus::Pending {
        return Err(format!("duplicate insert overwrote status to {status}"));
    }
    Ok(())
}

async fn insert_if_absent_reports_creation<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let first = s
        .insert_if_absent("h-mint", RequestStatus::Pending)
        .await
        .map_err(|e| format!("first insert_if_absent: {e}"))?;
    let second = s
        .insert_if_absent("h-mint", RequestStatus::Failed)
        .await
        .map_err(|e| format!("second insert_if_absent: {e}"))?;

    if !first || second {
        return Err(format!(
            "expected (true, false), got ({}, {})",
            first, second
        ));
    }
    let status = s
        .get_status("h-mint")
        .await
        .map_err(|e| format!("get_status: {e}"))?;
    if status != RequestStatus::Pending {
        return Err(format!("expected pending, got {status}"));
    }
    Ok(())
}

async fn ids_are_independent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert("h-mint", RequestStatus::Pending)
        .await
        .map_err(|e| format!("insert mint: {e}"))?;
    s.insert("h-transfer", RequestStatus::Pending)
        .await
        .map_err(|e| format!("insert transfer: {e}"))?;
    s.set_status("h-mint", RequestStatus::Succeeded)
        .await
        .map_err(|e| format!("set_status: {e}"))?;

    let transfer = s
        .get_status("h-transfer")
        .await
        .map_err(|e| format!("get_status: {e}"))?;
    if transfer != RequestStatus::Pending {
        return Err(format!(
            "updating h-mint changed h-transfer to {transfer}"
        ));
    }
    Ok(())
}
