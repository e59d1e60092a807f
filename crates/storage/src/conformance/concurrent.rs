use std::future::Future;
use std::sync::Arc;

use super::TestResult;
use crate::{RequestLedger, RequestStatus};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "concurrent_insert_if_absent_exactly_one_wins",
            concurrent_insert_if_absent_exactly_one_wins(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_inserts_different_ids_all_succeed",
            concurrent_inserts_different_ids_all_succeed(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_outcomes_never_regress_success",
            concurrent_outcomes_never_regress_success(factory).await,
        ),
    ]
}

// ── Same id: exactly one creator ─────────────────────────────────────────────

/// N tasks race `insert_if_absent` on the same id. Exactly one observes
/// `true`; the record exists afterwards with the winner's status.
async fn concurrent_insert_if_absent_exactly_one_wins<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let ledger = Arc::new(factory().await);

    let mut handles = Vec::new();
    for _ in 0..N {
        let l = ledger.clone();
        handles.push(tokio::spawn(async move {
            l.insert_if_absent("race-mint", RequestStatus::Pending).await
        }));
    }

    let mut winners = 0;
    for h in handles {
        let created = h
            .await
            .map_err(|e| format!("join: {e}"))?
            .map_err(|e| format!("insert_if_absent: {e}"))?;
        if created {
            winners += 1;
        }
    }
    if winners != 1 {
        return Err(format!("expected exactly 1 creator, got {winners}"));
    }

    let status = ledger
        .get_status("race-mint")
        .await
        .map_err(|e| format!("get_status: {e}"))?;
    if status != RequestStatus::Pending {
        return Err(format!("expected pending, got {status}"));
    }
    Ok(())
}

// ── Different ids: no interference ───────────────────────────────────────────

async fn concurrent_inserts_different_ids_all_succeed<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let ledger = Arc::new(factory().await);

    let mut handles = Vec::new();
    for i in 0..N {
        let l = ledger.clone();
        handles.push(tokio::spawn(async move {
            l.insert(&format!("contract-{i}-mint"), RequestStatus::Pending)
                .await
        }));
    }
    for h in handles {
        h.await
            .map_err(|e| format!("join: {e}"))?
            .map_err(|e| format!("insert: {e}"))?;
    }

    for i in 0..N {
        let id = format!("contract-{i}-mint");
        if !ledger
            .exists(&id)
            .await
            .map_err(|e| format!("exists: {e}"))?
        {
            return Err(format!("{id} missing after concurrent inserts"));
        }
    }
    Ok(())
}

// ── Racing outcomes: Succeeded is sticky ─────────────────────────────────────

/// Half the tasks record Succeeded and half record Failed on the same
/// Pending record. Failed writes that arrive after a Succeeded one must be
/// refused, so the final status is Succeeded whichever order they ran in.
async fn concurrent_outcomes_never_regress_success<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let ledger = Arc::new(factory().await);
    ledger
        .insert("outcome-transfer", RequestStatus::Pending)
        .await
        .map_err(|e| format!("insert: {e}"))?;

    let mut handles = Vec::new();
    for i in 0..N {
        let l = ledger.clone();
        let status = if i % 2 == 0 {
            RequestStatus::Succeeded
        } else {
            RequestStatus::Failed
        };
        handles.push(tokio::spawn(async move {
            // Rejections are expected; only the final state matters here.
            let _ = l.set_status("outcome-transfer", status).await;
        }));
    }
    for h in handles {
        h.await.map_err(|e| format!("join: {e}"))?;
    }

    let status = ledger
        .get_status("outcome-transfer")
        .await
        .map_err(|e| format!("get_status: {e}"))?;
    if status != RequestStatus::Succeeded {
        return Err(format!("expected succeeded, got {status}"));
    }
    Ok(())
}
