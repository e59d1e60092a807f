use std::future::Future;

use super::TestResult;
use crate::{RequestLedger, RequestStatus, StorageError};

pub(super) async fn run_transition_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "transition",
            "pending_to_succeeded",
            walk(factory, &[RequestStatus::Succeeded]).await,
        ),
        TestResult::from_result(
            "transition",
            "pending_to_failed",
            walk(factory, &[RequestStatus::Failed]).await,
        ),
        TestResult::from_result(
            "transition",
            "failed_retry_to_succeeded",
            walk(factory, &[RequestStatus::Failed, RequestStatus::Succeeded]).await,
        ),
        TestResult::from_result(
            "transition",
            "repeated_failure",
            walk(factory, &[RequestStatus::Failed, RequestStatus::Failed]).await,
        ),
        TestResult::from_result(
            "transition",
            "succeeded_to_failed_rejected",
            rejected(factory, RequestStatus::Succeeded, RequestStatus::Failed).await,
        ),
        TestResult::from_result(
            "transition",
            "succeeded_to_pending_rejected",
            rejected(factory, RequestStatus::Succeeded, RequestStatus::Pending).await,
        ),
        TestResult::from_result(
            "transition",
            "failed_to_pending_rejected",
            rejected(factory, RequestStatus::Failed, RequestStatus::Pending).await,
        ),
    ]
}

/// Insert a Pending record and apply `steps` in order; every step must be
/// accepted and observable.
async fn walk<S, F, Fut>(factory: &F, steps: &[RequestStatus]) -> Result<(), String>
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert("walk-mint", RequestStatus::Pending)
        .await
        .map_err(|e| format!("insert: {e}"))?;

    for step in steps {
        s.set_status("walk-mint", *step)
            .await
            .map_err(|e| format!("set_status({step}): {e}"))?;
        let observed = s
            .get_status("walk-mint")
            .await
            .map_err(|e| format!("get_status: {e}"))?;
        if observed != *step {
            return Err(format!("after set_status({step}) read back {observed}"));
        }
    }
    Ok(())
}

/// Move a record to `reached` (via Pending), then check that `to` is refused
/// and the stored status is unchanged.
async fn rejected<S, F, Fut>(
    factory: &F,
    reached: RequestStatus,
    to: RequestStatus,
) -> Result<(), String>
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert("mono-mint", RequestStatus::Pending)
        .await
        .map_err(|e| format!("insert: {e}"))?;
    s.set_status("mono-mint", reached)
        .await
        .map_err(|e| format!("set_status({reached}): {e}"))?;

    match s.set_status("mono-mint", to).await {
        Err(StorageError::IllegalTransition { from, to: target, .. })
            if from == reached && target == to => {}
        other => {
            return Err(format!(
                "expected IllegalTransition {reached} -> {to}, got {:?}",
                other
            ))
        }
    }

    let observed = s
        .get_status("mono-mint")
        .await
        .map_err(|e| format!("get_status: {e}"))?;
    if observed != reached {
        return Err(format!("rejected transition changed status to {observed}"));
    }
    Ok(())
}
