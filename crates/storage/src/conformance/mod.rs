//! Conformance test suite for `RequestLedger` implementations.
//!
//! This module provides a backend-agnostic test suite that any
//! `RequestLedger` implementation can run to verify correctness. The suite
//! covers:
//!
//! - **Initialization**: insert, exists, get_status, duplicate detection
//! - **Transitions**: forward moves accepted, backward moves rejected
//! - **Error handling**: correct error variants for missing records
//! - **Concurrency**: racing insert-if-absent calls produce exactly one winner
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty ledger for each test:
//!
//! ```ignore
//! use relay_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn sqlite_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         SqliteLedger::open_in_memory().await.unwrap()
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod concurrent;
mod error;
mod init;
mod transition;

use std::fmt;
use std::future::Future;

use crate::RequestLedger;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "init", "transition", "concurrent").
    pub category: String,
    /// Test name (e.g. "insert_then_exists").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a ledger backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// ledger, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: RequestLedger,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(init::run_init_tests(&factory).await);
    results.extend(error::run_error_tests(&factory).await);
    results.extend(transition::run_transition_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}
