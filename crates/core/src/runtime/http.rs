//! HTTP contract runtime — posts the call envelope to an executor service.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking`. The request
//! body is the envelope exactly as it was read from chain; the response body
//! is the runtime's reply.
//!
//! The agent carries its own global deadline. Dropping the future on the
//! async side does not stop a blocking task, so the socket must be closed
//! by ureq itself when the deadline passes.

use std::time::Duration;

use async_trait::async_trait;

use super::ContractRuntime;
use crate::error::InvocationError;

pub struct HttpRuntime {
    url: String,
    timeout: Duration,
}

impl HttpRuntime {
    /// `timeout` bounds the whole exchange: connect, send and read.
    pub fn new(url: &str, timeout: Duration) -> Self {
        HttpRuntime {
            url: url.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl ContractRuntime for HttpRuntime {
    async fn call(&self, envelope: &str) -> Result<String, InvocationError> {
        let url = self.url.clone();
        let timeout = self.timeout;
        let envelope = envelope.to_string();

        tokio::task::spawn_blocking(move || {
            let agent: ureq::Agent = ureq::Agent::config_builder()
                .timeout_global(Some(timeout))
                .build()
                .into();
            let response = agent
                .post(&url)
                .header("Content-Type", "application/json")
                .send(envelope)
                .map_err(|e| classify_error(&url, timeout, e))?;

            response
                .into_body()
                .read_to_string()
                .map_err(|e| match e {
                    ureq::Error::Timeout(_) => InvocationError::Timeout { after: timeout },
                    other => InvocationError::Unreachable {
                        message: format!("failed to read executor response: {}", other),
                    },
                })
        })
        .await
        .map_err(|e| InvocationError::Unreachable {
            message: format!("task join error: {}", e),
        })?
    }

    fn runtime_id(&self) -> &str {
        "http"
    }
}

fn classify_error(url: &str, timeout: Duration, err: ureq::Error) -> InvocationError {
    match err {
        ureq::Error::StatusCode(code) => InvocationError::Rejected {
            message: format!("executor returned http status {}", code),
        },
        ureq::Error::Timeout(_) => InvocationError::Timeout { after: timeout },
        other => InvocationError::Unreachable {
            message: format!("{}: {}", url, other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        // Port 9 (discard) is essentially never listening on loopback.
        let runtime = HttpRuntime::new("http://127.0.0.1:9/execute", Duration::from_secs(5));
        let err = runtime.call(r#"{"mint_sample_nft":{}}"#).await.unwrap_err();
        assert!(matches!(err, InvocationError::Unreachable { .. }), "{err:?}");
    }

    #[test]
    fn status_codes_are_rejections() {
        let err = classify_error(
            "http://executor/execute",
            Duration::from_secs(1),
            ureq::Error::StatusCode(500),
        );
        assert_eq!(
            err,
            InvocationError::Rejected {
                message: "executor returned http status 500".into()
            }
        );
    }
}
