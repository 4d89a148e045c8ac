//! Bounded request-validate-retry loop shared by every model-backed step.

use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{QudSimError, Result, ValidationError};
use crate::pipeline::schema::ResponseShape;
use crate::traits::capability::{Capability, CompletionRequest, Task};
use crate::types::config::QudSimConfig;

/// How often and how long a step may ask the capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_tries: u32,
    pub call_timeout: Option<Duration>,
}

impl RetryPolicy {
    pub fn new(max_tries: u32) -> Self {
        Self {
            max_tries,
            call_timeout: None,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }
}

impl From<&QudSimConfig> for RetryPolicy {
    fn from(config: &QudSimConfig) -> Self {
        Self {
            max_tries: config.max_tries,
            call_timeout: config.call_timeout(),
        }
    }
}

/// Build a request expecting a response of shape `S`.
pub fn request_for<S: ResponseShape>(
    task: Task,
    model: &str,
    system: &str,
    prompt: String,
) -> CompletionRequest {
    CompletionRequest {
        task,
        model: model.to_string(),
        system: system.to_string(),
        prompt,
        schema_name: S::shape_name(),
        schema: S::strict_schema(),
    }
}

/// Ask `capability` until `validate` accepts a response of shape `S`.
///
/// Capability errors, timeouts, schema mismatches and validation failures
/// all count as failed attempts. Cancellation is returned immediately.
pub async fn request_validated<C, S, T, F>(
    capability: &C,
    request: &CompletionRequest,
    policy: RetryPolicy,
    mut validate: F,
) -> Result<T>
where
    C: Capability + ?Sized,
    S: ResponseShape,
    F: FnMut(S) -> std::result::Result<T, ValidationError>,
{
    let mut last_error = String::from("no attempt was made");

    for attempt in 1..=policy.max_tries {
        let outcome = match call(capability, request, policy.call_timeout).await {
            Ok(value) => S::parse(value).and_then(&mut validate).map_err(|e| e.to_string()),
            Err(QudSimError::Cancelled) => return Err(QudSimError::Cancelled),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(accepted) => {
                debug!(task = %request.task, attempt, "Capability response accepted");
                return Ok(accepted);
            }
            Err(reason) => {
                warn!(
                    task = %request.task,
                    attempt,
                    max_tries = policy.max_tries,
                    reason = %reason,
                    "Capability response rejected"
                );
                last_error = reason;
            }
        }
    }

    Err(QudSimError::GenerationExhausted {
        task: request.task,
        attempts: policy.max_tries,
        last_error,
    })
}

async fn call<C: Capability + ?Sized>(
    capability: &C,
    request: &CompletionRequest,
    deadline: Option<Duration>,
) -> Result<serde_json::Value> {
    match deadline {
        Some(deadline) => tokio::time::timeout(deadline, capability.complete(request))
            .await
            .map_err(|_| QudSimError::Timeout {
                task: request.task,
                millis: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
            })?,
        None => capability.complete(request).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::schema::QudResponse;
    use crate::testing::{MockCapability, MockResponse};
    use serde_json::json;

    fn request() -> CompletionRequest {
        request_for::<QudResponse>(Task::QudGeneration, "test-model", "system", "prompt".into())
    }

    fn non_empty(response: QudResponse) -> std::result::Result<usize, ValidationError> {
        if response.quds.is_empty() {
            Err(ValidationError::NoQuds)
        } else {
            Ok(response.quds.len())
        }
    }

    #[test]
    fn test_request_for_carries_shape() {
        let request = request();
        assert_eq!(request.schema_name, "QudResponse");
        assert_eq!(request.schema["additionalProperties"], json!(false));
        assert_eq!(request.model, "test-model");
    }

    #[tokio::test]
    async fn test_retries_until_valid() {
        let mock = MockCapability::new().with_responses(
            Task::QudGeneration,
            vec![
                MockResponse::Fail("boom".into()),
                MockResponse::Value(json!({"num_quds": 0, "quds": []})),
                MockResponse::Value(json!({"num_quds": 1, "quds": [{"qud": "Why?"}]})),
            ],
        );

        let count = request_validated(&mock, &request(), RetryPolicy::new(3), non_empty)
            .await
            .unwrap();

        assert_eq!(count, 1);
        assert_eq!(mock.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_error() {
        let mock = MockCapability::new().with_responses(
            Task::QudGeneration,
            vec![
                MockResponse::Value(json!({"num_quds": 0, "quds": []})),
                MockResponse::Value(json!({"num_quds": 0, "quds": []})),
            ],
        );

        let err = request_validated(&mock, &request(), RetryPolicy::new(2), non_empty)
            .await
            .unwrap_err();

        match err {
            QudSimError::GenerationExhausted {
                task,
                attempts,
                last_error,
            } => {
                assert_eq!(task, Task::QudGeneration);
                assert_eq!(attempts, 2);
                assert!(last_error.contains("no QUDs"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_attempt() {
        let mock = MockCapability::new()
            .with_delay(Duration::from_millis(200))
            .with_responses(
                Task::QudGeneration,
                vec![MockResponse::Value(json!({"num_quds": 1, "quds": [{"qud": "Why?"}]}))],
            );

        let policy = RetryPolicy::new(1).with_call_timeout(Duration::from_millis(20));
        let err = request_validated(&mock, &request(), policy, non_empty)
            .await
            .unwrap_err();

        match err {
            QudSimError::GenerationExhausted {
                attempts,
                last_error,
                ..
            } => {
                assert_eq!(attempts, 1);
                assert!(last_error.contains("timed out after 20ms"), "{}", last_error);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
