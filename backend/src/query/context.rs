//! Per-request identity and the guard around repository calls.

use std::future::Future;
use std::time::Duration;

use axum::http::HeaderMap;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::repository::RepositoryError;

pub const USER_ID_HEADER: &str = "User-Id";
pub const DEPARTMENT_ID_HEADER: &str = "Department-Id";
pub const TENANT_ID_HEADER: &str = "Tenant-Id";

/// Caller identity forwarded by the gateway in front of this service.
/// Never taken from request text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: Option<String>,
    pub department_id: Option<String>,
    pub tenant_id: Option<String>,
}

impl Identity {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    /// Read identity headers; empty values count as absent.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(ToString::to_string)
        };

        Self {
            user_id: header(USER_ID_HEADER),
            department_id: header(DEPARTMENT_ID_HEADER),
            tenant_id: header(TENANT_ID_HEADER),
        }
    }
}

/// Everything one execution needs besides the request text.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub identity: Identity,
    /// Limit for each individual repository call
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl ExecutionContext {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run a repository call, dropping it when the token fires or the timeout
    /// elapses. A token that already fired means the call is never polled.
    pub async fn guard<T, F>(&self, call: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(RepositoryError::Cancelled);
        }

        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| RepositoryError::Timeout(limit))?,
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RepositoryError::Cancelled),
            result = bounded => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::http::HeaderValue;

    #[test]
    fn test_identity_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("u1"));
        headers.insert(DEPARTMENT_ID_HEADER, HeaderValue::from_static(""));
        headers.insert(TENANT_ID_HEADER, HeaderValue::from_static(" t1 "));

        let identity = Identity::from_headers(&headers);
        assert_eq!(identity.user_id.as_deref(), Some("u1"));
        assert_eq!(identity.department_id, None);
        assert_eq!(identity.tenant_id.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_guard_passes_result_through() {
        let ctx = ExecutionContext::default();
        let result = ctx.guard(async { Ok::<_, RepositoryError>(7) }).await;
        assert_matches!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_guard_times_out() {
        let ctx = ExecutionContext::default().with_timeout(Duration::from_millis(10));
        let result = ctx
            .guard(std::future::pending::<Result<(), RepositoryError>>())
            .await;
        assert_matches!(result, Err(RepositoryError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_guard_cancelled_mid_call() {
        let cancel = CancellationToken::new();
        let ctx = ExecutionContext::default().with_cancellation(cancel.clone());

        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        });
        let result = ctx
            .guard(std::future::pending::<Result<(), RepositoryError>>())
            .await;
        trigger.await.unwrap();

        assert_matches!(result, Err(RepositoryError::Cancelled));
    }

    #[tokio::test]
    async fn test_guard_skips_call_after_cancellation() {
        let ctx = ExecutionContext::default();
        ctx.cancel.cancel();

        let mut polled = false;
        let result = ctx
            .guard(async {
                polled = true;
                Ok::<_, RepositoryError>(())
            })
            .await;

        assert_matches!(result, Err(RepositoryError::Cancelled));
        assert!(!polled);
    }
}
