//! Per-call deadline and cancellation.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::errors::{DigitalPostError, DigitalPostResult};

/// Options for a single client call.
///
/// Neither is set by default: the call then runs until the transport
/// finishes or times out on its own.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Deadline for the whole call.
    pub timeout: Option<Duration>,
    /// Token that aborts the call when cancelled.
    pub cancellation: Option<CancellationToken>,
}

impl CallOptions {
    /// Creates empty call options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets a cancellation token.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Runs `fut` under these options.
    ///
    /// Cancellation is checked before the future is polled, so an already
    /// cancelled token fails without doing any work.
    pub(crate) async fn run<T, F>(&self, fut: F) -> DigitalPostResult<T>
    where
        F: Future<Output = DigitalPostResult<T>>,
    {
        let guarded = async {
            match &self.cancellation {
                Some(token) => {
                    tokio::select! {
                        biased;
                        () = token.cancelled() => Err(DigitalPostError::Cancelled),
                        result = fut => result,
                    }
                }
                None => fut.await,
            }
        };

        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, guarded)
                .await
                .unwrap_or(Err(DigitalPostError::Timeout { timeout })),
            None => guarded.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_result_through() {
        let result = CallOptions::new().run(async { Ok::<_, DigitalPostError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();

        let result = CallOptions::new()
            .cancellation(token)
            .run(async { Ok::<_, DigitalPostError>(()) })
            .await;

        assert!(matches!(result, Err(DigitalPostError::Cancelled)));
    }

    #[tokio::test]
    async fn test_timeout_elapses() {
        let result = CallOptions::new()
            .timeout(Duration::from_millis(10))
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, DigitalPostError>(())
            })
            .await;

        match result {
            Err(DigitalPostError::Timeout { timeout }) => {
                assert_eq!(timeout, Duration::from_millis(10));
            }
            other => panic!("Expected timeout, got {:?}", other),
        }
    }
}
