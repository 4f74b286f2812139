//! Cancellation of in-flight reconciliations.
//!
//! A [`Cancellation`] is handed to the reconciler at construction. Once the
//! paired [`CancellationHandle`] fires, every store call still running is
//! dropped and surfaces [`OperatorError::Cancelled`].

use crate::error::{OperatorError, OperatorResult};
use std::future::Future;
use tokio::sync::watch;

/// Create a connected handle and token.
pub fn cancellation() -> (CancellationHandle, Cancellation) {
    let (tx, rx) = watch::channel(false);
    (CancellationHandle { tx }, Cancellation { rx })
}

/// Triggers cancellation for every clone of the paired [`Cancellation`].
#[derive(Debug)]
pub struct CancellationHandle {
    tx: watch::Sender<bool>,
}

impl CancellationHandle {
    /// Cancel. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observes a [`CancellationHandle`].
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

impl Cancellation {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        cancellation().1
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            // Handle dropped without cancelling.
            std::future::pending::<()>().await;
        }
    }

    /// Run `fut` unless cancellation fires first.
    pub async fn guard<T, F>(&self, fut: F) -> OperatorResult<T>
    where
        F: Future<Output = OperatorResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(OperatorError::Cancelled),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn never_lets_work_through() {
        let token = Cancellation::never();
        assert!(!token.is_cancelled());
        let value = token.guard(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let (handle, token) = cancellation();
        handle.cancel();
        assert!(token.is_cancelled());
        let result: OperatorResult<()> = token.guard(async { Ok(()) }).await;
        assert!(matches!(result, Err(OperatorError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_aborts_outstanding_work() {
        let (handle, token) = cancellation();
        let pending = tokio::spawn(async move {
            token
                .guard(async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(OperatorError::Cancelled)));
    }
}
