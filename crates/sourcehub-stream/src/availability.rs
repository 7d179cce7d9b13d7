//! Fire-and-forget availability checks.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use sourcehub_core::contracts::AvailabilityChecker;
use sourcehub_core::models::source::Source;

/// Hands a source off to the availability checker on a detached task.
///
/// The caller only learns that the hand-off happened; the outcome is
/// observable through a later state read or event, never through the
/// triggering request. The returned handle exists for tests and
/// shutdown, not for result inspection.
pub fn request_availability_check<C: AvailabilityChecker>(
    checker: Arc<C>,
    source: Source,
) -> JoinHandle<()> {
    let source_id = source.id;
    debug!(source_id, "availability check requested");

    tokio::spawn(async move {
        if let Err(error) = checker.check(source).await {
            warn!(source_id, %error, "availability check failed");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sourcehub_core::error::{Error, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingChecker {
        calls: AtomicUsize,
        fail: bool,
    }

    impl AvailabilityChecker for CountingChecker {
        async fn check(&self, _source: Source) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::Database("checker backend down".into()))
            } else {
                Ok(())
            }
        }
    }

    fn source() -> Source {
        Source {
            id: 1,
            tenant_id: 1,
            name: "checked".into(),
            uid: None,
            source_type_id: 1,
            availability_status: None,
            paused_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn hand_off_runs_the_checker() {
        let checker = Arc::new(CountingChecker {
            calls: AtomicUsize::new(0),
            fail: false,
        });

        request_availability_check(Arc::clone(&checker), source())
            .await
            .unwrap();
        assert_eq!(checker.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn checker_failure_does_not_propagate() {
        let checker = Arc::new(CountingChecker {
            calls: AtomicUsize::new(0),
            fail: true,
        });

        // The task completes normally; the failure is only logged.
        request_availability_check(Arc::clone(&checker), source())
            .await
            .unwrap();
        assert_eq!(checker.calls.load(Ordering::SeqCst), 1);
    }
}
