//! NotifierHandle - manages a notifier with isolated queue and worker task

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{Notification, Notifier};

use crate::metrics::NotifierMetrics;

/// Handle to a running notifier worker
pub struct NotifierHandle {
    /// Notifier name
    name: String,
    /// Channel to send notifications to worker
    tx: mpsc::Sender<Notification>,
    /// Shared metrics
    metrics: Arc<NotifierMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl NotifierHandle {
    /// Create a new NotifierHandle and spawn the worker task
    pub fn spawn<N: Notifier + Send + 'static>(notifier: N, queue_capacity: usize) -> Self {
        let name = notifier.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity);
        let metrics = Arc::new(NotifierMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            notifier_worker(notifier, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<NotifierMetrics> {
        &self.metrics
    }

    /// Send a notification to the worker (non-blocking)
    ///
    /// Returns true if queued, false if the queue is full (dropped)
    pub fn try_send(&self, notification: Notification) -> bool {
        match self.tx.try_send(notification) {
            Ok(()) => {
                // Queue length approximation
                self.metrics.set_queue_len(self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(n)) => {
                self.metrics.inc_dropped_count();
                warn!(
                    notifier = %self.name,
                    uid = %n.uid(),
                    kind = n.kind(),
                    "Queue full, notification dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(notifier = %self.name, "Notifier worker closed unexpectedly");
                false
            }
        }
    }

    /// Shutdown the notifier worker gracefully
    #[instrument(name = "notifier_handle_shutdown", skip(self))]
    pub async fn shutdown(self) {
        // Drop sender to signal worker to stop
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(notifier = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(notifier = %self.name, "NotifierHandle shutdown complete");
    }
}

/// Worker task that consumes notifications and delivers them
#[instrument(
    name = "notifier_worker_loop",
    skip(notifier, rx, metrics),
    fields(notifier = %name)
)]
async fn notifier_worker<N: Notifier>(
    mut notifier: N,
    mut rx: mpsc::Receiver<Notification>,
    metrics: Arc<NotifierMetrics>,
    name: String,
) {
    debug!(notifier = %name, "Notifier worker started");

    while let Some(notification) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match notifier.send(&notification).await {
            Ok(()) => {
                metrics.inc_sent_count();
            }
            Err(e) => {
                metrics.inc_failure_count();
                error!(
                    notifier = %name,
                    uid = %notification.uid(),
                    kind = notification.kind(),
                    error = %e,
                    "Delivery failed"
                );
                // Continue processing - don't crash on single failure
            }
        }
    }

    // Cleanup
    if let Err(e) = notifier.flush().await {
        error!(notifier = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = notifier.close().await {
        error!(notifier = %name, error = %e, "Close failed on shutdown");
    }

    debug!(notifier = %name, "Notifier worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Notifier, TrackError};
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::{sleep, Duration};

    /// Mock notifier for testing
    struct MockNotifier {
        name: String,
        sent_count: Arc<AtomicU64>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl Notifier for MockNotifier {
        fn name(&self) -> &str {
            &self.name
        }

        async fn send(&mut self, _n: &Notification) -> Result<(), TrackError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(TrackError::notify_send(&self.name, "mock failure"));
            }
            self.sent_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), TrackError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), TrackError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn handle_delivers_notifications() {
        let sent_count = Arc::new(AtomicU64::new(0));
        let notifier = MockNotifier {
            name: "test".to_string(),
            sent_count: Arc::clone(&sent_count),
            should_fail: false,
            delay_ms: 0,
        };

        let handle = NotifierHandle::spawn(notifier, 10);

        for i in 0..5 {
            let n = Notification::Pickup {
                uid: format!("u{i}"),
            };
            assert!(handle.try_send(n));
        }

        handle.shutdown().await;
        assert_eq!(sent_count.load(Ordering::Relaxed), 5);
    }

    #[tokio::test]
    async fn handle_drops_when_queue_full() {
        let sent_count = Arc::new(AtomicU64::new(0));
        let notifier = MockNotifier {
            name: "slow".to_string(),
            sent_count: Arc::clone(&sent_count),
            should_fail: false,
            delay_ms: 100, // Slow notifier
        };

        // Small queue capacity
        let handle = NotifierHandle::spawn(notifier, 2);

        for i in 0..10 {
            handle.try_send(Notification::Pickup {
                uid: format!("u{i}"),
            });
        }

        // Some should have been dropped
        assert!(handle.metrics().dropped_count() > 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn handle_isolates_failures() {
        let notifier = MockNotifier {
            name: "failing".to_string(),
            sent_count: Arc::new(AtomicU64::new(0)),
            should_fail: true,
            delay_ms: 0,
        };

        let handle = NotifierHandle::spawn(notifier, 10);

        for i in 0..3 {
            handle.try_send(Notification::Missing {
                uid: format!("u{i}"),
            });
        }

        // Give worker time to process
        sleep(Duration::from_millis(50)).await;

        assert!(handle.metrics().failure_count() > 0);

        handle.shutdown().await;
    }
}
