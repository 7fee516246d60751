use crate::backend::BlobBackend;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Background-polls a blob backend for its health; reveals the most
/// recently determined health via a non-blocking in-memory read.
///
/// The signal is tri-valued: unknown until the first poll completes, then
/// healthy or unhealthy after every subsequent poll. [`healthy`] suspends
/// callers only while the state is still unknown; once any determination
/// exists it always returns immediately. The poll task runs independently
/// of all callers and never gates storage operations.
///
/// [`healthy`]: HealthMonitor::healthy
pub struct HealthMonitor {
    rx: watch::Receiver<Option<bool>>,
    handle: JoinHandle<()>,
}

impl HealthMonitor {
    /// Start polling immediately. The first probe fires with zero delay,
    /// then repeats on a fixed delay of `poll_interval`.
    ///
    /// Must be called from within a tokio runtime; the poll task it spawns
    /// lives until [`shutdown`](Self::shutdown) or drop.
    pub fn start(
        backend: Arc<dyn BlobBackend>,
        container: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        let (tx, rx) = watch::channel(None);
        let handle = tokio::spawn(poll_loop(backend, container.into(), poll_interval, tx));
        Self { rx, handle }
    }

    /// Most recently determined health.
    ///
    /// Suspends until the first poll has completed, then returns without
    /// suspension on every subsequent call. The result may be briefly stale
    /// relative to an in-flight poll.
    pub async fn healthy(&self) -> bool {
        let mut rx = self.rx.clone();
        match rx.wait_for(|state| state.is_some()).await {
            Ok(state) => (*state).unwrap_or(false),
            // Shut down before the first determination; report unhealthy
            // rather than suspending forever.
            Err(_) => false,
        }
    }

    /// Stop future polling. An in-flight probe is abandoned; no further
    /// state transitions or log emissions occur afterwards.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn poll_loop(
    backend: Arc<dyn BlobBackend>,
    container: String,
    poll_interval: Duration,
    tx: watch::Sender<Option<bool>>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut gate = FailureGate::new();

    loop {
        ticker.tick().await;

        // The probe is a blocking network call; it runs before the publish
        // step so a slow backend never delays readers of the shared state.
        let probe = AssertUnwindSafe(backend.container_exists())
            .catch_unwind()
            .await;
        let outcome = match probe {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!(
                    container = %container,
                    "health probe panicked; keeping previous state"
                );
                continue;
            }
        };

        let (healthy, error) = match outcome {
            Ok(up) => (up, None),
            Err(error) => (false, Some(error)),
        };

        if gate.observe(healthy) {
            match &error {
                Some(error) => tracing::warn!(
                    container = %container,
                    error = %error,
                    "blob container does not exist, or is inaccessible"
                ),
                None => tracing::warn!(
                    container = %container,
                    "blob container does not exist, or is inaccessible"
                ),
            }
        }

        // Publish inside the channel's critical section; wakes every task
        // suspended in healthy().
        tx.send_replace(Some(healthy));
    }
}

/// Don't pollute logs by repeatedly describing the same failure: at most
/// one report per maximal consecutive run of failed polls.
#[derive(Debug, Default)]
struct FailureGate {
    reported: bool,
}

impl FailureGate {
    fn new() -> Self {
        Self::default()
    }

    /// Record a poll outcome; returns whether it should be reported.
    fn observe(&mut self, healthy: bool) -> bool {
        if healthy {
            self.reported = false;
            return false;
        }
        if self.reported {
            return false;
        }
        self.reported = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BlobRef;
    use crate::error::{FerrioError, Result};
    use crate::reference::ObjectName;
    use crate::sas::ReadGrant;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::AsyncWrite;
    use tokio::sync::Semaphore;
    use tokio::time::{Duration, advance, timeout};

    const POLL_INTERVAL: Duration = Duration::from_secs(60);

    #[derive(Debug, Clone, Copy)]
    enum Probe {
        Up,
        Down,
        Fail,
        Hang,
    }

    /// Backend whose health probes follow a script; hangs forever once the
    /// script is exhausted so no further transitions can occur.
    struct ScriptedBackend {
        probes: Mutex<VecDeque<Probe>>,
        polls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(probes: impl IntoIterator<Item = Probe>) -> Arc<Self> {
            Arc::new(Self {
                probes: Mutex::new(probes.into_iter().collect()),
                polls: AtomicUsize::new(0),
            })
        }

        fn polls(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BlobBackend for ScriptedBackend {
        fn resolve(&self, _name: &ObjectName) -> Result<BlobRef> {
            unreachable!("health polling never resolves references")
        }

        async fn container_exists(&self) -> Result<bool> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let next = self.probes.lock().unwrap().pop_front().unwrap_or(Probe::Hang);
            match next {
                Probe::Up => Ok(true),
                Probe::Down => Ok(false),
                Probe::Fail => Err(FerrioError::backend(
                    "container probe failed",
                    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
                )),
                Probe::Hang => std::future::pending().await,
            }
        }

        async fn blob_exists(&self, _blob: &BlobRef) -> Result<bool> {
            unreachable!("health polling never checks blobs")
        }

        async fn open_write(&self, _blob: &BlobRef) -> Result<Box<dyn AsyncWrite + Send + Unpin>> {
            unreachable!("health polling never writes")
        }

        async fn checksum(&self, _blob: &BlobRef) -> Result<String> {
            unreachable!("health polling never reads checksums")
        }

        async fn delete_if_exists(&self, _blob: &BlobRef) -> Result<bool> {
            unreachable!("health polling never deletes")
        }

        fn sign_read_url(&self, _blob: &BlobRef, _grant: &ReadGrant) -> Result<String> {
            unreachable!("health polling never signs URLs")
        }
    }

    /// Backend whose probes complete only when the test hands out a permit.
    struct GatedBackend {
        gate: Semaphore,
    }

    #[async_trait]
    impl BlobBackend for GatedBackend {
        fn resolve(&self, _name: &ObjectName) -> Result<BlobRef> {
            unreachable!()
        }

        async fn container_exists(&self) -> Result<bool> {
            match self.gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => std::future::pending().await,
            }
            Ok(true)
        }

        async fn blob_exists(&self, _blob: &BlobRef) -> Result<bool> {
            unreachable!()
        }

        async fn open_write(&self, _blob: &BlobRef) -> Result<Box<dyn AsyncWrite + Send + Unpin>> {
            unreachable!()
        }

        async fn checksum(&self, _blob: &BlobRef) -> Result<String> {
            unreachable!()
        }

        async fn delete_if_exists(&self, _blob: &BlobRef) -> Result<bool> {
            unreachable!()
        }

        fn sign_read_url(&self, _blob: &BlobRef, _grant: &ReadGrant) -> Result<String> {
            unreachable!()
        }
    }

    #[test]
    fn failure_gate_reports_once_per_failure_run() {
        let mut gate = FailureGate::new();

        // One maximal run of failures -> exactly one report.
        assert!(gate.observe(false));
        assert!(!gate.observe(false));
        assert!(!gate.observe(false));

        // Recovery re-arms the gate for the next run.
        assert!(!gate.observe(true));
        assert!(gate.observe(false));

        // Alternating outcomes report every failure (each is its own run).
        assert!(!gate.observe(true));
        assert!(gate.observe(false));
        assert!(!gate.observe(true));
        assert!(gate.observe(false));
    }

    #[test]
    fn failure_gate_stays_quiet_while_healthy() {
        let mut gate = FailureGate::new();
        for _ in 0..5 {
            assert!(!gate.observe(true));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn query_blocks_until_first_determination() {
        let backend = Arc::new(GatedBackend {
            gate: Semaphore::new(0),
        });
        let monitor = HealthMonitor::start(backend.clone(), "unit-test", POLL_INTERVAL);

        // No poll has completed; the query must suspend rather than return
        // a provisional value.
        assert!(
            timeout(Duration::from_millis(50), monitor.healthy())
                .await
                .is_err()
        );

        backend.gate.add_permits(1);
        assert!(monitor.healthy().await);
    }

    #[tokio::test(start_paused = true)]
    async fn query_returns_the_first_determination_when_unhealthy() {
        let backend = ScriptedBackend::new([Probe::Fail]);
        let monitor = HealthMonitor::start(backend, "unit-test", POLL_INTERVAL);

        assert!(!monitor.healthy().await);
    }

    #[tokio::test(start_paused = true)]
    async fn query_never_blocks_after_warmup() {
        // First probe succeeds; every later probe hangs mid-flight.
        let backend = ScriptedBackend::new([Probe::Up]);
        let monitor = HealthMonitor::start(backend, "unit-test", POLL_INTERVAL);

        assert!(monitor.healthy().await);

        // Drive the loop into its hung second probe.
        advance(POLL_INTERVAL * 2).await;

        for _ in 0..3 {
            let result = timeout(Duration::from_millis(1), monitor.healthy()).await;
            assert_eq!(result.ok(), Some(true));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn state_toggles_with_poll_outcomes() {
        let backend = ScriptedBackend::new([Probe::Down, Probe::Fail, Probe::Up]);
        let monitor = HealthMonitor::start(backend, "unit-test", POLL_INTERVAL);
        let mut rx = monitor.rx.clone();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(false));

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(false));

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(true));

        // The blocking accessor observes the latest determination.
        assert!(monitor.healthy().await);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_future_polling() {
        let backend = ScriptedBackend::new([Probe::Up, Probe::Up, Probe::Up]);
        let monitor = HealthMonitor::start(backend.clone(), "unit-test", POLL_INTERVAL);

        assert!(monitor.healthy().await);
        let polled = backend.polls();
        monitor.shutdown();

        advance(POLL_INTERVAL * 3).await;
        tokio::task::yield_now().await;
        assert_eq!(backend.polls(), polled);

        // Determinations made before shutdown remain readable.
        assert!(monitor.healthy().await);
    }
}
