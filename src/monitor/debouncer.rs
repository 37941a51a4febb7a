//! Per-path trailing-edge debouncing with content-hash deduplication.
//!
//! Every path is either idle (no entry in the pending map) or pending (one
//! entry owning one timer task). A `touch` on a pending path only pushes its
//! deadline back; the timer task re-arms itself until the path has been
//! quiet for a full interval, then removes the entry and settles the file.

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    anyhow::Error,
    dashmap::{DashMap, mapref::entry::Entry},
    tokio::{
        runtime::Handle,
        task::JoinHandle,
        time::{Instant, sleep_until},
    },
    tracing::{debug, info},
};

use crate::{
    bus::{ChangeEvent, EventBus},
    config::ExtensionRule,
    error::ErrorReporter,
    monitor::{
        config::MonitorConfig,
        fingerprint::{FingerprintStore, hash_file},
    },
};

/// A path waiting for its quiet period to elapse.
#[derive(Debug)]
struct PendingChange {
    /// Time of the most recent raw event for the path.
    last_event_time: Instant,
    /// Rule the latest raw event was matched under.
    rule: ExtensionRule,
    /// The single timer task serving this path.
    timer: JoinHandle<()>,
}

struct EngineState {
    bus: Arc<EventBus>,
    /// Cleared while the engine is suspended; `touch` is ignored then.
    accepting: AtomicBool,
    interval: Duration,
    pending: DashMap<PathBuf, PendingChange>,
    fingerprints: FingerprintStore,
    runtime: Handle,
}

/// Coalesces raw events per path and publishes a [`ChangeEvent`] once a
/// file has settled on new content.
///
/// Cloning is cheap; clones share the same pending and fingerprint maps.
#[derive(Clone)]
pub struct DebounceEngine {
    state: Arc<EngineState>,
}

impl DebounceEngine {
    /// Creates a new engine.
    ///
    /// # Arguments
    ///
    /// * `bus` - Bus that receives settled `ChangeEvent`s.
    /// * `config` - Debounce interval.
    /// * `runtime` - Runtime the timer tasks are spawned on, so `touch` can
    ///   be called from watcher threads outside the runtime.
    pub fn new(bus: Arc<EventBus>, config: MonitorConfig, runtime: Handle) -> Self {
        Self {
            state: Arc::new(EngineState {
                bus,
                accepting: AtomicBool::new(true),
                interval: config.debounce_interval(),
                pending: DashMap::new(),
                fingerprints: FingerprintStore::new(),
                runtime,
            }),
        }
    }

    /// Records a raw event for `path`.
    ///
    /// An idle path gets a fresh timer; a pending path has its deadline
    /// reset to a full interval from now. The lookup and the timer creation
    /// happen under the same map entry lock.
    ///
    /// Ignored while the engine is suspended.
    pub fn touch(&self, path: impl Into<PathBuf>, rule: ExtensionRule) {
        let path = path.into();
        if !self.state.accepting.load(Ordering::Acquire) {
            debug!("Engine suspended, dropping raw event for {:?}", path);
            return;
        }

        let now = Instant::now();

        match self.state.pending.entry(path) {
            Entry::Occupied(mut entry) => {
                let change = entry.get_mut();
                change.last_event_time = now;
                change.rule = rule;
            }
            Entry::Vacant(entry) => {
                let timer = self.state.runtime.spawn(run_timer(
                    Arc::clone(&self.state),
                    entry.key().clone(),
                    now + self.state.interval,
                ));
                entry.insert(PendingChange {
                    last_event_time: now,
                    rule,
                    timer,
                });
            }
        }
    }

    /// Stops accepting touches and cancels every pending timer.
    ///
    /// Raw events still in flight from a watcher that is being torn down
    /// cannot arm new timers after this returns.
    ///
    /// # Returns
    ///
    /// The number of cancelled paths.
    pub fn suspend(&self) -> usize {
        self.state.accepting.store(false, Ordering::Release);
        self.cancel_all()
    }

    /// Accepts touches again after [`DebounceEngine::suspend`].
    pub fn resume(&self) {
        self.state.accepting.store(true, Ordering::Release);
    }

    /// Cancels every pending timer without settling.
    ///
    /// # Returns
    ///
    /// The number of cancelled paths.
    pub fn cancel_all(&self) -> usize {
        let paths: Vec<PathBuf> = self
            .state
            .pending
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        let mut cancelled = 0;
        for path in paths {
            if let Some((_, change)) = self.state.pending.remove(&path) {
                change.timer.abort();
                cancelled += 1;
            }
        }

        if cancelled > 0 {
            debug!("Cancelled {} pending debounce timers", cancelled);
        }
        cancelled
    }

    /// Number of paths currently waiting to settle.
    pub fn pending_count(&self) -> usize {
        self.state.pending.len()
    }

    /// Whether `path` has a live timer.
    pub fn is_pending(&self, path: &Path) -> bool {
        self.state.pending.contains_key(path)
    }

    /// Last recorded content digest for `path`.
    pub fn fingerprint(&self, path: &Path) -> Option<Vec<u8>> {
        self.state.fingerprints.get(path)
    }
}

/// Timer task for one pending path.
///
/// Sleeps until the current deadline, then removes the entry only if no
/// touch arrived in the meantime; otherwise it sleeps again until the new
/// deadline.
async fn run_timer(state: Arc<EngineState>, path: PathBuf, first_deadline: Instant) {
    let mut deadline = first_deadline;

    loop {
        sleep_until(deadline).await;

        let now = Instant::now();
        let interval = state.interval;
        let fired = state
            .pending
            .remove_if(&path, |_, change| change.last_event_time + interval <= now);

        if let Some((_, change)) = fired {
            // Hashing and the parsers behind the publish do blocking file IO.
            let settling = Arc::clone(&state);
            let settled = state
                .runtime
                .spawn_blocking(move || settling.settle(&path, &change.rule))
                .await;
            if let Err(e) = settled {
                ErrorReporter::error(&Error::new(e), "settling a debounced change");
            }
            return;
        }

        // Superseded by a later touch, or cancelled.
        match state.pending.get(&path) {
            Some(change) => deadline = change.last_event_time + interval,
            None => return,
        }
    }
}

impl EngineState {
    /// Decides whether a settled path represents a real content change.
    fn settle(&self, path: &Path, rule: &ExtensionRule) {
        debug!("Debounce timer fired for: {:?}", path);

        if !path.is_file() {
            debug!("Settled path no longer exists, ignoring: {:?}", path);
            return;
        }

        let digest = match hash_file(path) {
            Ok(digest) => digest,
            Err(e) => {
                ErrorReporter::debug(&Error::new(e), &format!("hashing {}", path.display()));
                return;
            }
        };

        if !self.fingerprints.record_if_changed(path, digest) {
            debug!("Hashes are equal, ignoring change: {:?}", path);
            return;
        }

        info!("File content changed: {:?}", path);
        self.bus.publish(ChangeEvent {
            path: path.to_path_buf(),
            extension: rule.extension.clone(),
            custom_action: rule.custom_action.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::{fs::write, path::Path, sync::Arc, thread::scope, time::Duration};

    use {
        parking_lot::Mutex,
        sha2::{Digest, Sha256},
        tempfile::TempDir,
        tokio::{runtime::Handle, time::sleep},
    };

    use crate::{
        bus::{ChangeEvent, EventBus},
        config::ExtensionRule,
        monitor::{config::MonitorConfig, debouncer::DebounceEngine},
    };

    fn engine_with_recorder() -> (DebounceEngine, Arc<Mutex<Vec<ChangeEvent>>>) {
        engine_with_interval(MonitorConfig::default())
    }

    fn engine_with_interval(
        config: MonitorConfig,
    ) -> (DebounceEngine, Arc<Mutex<Vec<ChangeEvent>>>) {
        let bus = Arc::new(EventBus::new());
        let received = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&received);
        bus.subscribe(move |event: &ChangeEvent| {
            sink.lock().push(event.clone());
            Ok(())
        });

        let engine = DebounceEngine::new(bus, config, Handle::current());
        (engine, received)
    }

    fn text_rule() -> ExtensionRule {
        ExtensionRule::new(".txt", None)
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_touches_collapse_into_one_settle() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        write(&path, "v1").unwrap();
        let (engine, received) = engine_with_recorder();

        for _ in 0..5 {
            engine.touch(&path, text_rule());
            sleep(Duration::from_millis(200)).await;
        }
        assert_eq!(engine.pending_count(), 1);
        assert!(received.lock().is_empty());

        // 900ms after the last touch: still quiet.
        sleep(Duration::from_millis(700)).await;
        assert!(received.lock().is_empty());

        sleep(Duration::from_millis(200)).await;
        let events = received.lock().clone();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].path, path);
        assert_eq!(events[0].extension, ".txt");
        assert_eq!(engine.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_content_is_not_republished() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        write(&path, "v1").unwrap();
        let (engine, received) = engine_with_recorder();

        engine.touch(&path, text_rule());
        sleep(Duration::from_millis(1100)).await;
        assert_eq!(received.lock().len(), 1);

        // Same bytes rewritten.
        write(&path, "v1").unwrap();
        engine.touch(&path, text_rule());
        sleep(Duration::from_millis(1100)).await;
        assert_eq!(received.lock().len(), 1);

        write(&path, "v2").unwrap();
        engine.touch(&path, text_rule());
        sleep(Duration::from_millis(1100)).await;
        assert_eq!(received.lock().len(), 2);
        assert_eq!(
            engine.fingerprint(&path),
            Some(Sha256::digest(b"v2").to_vec())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_vanished_file_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gone.txt");
        let (engine, received) = engine_with_recorder();

        engine.touch(&path, text_rule());
        sleep(Duration::from_millis(1100)).await;

        assert!(received.lock().is_empty());
        assert_eq!(engine.pending_count(), 0);
        assert!(engine.fingerprint(&path).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_paths_debounce_independently() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("a.txt");
        let second = temp_dir.path().join("b.txt");
        write(&first, "a").unwrap();
        write(&second, "b").unwrap();
        let (engine, received) = engine_with_recorder();

        engine.touch(&first, text_rule());
        sleep(Duration::from_millis(600)).await;
        engine.touch(&second, text_rule());
        assert_eq!(engine.pending_count(), 2);

        sleep(Duration::from_millis(500)).await;
        assert_eq!(received.lock().len(), 1);
        assert_eq!(received.lock()[0].path, first);
        assert!(engine.is_pending(&second));

        sleep(Duration::from_millis(600)).await;
        assert_eq!(received.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_after_settle_starts_new_cycle() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        write(&path, "v1").unwrap();
        let (engine, received) = engine_with_recorder();

        engine.touch(&path, text_rule());
        sleep(Duration::from_millis(1100)).await;
        assert!(!engine.is_pending(&path));

        write(&path, "v2").unwrap();
        engine.touch(&path, ExtensionRule::new(".txt", Some("digest".to_string())));
        assert!(engine.is_pending(&path));

        sleep(Duration::from_millis(1100)).await;
        let events = received.lock().clone();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].custom_action.as_deref(), Some("digest"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_discards_pending_changes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        write(&path, "v1").unwrap();
        let (engine, received) = engine_with_recorder();

        engine.touch(&path, text_rule());
        engine.touch(Path::new("/nonexistent/other.txt"), text_rule());
        assert_eq!(engine.cancel_all(), 2);
        assert_eq!(engine.cancel_all(), 0);

        sleep(Duration::from_millis(2000)).await;
        assert!(received.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspended_engine_ignores_touches() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        write(&path, "v1").unwrap();
        let (engine, received) = engine_with_recorder();

        engine.touch(&path, text_rule());
        assert_eq!(engine.suspend(), 1);
        engine.touch(&path, text_rule());
        assert_eq!(engine.pending_count(), 0);

        sleep(Duration::from_millis(1100)).await;
        assert!(received.lock().is_empty());

        engine.resume();
        engine.touch(&path, text_rule());
        sleep(Duration::from_millis(1100)).await;
        assert_eq!(received.lock().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_touches_share_one_timer() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shared.txt");
        write(&path, "contended").unwrap();
        let (engine, received) = engine_with_interval(MonitorConfig {
            debounce_interval_ms: 100,
        });

        scope(|threads| {
            for _ in 0..16 {
                let engine = engine.clone();
                let path = path.clone();
                threads.spawn(move || {
                    for _ in 0..500 {
                        engine.touch(&path, text_rule());
                    }
                });
            }
        });

        sleep(Duration::from_millis(600)).await;

        let events = received.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].path, path);
        assert_eq!(engine.pending_count(), 0);
    }
}
