//! Snapshot engine - periodic socket polling and atomic publication.
//!
//! The engine owns the three OS collaborators, rebuilds a [`Snapshot`]
//! on every refresh and publishes it by swapping an `Arc` under a
//! `parking_lot::RwLock`. Readers only ever clone that `Arc`, so they
//! never see a half-built view and never wait on the OS.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::{SignalTerminator, SystemConnections, SystemResolver};
use crate::domain::{
    format_endpoint, ConnectionStatus, Process, Protocol, ReadOptions, Snapshot,
};
use crate::error::{Error, Result};
use crate::ports::{
    ConnectionRecord, ConnectionSource, ProcessResolver, ProcessTerminator, Scope, AF_INET,
    AF_INET6, SOCK_DGRAM, SOCK_STREAM,
};

/// Default upper bound for a whole kill sequence.
pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(3);

/// Grace period between SIGTERM and SIGKILL.
const GRACEFUL_KILL_TIMEOUT: Duration = Duration::from_millis(500);

/// Time given to the OS to reap a force-killed process.
const REAP_DELAY: Duration = Duration::from_millis(200);

/// Placeholder shown for sockets without a peer.
const NO_REMOTE: &str = "*:*";

/// Point-in-time engine diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Generation of the published snapshot.
    pub generation: u64,
    /// Records in the published snapshot.
    pub records: usize,
    /// When the last refresh succeeded.
    pub last_success: Option<Instant>,
    /// Failed refreshes since the last success.
    pub consecutive_failures: u64,
}

/// The engine wired to the host's socket tools, `/proc`/`ps` and signals.
pub type SystemEngine = SnapshotEngine<SystemConnections, SystemResolver, SignalTerminator>;

/// Keeps a consistent, periodically refreshed view of all sockets.
pub struct SnapshotEngine<C, R, K> {
    source: C,
    resolver: R,
    terminator: K,

    current: RwLock<Arc<Snapshot>>,
    generation: AtomicU64,
    consecutive_failures: AtomicU64,
    last_error: RwLock<Option<String>>,
    last_success: RwLock<Option<Instant>>,
    kill_timeout: Duration,

    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SystemEngine {
    /// Create an engine for the current platform.
    pub fn system() -> Self {
        Self::new(
            SystemConnections::new(),
            SystemResolver::new(),
            SignalTerminator::new(),
        )
    }
}

impl<C, R, K> SnapshotEngine<C, R, K>
where
    C: ConnectionSource,
    R: ProcessResolver,
    K: ProcessTerminator,
{
    /// Create an engine with an empty snapshot. Nothing is polled until
    /// [`start`](Self::start) or [`refresh`](Self::refresh) is called.
    pub fn new(source: C, resolver: R, terminator: K) -> Self {
        Self {
            source,
            resolver,
            terminator,
            current: RwLock::new(Arc::new(Snapshot::empty())),
            generation: AtomicU64::new(0),
            consecutive_failures: AtomicU64::new(0),
            last_error: RwLock::new(None),
            last_success: RwLock::new(None),
            kill_timeout: DEFAULT_KILL_TIMEOUT,
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Override the bound applied to [`kill`](Self::kill).
    pub fn with_kill_timeout(mut self, timeout: Duration) -> Self {
        self.kill_timeout = timeout;
        self
    }

    /// Perform one refresh, then keep refreshing every `poll_interval` on a
    /// background task until [`stop`](Self::stop) is called.
    ///
    /// A failed first refresh is recorded and the loop starts anyway.
    pub async fn start(self: &Arc<Self>, poll_interval: Duration)
    where
        C: 'static,
        R: 'static,
        K: 'static,
    {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Initial refresh failed");
        }

        let engine = Arc::clone(self);
        let token = self.cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the initial refresh already ran.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = engine.refresh().await {
                            debug!(error = %e, "Background refresh failed");
                        }
                    }
                }
            }
            debug!("Refresh loop stopped");
        });

        if let Some(previous) = self.task.lock().replace(handle) {
            previous.abort();
        }
        info!(interval = ?poll_interval, "Snapshot engine started");
    }

    /// Stop the background refresh loop. Safe to call more than once.
    pub fn stop(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            info!("Snapshot engine stopped");
        }
    }

    /// Check if the background loop is still alive.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Run one refresh cycle over every socket.
    ///
    /// Returns the number of published records.
    pub async fn refresh(&self) -> Result<usize> {
        self.refresh_scoped(&ReadOptions::new()).await
    }

    /// Run one refresh cycle, keeping only records that pass `options`.
    ///
    /// The connection source is only asked for `options.protocol`.
    pub async fn refresh_scoped(&self, options: &ReadOptions) -> Result<usize> {
        match self.collect(options).await {
            Ok(processes) => {
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                let count = processes.len();
                let snapshot = Arc::new(Snapshot::new(processes, generation));

                let (published, displaced) = self.publish(snapshot);
                drop(displaced);
                *self.last_success.write() = Some(Instant::now());
                *self.last_error.write() = None;
                self.consecutive_failures.store(0, Ordering::SeqCst);

                if published {
                    debug!(generation, records = count, "Published snapshot");
                } else {
                    debug!(generation, "Discarded snapshot older than the published one");
                }
                Ok(count)
            }
            Err(e) => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                warn!(error = %e, failures, "Refresh failed, keeping previous snapshot");
                *self.last_error.write() = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Swap `snapshot` in unless a newer generation is already published.
    ///
    /// Returns whether the swap happened and whichever snapshot lost. The
    /// loser goes back to the caller so it is freed after the write guard
    /// is released.
    fn publish(&self, snapshot: Arc<Snapshot>) -> (bool, Arc<Snapshot>) {
        let mut current = self.current.write();
        if current.generation() > snapshot.generation() {
            return (false, snapshot);
        }
        (true, std::mem::replace(&mut *current, snapshot))
    }

    /// Copy of the current records that pass `options`.
    pub fn read(&self, options: &ReadOptions) -> Vec<Process> {
        self.snapshot().select(options)
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Terminate `pid`: SIGTERM, then SIGKILL if it survives the grace period.
    ///
    /// The whole sequence is bounded by the engine's kill timeout.
    pub async fn kill(&self, pid: u32) -> Result<()> {
        self.bounded(self.kill_gracefully(pid)).await
    }

    /// Send SIGKILL straight away, bounded by the kill timeout.
    pub async fn force_kill(&self, pid: u32) -> Result<()> {
        self.bounded(async {
            self.terminator.force_kill(pid).await?;
            sleep(REAP_DELAY).await;
            Ok(())
        })
        .await
    }

    /// Error text of the most recent failed refresh, cleared on success.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Generation, size and poll health of the published snapshot.
    pub fn stats(&self) -> EngineStats {
        let snapshot = self.snapshot();
        EngineStats {
            generation: snapshot.generation(),
            records: snapshot.len(),
            last_success: *self.last_success.read(),
            consecutive_failures: self.consecutive_failures.load(Ordering::SeqCst),
        }
    }

    async fn bounded<F>(&self, work: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<()>>,
    {
        match tokio::time::timeout(self.kill_timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.kill_timeout)),
        }
    }

    async fn kill_gracefully(&self, pid: u32) -> Result<()> {
        debug!(pid, "Sending SIGTERM");
        self.terminator.terminate(pid).await?;

        sleep(GRACEFUL_KILL_TIMEOUT).await;
        if !self.terminator.is_running(pid) {
            info!(pid, "Process terminated gracefully");
            return Ok(());
        }

        warn!(pid, "Process survived SIGTERM, sending SIGKILL");
        match self.terminator.force_kill(pid).await {
            // Exited between the check and the signal.
            Ok(()) | Err(Error::ProcessNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        sleep(REAP_DELAY).await;
        Ok(())
    }

    /// Query, resolve and classify one full set of records.
    async fn collect(&self, options: &ReadOptions) -> Result<Vec<Process>> {
        let records = self.source.list_connections(options.protocol).await?;
        if records.is_empty() {
            return Err(Error::NoConnections);
        }

        let mut names: HashMap<u32, Option<String>> = HashMap::new();
        let mut processes = Vec::with_capacity(records.len());

        for record in records {
            let name = match names.get(&record.pid) {
                Some(cached) => cached.clone(),
                None => {
                    let resolved = match self.resolver.resolve(record.pid).await {
                        Ok(meta) => Some(meta.name),
                        Err(e) => {
                            debug!(pid = record.pid, error = %e, "Skipping unresolved socket owner");
                            None
                        }
                    };
                    names.insert(record.pid, resolved.clone());
                    resolved
                }
            };
            let Some(name) = name else {
                continue;
            };

            let Some(process) = to_process(record, name) else {
                continue;
            };
            if options.matches(&process) {
                processes.push(process);
            }
        }

        if processes.is_empty() {
            return Err(Error::NoConnections);
        }
        Ok(processes)
    }
}

impl<C, R, K> Drop for SnapshotEngine<C, R, K> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Map a numeric (family, socket type) pair to a protocol.
fn classify(family: u32, socket_type: u32) -> Option<Protocol> {
    match (family, socket_type) {
        (AF_INET, SOCK_STREAM) => Some(Protocol::Tcp),
        (AF_INET6, SOCK_STREAM) => Some(Protocol::Tcp6),
        (AF_INET, SOCK_DGRAM) => Some(Protocol::Udp),
        (AF_INET6, SOCK_DGRAM) => Some(Protocol::Udp6),
        _ => None,
    }
}

fn to_process(record: ConnectionRecord, name: String) -> Option<Process> {
    let Some(protocol) = classify(record.family, record.socket_type) else {
        debug!(
            family = record.family,
            socket_type = record.socket_type,
            "Dropping socket of unknown shape"
        );
        return None;
    };

    let status = match ConnectionStatus::parse(&record.status) {
        Some(status) => status,
        None if protocol.is_udp() => ConnectionStatus::Active,
        None => ConnectionStatus::Other(String::new()),
    };

    let remote_addr = if record.remote_port == 0 || record.remote_ip.is_empty() {
        NO_REMOTE.to_string()
    } else {
        format_endpoint(&record.remote_ip, record.remote_port)
    };

    Some(Process {
        pid: record.pid,
        name,
        port: record.local_port,
        protocol,
        status,
        local_addr: format_endpoint(&record.local_ip, record.local_port),
        remote_addr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ProcessMeta;
    use std::collections::{HashSet, VecDeque};
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    // Mock connection source that replays scripted responses, repeating
    // the last one once the script runs out.
    struct MockSource {
        script: Mutex<VecDeque<Result<Vec<ConnectionRecord>>>>,
        fallback: Vec<ConnectionRecord>,
        calls: AtomicUsize,
        scopes: Mutex<Vec<Scope>>,
    }

    impl MockSource {
        fn new(fallback: Vec<ConnectionRecord>) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback,
                calls: AtomicUsize::new(0),
                scopes: Mutex::new(Vec::new()),
            }
        }

        fn then(self, response: Result<Vec<ConnectionRecord>>) -> Self {
            self.script.lock().push_back(response);
            self
        }
    }

    impl ConnectionSource for MockSource {
        async fn list_connections(&self, scope: Scope) -> Result<Vec<ConnectionRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.scopes.lock().push(scope);
            match self.script.lock().pop_front() {
                Some(response) => response,
                None => Ok(self.fallback.clone()),
            }
        }
    }

    struct MockResolver {
        names: HashMap<u32, String>,
        lookups: AtomicUsize,
    }

    impl MockResolver {
        fn new(names: &[(u32, &str)]) -> Self {
            Self {
                names: names.iter().map(|(p, n)| (*p, n.to_string())).collect(),
                lookups: AtomicUsize::new(0),
            }
        }
    }

    impl ProcessResolver for MockResolver {
        async fn resolve(&self, pid: u32) -> Result<ProcessMeta> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.names
                .get(&pid)
                .map(|name| ProcessMeta { name: name.clone() })
                .ok_or(Error::ProcessNotFound(pid))
        }
    }

    #[derive(Default)]
    struct MockTerminator {
        ignores_sigterm: bool,
        missing: bool,
        alive: AtomicBool,
        terms: AtomicUsize,
        kills: AtomicUsize,
    }

    impl ProcessTerminator for MockTerminator {
        async fn terminate(&self, pid: u32) -> Result<()> {
            if self.missing {
                return Err(Error::ProcessNotFound(pid));
            }
            self.terms.fetch_add(1, Ordering::SeqCst);
            self.alive.store(self.ignores_sigterm, Ordering::SeqCst);
            Ok(())
        }

        async fn force_kill(&self, _pid: u32) -> Result<()> {
            self.kills.fetch_add(1, Ordering::SeqCst);
            self.alive.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_running(&self, _pid: u32) -> bool {
            self.alive.load(Ordering::SeqCst)
        }
    }

    fn record(pid: u32, family: u32, socket_type: u32, port: u16, status: &str) -> ConnectionRecord {
        ConnectionRecord {
            pid,
            family,
            socket_type,
            local_ip: "127.0.0.1".to_string(),
            local_port: port,
            remote_ip: String::new(),
            remote_port: 0,
            status: status.to_string(),
        }
    }

    fn sample_records() -> Vec<ConnectionRecord> {
        vec![
            record(100, AF_INET, SOCK_STREAM, 8080, "LISTEN"),
            record(200, AF_INET6, SOCK_DGRAM, 5353, ""),
            record(100, AF_INET, SOCK_STREAM, 8443, "LISTEN"),
        ]
    }

    fn engine_with(
        source: MockSource,
        terminator: MockTerminator,
    ) -> SnapshotEngine<MockSource, MockResolver, MockTerminator> {
        SnapshotEngine::new(
            source,
            MockResolver::new(&[(100, "nginx"), (200, "avahi"), (300, "sshd")]),
            terminator,
        )
    }

    #[tokio::test]
    async fn test_refresh_builds_snapshot() {
        let engine = engine_with(MockSource::new(sample_records()), MockTerminator::default());

        let count = engine.refresh().await.unwrap();
        assert_eq!(count, 3);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.generation(), 1);
        assert!(snapshot.is_consistent());
        assert_eq!(snapshot.get(100).unwrap().port, 8080);

        let udp = &snapshot.processes()[1];
        assert_eq!(udp.protocol, Protocol::Udp6);
        assert_eq!(udp.status, ConnectionStatus::Active);
        assert_eq!(udp.remote_addr, "*:*");
    }

    #[tokio::test]
    async fn test_resolution_is_cached_per_cycle() {
        let engine = engine_with(MockSource::new(sample_records()), MockTerminator::default());
        engine.refresh().await.unwrap();
        // pid 100 appears twice but is resolved once.
        assert_eq!(engine.resolver.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unresolved_and_unknown_records_are_skipped() {
        let records = vec![
            record(100, AF_INET, SOCK_STREAM, 80, "LISTEN"),
            record(999, AF_INET, SOCK_STREAM, 81, "LISTEN"),
            record(100, 1, SOCK_STREAM, 82, "LISTEN"),
            record(100, AF_INET, 5, 83, ""),
        ];
        let engine = engine_with(MockSource::new(records), MockTerminator::default());

        assert_eq!(engine.refresh().await.unwrap(), 1);
        let ports: Vec<u16> = engine.snapshot().processes().iter().map(|p| p.port).collect();
        assert_eq!(ports, vec![80]);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let source = MockSource::new(sample_records())
            .then(Ok(sample_records()))
            .then(Err(Error::CommandFailed("ss missing".to_string())))
            .then(Ok(Vec::new()))
            .then(Ok(vec![record(999, AF_INET, SOCK_STREAM, 1, "LISTEN")]));
        let engine = engine_with(source, MockTerminator::default());

        engine.refresh().await.unwrap();
        let first = engine.snapshot();

        assert!(engine.refresh().await.is_err());
        assert!(engine.last_error().unwrap().contains("ss missing"));
        assert!(matches!(engine.refresh().await, Err(Error::NoConnections)));
        // Every record unresolved: nothing left after resolution.
        assert!(matches!(engine.refresh().await, Err(Error::NoConnections)));

        let current = engine.snapshot();
        assert!(Arc::ptr_eq(&first, &current));
        assert_eq!(current.len(), 3);

        let stats = engine.stats();
        assert_eq!(stats.consecutive_failures, 3);
        assert_eq!(stats.generation, 1);

        engine.refresh().await.unwrap();
        assert_eq!(engine.stats().consecutive_failures, 0);
        assert!(engine.last_error().is_none());
        assert_eq!(engine.snapshot().generation(), 2);
    }

    #[tokio::test]
    async fn test_read_applies_options() {
        let engine = engine_with(MockSource::new(sample_records()), MockTerminator::default());
        engine.refresh().await.unwrap();

        assert_eq!(engine.read(&ReadOptions::new()).len(), 3);
        assert_eq!(
            engine.read(&ReadOptions::new().with_port(Some(8443))).len(),
            1
        );
        assert_eq!(engine.read(&ReadOptions::new().with_listen_only(true)).len(), 2);
        assert_eq!(
            engine
                .read(&ReadOptions::new().with_name(Some("AVA".to_string())))
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_refresh_scoped_publishes_subset() {
        let engine = engine_with(MockSource::new(sample_records()), MockTerminator::default());
        let options = ReadOptions::new().with_protocol(Scope::Udp);
        assert_eq!(engine.refresh_scoped(&options).await.unwrap(), 1);
        assert_eq!(engine.snapshot().processes()[0].name, "avahi");
    }

    #[tokio::test]
    async fn test_source_is_asked_for_requested_scope() {
        let engine = engine_with(MockSource::new(sample_records()), MockTerminator::default());

        engine.refresh().await.unwrap();
        // No TCP6 sockets in the sample, but the source was still asked.
        assert!(matches!(
            engine
                .refresh_scoped(&ReadOptions::new().with_protocol(Scope::Tcp6))
                .await,
            Err(Error::NoConnections)
        ));
        engine
            .refresh_scoped(&ReadOptions::new().with_protocol(Scope::Udp).with_port(Some(5353)))
            .await
            .unwrap();

        assert_eq!(
            *engine.source.scopes.lock(),
            vec![Scope::All, Scope::Tcp6, Scope::Udp]
        );
    }

    #[tokio::test]
    async fn test_displaced_snapshot_outlives_write_guard() {
        let engine = engine_with(MockSource::new(sample_records()), MockTerminator::default());
        engine.refresh().await.unwrap();

        let (published, displaced) = engine.publish(Arc::new(Snapshot::new(Vec::new(), 2)));
        assert!(published);
        assert_eq!(displaced.generation(), 1);
        assert_eq!(displaced.len(), 3);
        // Sole owner is the caller, and the lock is already free.
        assert_eq!(Arc::strong_count(&displaced), 1);
        assert!(engine.current.try_write().is_some());
        drop(displaced);

        assert_eq!(engine.snapshot().generation(), 2);
    }

    #[tokio::test]
    async fn test_older_snapshot_never_replaces_newer() {
        let engine = engine_with(MockSource::new(sample_records()), MockTerminator::default());
        engine.refresh().await.unwrap();
        engine.refresh().await.unwrap();

        let late = Arc::new(Snapshot::new(Vec::new(), 1));
        let (published, returned) = engine.publish(Arc::clone(&late));
        assert!(!published);
        assert!(Arc::ptr_eq(&returned, &late));

        let current = engine.snapshot();
        assert_eq!(current.generation(), 2);
        assert_eq!(current.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_readers_see_consistent_snapshots() {
        let small = vec![record(100, AF_INET, SOCK_STREAM, 80, "LISTEN")];
        let large: Vec<ConnectionRecord> = (0..50)
            .map(|i| record(if i % 2 == 0 { 100 } else { 300 }, AF_INET, SOCK_STREAM, 1000 + i, "LISTEN"))
            .collect();

        let mut source = MockSource::new(small.clone());
        for i in 0..100 {
            source = source.then(Ok(if i % 2 == 0 { large.clone() } else { small.clone() }));
        }
        let engine = Arc::new(engine_with(source, MockTerminator::default()));
        engine.refresh().await.unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let done = Arc::clone(&done);
                std::thread::spawn(move || {
                    let mut last_generation = 0;
                    let mut observed = 0usize;
                    while !done.load(Ordering::SeqCst) {
                        let snapshot = engine.snapshot();
                        assert!(snapshot.is_consistent());
                        assert!(!snapshot.is_empty());
                        assert!(snapshot.generation() >= last_generation);
                        let pids: HashSet<u32> = snapshot.pids().collect();
                        assert!(snapshot.processes().iter().all(|p| pids.contains(&p.pid)));
                        last_generation = snapshot.generation();
                        observed += 1;
                    }
                    observed
                })
            })
            .collect();

        for _ in 0..100 {
            engine.refresh().await.unwrap();
            tokio::task::yield_now().await;
        }
        done.store(true, Ordering::SeqCst);

        for reader in readers {
            assert!(reader.join().unwrap() > 0);
        }
        assert_eq!(engine.snapshot().generation(), 101);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_refreshes_then_loops_until_stopped() {
        let engine = Arc::new(engine_with(
            MockSource::new(sample_records()),
            MockTerminator::default(),
        ));

        engine.start(Duration::from_secs(5)).await;
        assert_eq!(engine.snapshot().generation(), 1);
        assert!(engine.is_running());

        tokio::time::sleep(Duration::from_millis(10_100)).await;
        assert_eq!(engine.snapshot().generation(), 3);

        engine.stop();
        engine.stop();
        assert!(!engine.is_running());

        let calls = engine.source.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(engine.source.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_survives_failed_first_refresh() {
        let source = MockSource::new(sample_records())
            .then(Err(Error::CommandFailed("boom".to_string())));
        let engine = Arc::new(engine_with(source, MockTerminator::default()));

        engine.start(Duration::from_secs(1)).await;
        assert_eq!(engine.snapshot().generation(), 0);
        assert!(engine.last_error().is_some());

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(engine.snapshot().generation(), 1);
        engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_kill_graceful() {
        let engine = engine_with(MockSource::new(sample_records()), MockTerminator::default());
        engine.kill(100).await.unwrap();
        assert_eq!(engine.terminator.terms.load(Ordering::SeqCst), 1);
        assert_eq!(engine.terminator.kills.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_kill_escalates_when_process_survives() {
        let terminator = MockTerminator {
            ignores_sigterm: true,
            ..Default::default()
        };
        let engine = engine_with(MockSource::new(sample_records()), terminator);

        engine.kill(100).await.unwrap();
        assert_eq!(engine.terminator.terms.load(Ordering::SeqCst), 1);
        assert_eq!(engine.terminator.kills.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_kill_missing_process_fails() {
        let terminator = MockTerminator {
            missing: true,
            ..Default::default()
        };
        let engine = engine_with(MockSource::new(sample_records()), terminator);

        assert!(matches!(engine.kill(42).await, Err(Error::ProcessNotFound(42))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_kill_is_bounded_by_timeout() {
        let terminator = MockTerminator {
            ignores_sigterm: true,
            ..Default::default()
        };
        let engine = engine_with(MockSource::new(sample_records()), terminator)
            .with_kill_timeout(Duration::from_millis(100));

        assert!(matches!(engine.kill(100).await, Err(Error::Timeout(_))));
        assert_eq!(engine.terminator.kills.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(AF_INET, SOCK_STREAM), Some(Protocol::Tcp));
        assert_eq!(classify(AF_INET6, SOCK_DGRAM), Some(Protocol::Udp6));
        assert_eq!(classify(AF_INET, 3), None);
        assert_eq!(classify(1, SOCK_STREAM), None);
    }

    #[test]
    fn test_to_process_formats_addresses() {
        let mut rec = record(7, AF_INET6, SOCK_STREAM, 443, "ESTAB");
        rec.local_ip = "::1".to_string();
        rec.remote_ip = "2001:db8::2".to_string();
        rec.remote_port = 51000;

        let process = to_process(rec, "curl".to_string()).unwrap();
        assert_eq!(process.local_addr, "[::1]:443");
        assert_eq!(process.remote_addr, "[2001:db8::2]:51000");
        assert_eq!(process.status, ConnectionStatus::Established);
    }
}
