//! Sync agent: periodically fetch remote quotes and merge them locally.
//!
//! Each run walks `Idle → Syncing → Synced | Failed → Idle`. A failed run
//! leaves the store untouched and is only retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::{AppError, Quote, SyncConfig, SyncPhase};
use crate::infrastructure::QuoteSource;

use super::reconcile::map_remote;
use super::session::SharedSession;

/// Outcome of one sync run.
#[derive(Debug)]
pub struct SyncReport {
    /// `Synced` or `Failed`.
    pub phase: SyncPhase,
    /// Transient status line for the display surface.
    pub status: String,
    /// The failure, when `phase` is `Failed`.
    pub error: Option<AppError>,
}

impl SyncReport {
    /// Quotes merged in this run.
    #[must_use]
    pub fn added(&self) -> usize {
        match self.phase {
            SyncPhase::Synced { added } => added,
            _ => 0,
        }
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.phase, SyncPhase::Failed { .. })
    }
}

/// Fetches from a [`QuoteSource`] and reconciles into the shared session.
pub struct SyncAgent<S: QuoteSource> {
    source: Arc<S>,
    config: SyncConfig,
    session: SharedSession,
    phase: SyncPhase,
}

impl<S: QuoteSource + 'static> SyncAgent<S> {
    #[must_use]
    pub fn new(source: Arc<S>, config: SyncConfig, session: SharedSession) -> Self {
        Self {
            source,
            config,
            session,
            phase: SyncPhase::Idle,
        }
    }

    #[cfg(test)]
    pub const fn phase(&self) -> &SyncPhase {
        &self.phase
    }

    /// Run one fetch-and-merge cycle.
    ///
    /// The session lock is only held while merging, never across the fetch.
    pub async fn sync_once(&mut self) -> SyncReport {
        self.phase.transition(SyncPhase::Syncing);
        tracing::info!(endpoint = %self.config.endpoint, "syncing...");

        let fetched = self.source.fetch_posts(self.config.page_size).await;

        let (report_phase, error) = match fetched {
            Ok(posts) => {
                let remote = map_remote(&posts);
                let added = self
                    .session
                    .lock()
                    .await
                    .apply_remote(remote, self.config.policy);

                tracing::info!(
                    fetched = posts.len(),
                    added,
                    policy = %self.config.policy,
                    "Sync completed"
                );
                (SyncPhase::Synced { added }, None)
            }
            Err(e) => {
                if e.is_transient() {
                    tracing::warn!(error = %e, "Server fetch failed, retrying next tick");
                } else {
                    tracing::error!(error = %e, "Server fetch failed");
                }
                (
                    SyncPhase::Failed {
                        reason: e.to_string(),
                    },
                    Some(e),
                )
            }
        };

        self.phase.transition(report_phase.clone());
        let status = self.phase.status_message().unwrap_or_default();
        self.phase.transition(SyncPhase::Idle);

        SyncReport {
            phase: report_phase,
            status,
            error,
        }
    }

    /// Run immediately, then once per `interval`, until stopped.
    ///
    /// Runs never overlap: the next tick waits for the current run.
    #[must_use]
    pub fn spawn_periodic(mut self, interval: Duration) -> SyncHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let (report_tx, reports) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop_rx.changed() => break,
                }

                // A run in flight finishes even if stop was requested meanwhile.
                let report = self.sync_once().await;
                if report_tx.send(report).is_err() {
                    tracing::debug!("Sync report receiver dropped");
                }

                if *stop_rx.borrow() {
                    break;
                }
            }

            tracing::debug!("Periodic sync stopped");
        });

        tracing::info!(interval_secs = interval.as_secs(), "Periodic sync started");

        SyncHandle {
            stop: stop_tx,
            task,
            reports,
        }
    }
}

/// Handle to a periodic sync task.
pub struct SyncHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
    reports: mpsc::UnboundedReceiver<SyncReport>,
}

impl SyncHandle {
    /// Wait for the next finished run. `None` once the task has stopped.
    pub async fn next_report(&mut self) -> Option<SyncReport> {
        self.reports.recv().await
    }

    /// Stop the timer and wait for the task to finish its current run.
    pub async fn stop(self) {
        // Err only means the task already exited.
        let _ = self.stop.send(true);

        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Sync task ended abnormally");
        }
    }
}

/// Publish a locally added quote in the background.
///
/// The response is only logged; await the handle to make sure the request
/// finished before shutting down.
pub fn spawn_post<S: QuoteSource + 'static>(source: Arc<S>, quote: Quote) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = source.post_quote(&quote).await {
            tracing::warn!(error = %e, "Failed to post quote to server");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::persistence::Persistence;
    use crate::application::presenter::Presenter;
    use crate::application::quote_store::QuoteStore;
    use crate::application::session::QuoteSession;
    use crate::domain::{ReconcilePolicy, Result, SERVER_CATEGORY};
    use crate::infrastructure::{KvStore, RemotePost};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    /// Serves queued responses in order, then empty batches.
    #[derive(Default)]
    struct FakeSource {
        responses: StdMutex<VecDeque<Result<Vec<RemotePost>>>>,
        posted: StdMutex<Vec<Quote>>,
    }

    impl FakeSource {
        fn with(responses: Vec<Result<Vec<RemotePost>>>) -> Arc<Self> {
            Arc::new(Self {
                responses: StdMutex::new(responses.into()),
                posted: StdMutex::default(),
            })
        }
    }

    #[async_trait]
    impl QuoteSource for FakeSource {
        async fn fetch_posts(&self, _limit: usize) -> Result<Vec<RemotePost>> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn post_quote(&self, quote: &Quote) -> Result<()> {
            self.posted.lock().unwrap().push(quote.clone());
            Ok(())
        }
    }

    /// Parks every fetch until the test releases it.
    #[derive(Default)]
    struct GatedSource {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl QuoteSource for GatedSource {
        async fn fetch_posts(&self, _limit: usize) -> Result<Vec<RemotePost>> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(vec![titled("late arrival")])
        }

        async fn post_quote(&self, _quote: &Quote) -> Result<()> {
            Ok(())
        }
    }

    fn titled(title: &str) -> RemotePost {
        RemotePost {
            id: None,
            title: Some(title.to_string()),
            body: None,
        }
    }

    fn session() -> SharedSession {
        QuoteSession::with_presenter(
            Persistence::new(KvStore::in_memory().unwrap(), KvStore::in_memory().unwrap()),
            Presenter::from_entropy(),
        )
        .shared()
    }

    #[tokio::test]
    async fn test_sync_appends_only_novel_text() {
        let shared = session();
        let seeded_text = QuoteStore::seeded().get(0).unwrap().text.clone();
        let source = FakeSource::with(vec![Ok(vec![titled(&seeded_text), titled("B")])]);
        let mut agent = SyncAgent::new(source, SyncConfig::default(), shared.clone());

        let report = agent.sync_once().await;

        assert_eq!(report.added(), 1);
        assert_eq!(report.status, "synced (1 new)");
        assert_eq!(agent.phase(), &SyncPhase::Idle);

        let guard = shared.lock().await;
        let quotes = guard.store().quotes();
        assert_eq!(quotes.iter().filter(|q| q.text == seeded_text).count(), 1);
        assert_eq!(quotes.iter().filter(|q| q.text == "B").count(), 1);
        assert_eq!(quotes.last().unwrap().category, SERVER_CATEGORY);
        assert_eq!(guard.sync_metadata().unwrap().added_from_server, 1);
    }

    #[tokio::test]
    async fn test_failed_sync_leaves_store() {
        let shared = session();
        let source = FakeSource::with(vec![Err(AppError::decode("not an array"))]);
        let mut agent = SyncAgent::new(source, SyncConfig::default(), shared.clone());

        let report = agent.sync_once().await;

        assert!(report.is_failure());
        assert_eq!(report.status, "sync failed");
        assert!(matches!(report.error, Some(AppError::Decode { .. })));
        assert_eq!(agent.phase(), &SyncPhase::Idle);

        let guard = shared.lock().await;
        assert_eq!(guard.store(), &QuoteStore::seeded());
        assert!(guard.sync_metadata().is_none());
    }

    #[tokio::test]
    async fn test_replace_policy_from_config() {
        let shared = session();
        let source = FakeSource::with(vec![
            Ok(vec![titled("old 1"), titled("old 2")]),
            Ok(vec![titled("new")]),
        ]);
        let config = SyncConfig {
            policy: ReconcilePolicy::ReplaceServer,
            ..SyncConfig::default()
        };
        let mut agent = SyncAgent::new(source, config, shared.clone());

        agent.sync_once().await;
        let report = agent.sync_once().await;

        assert_eq!(report.added(), 1);
        let guard = shared.lock().await;
        assert_eq!(guard.stats().server_quotes, 1);
        assert_eq!(guard.store().len(), 4);
    }

    #[tokio::test]
    async fn test_periodic_runs_at_startup_and_stops() {
        let shared = session();
        let source = FakeSource::with(vec![Ok(vec![titled("first")])]);
        let agent = SyncAgent::new(source, SyncConfig::default(), shared.clone());

        let mut handle = agent.spawn_periodic(Duration::from_secs(3600));
        let report = handle.next_report().await.unwrap();
        assert_eq!(report.added(), 1);

        handle.stop().await;
        assert!(shared.lock().await.store().contains_text("first"));
    }

    #[tokio::test]
    async fn test_stop_lets_in_flight_fetch_finish() {
        let shared = session();
        let source = Arc::new(GatedSource::default());
        let agent = SyncAgent::new(Arc::clone(&source), SyncConfig::default(), shared.clone());

        let handle = agent.spawn_periodic(Duration::from_secs(3600));
        source.entered.notified().await;

        let stopping = tokio::spawn(handle.stop());
        tokio::task::yield_now().await;
        assert!(!stopping.is_finished());
        assert!(!shared.lock().await.store().contains_text("late arrival"));

        source.release.notify_one();
        tokio::time::timeout(Duration::from_secs(5), stopping)
            .await
            .unwrap()
            .unwrap();

        assert!(shared.lock().await.store().contains_text("late arrival"));
    }

    #[tokio::test]
    async fn test_spawn_post_is_awaitable() {
        let source = FakeSource::with(Vec::new());
        let quote = Quote::new("Posted", "Life");

        spawn_post(Arc::clone(&source), quote.clone()).await.unwrap();

        assert_eq!(*source.posted.lock().unwrap(), vec![quote]);
    }
}
