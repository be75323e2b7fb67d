/*!
 * # Debounced auto-save
 *
 * Form drafts are written after a quiet period: staging a new write for a
 * key restarts the timer and discards the previous one, so a burst of edits
 * produces a single write carrying the last draft. Once the timer fires the
 * write is detached from the map and runs to completion even if a newer draft
 * arrives meanwhile (that draft gets its own timer).
 */

use dashmap::DashMap;
use metrics::counter;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::Session;
use crate::services::clients::{ClientService, UpdateClientRequest};

/// A future scheduled to run after a delay. Dropping it cancels the work.
#[derive(Debug)]
pub struct DeferredTask {
    handle: Option<JoinHandle<()>>,
}

impl DeferredTask {
    pub fn schedule<F>(delay: Duration, work: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            work.await;
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Lets the task run to completion regardless of this handle.
    pub fn detach(mut self) {
        self.handle.take();
    }

    pub fn cancel(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for DeferredTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

struct Pending {
    generation: u64,
    task: DeferredTask,
}

/// Per-key debouncer: at most one pending write per key.
pub struct Debouncer<K> {
    delay: Duration,
    pending: Arc<DashMap<K, Pending>>,
    next_generation: AtomicU64,
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(DashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules `write` for `key`, replacing any write still waiting.
    pub fn stage<F>(&self, key: K, write: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let pending = Arc::clone(&self.pending);
        let task_key = key.clone();
        let (armed_tx, armed_rx) = oneshot::channel::<()>();

        let task = DeferredTask::schedule(self.delay, async move {
            // the entry is inserted before the timer can observe it
            if armed_rx.await.is_err() {
                return;
            }
            let Some((_, entry)) = pending.remove_if(&task_key, |_, p| p.generation == generation)
            else {
                return;
            };
            entry.task.detach();
            write.await;
        });

        if let Some(previous) = self.pending.insert(key.clone(), Pending { generation, task }) {
            debug!(?key, "superseding pending draft");
            counter!("clinic_autosave.superseded", 1);
            previous.task.cancel();
        }
        if let Some(entry) = self.pending.get(&key) {
            if entry.generation == generation {
                let _ = armed_tx.send(());
            }
        }
    }

    /// Drops the pending write for `key`. Returns whether one was waiting.
    pub fn cancel(&self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Debounced partial updates of client records, keyed by (account, client).
pub struct ClientDraftAutosaver {
    debouncer: Debouncer<(Uuid, Uuid)>,
    clients: Arc<ClientService>,
}

impl ClientDraftAutosaver {
    pub fn new(clients: Arc<ClientService>, delay: Duration) -> Self {
        Self {
            debouncer: Debouncer::new(delay),
            clients,
        }
    }

    pub fn stage(&self, session: Session, client_id: Uuid, draft: UpdateClientRequest) {
        let clients = Arc::clone(&self.clients);
        self.debouncer
            .stage((session.user_id, client_id), async move {
                match clients.update_client(&session, client_id, draft).await {
                    Ok(_) => {
                        counter!("clinic_autosave.written", 1);
                        debug!(%client_id, "client draft saved");
                    }
                    Err(e) => {
                        counter!("clinic_autosave.failed", 1);
                        warn!(%client_id, error = %e, "client draft could not be saved");
                    }
                }
            });
    }

    pub fn cancel(&self, session: &Session, client_id: Uuid) -> bool {
        self.debouncer.cancel(&(session.user_id, client_id))
    }

    pub fn is_pending(&self, session: &Session, client_id: Uuid) -> bool {
        self.debouncer.is_pending(&(session.user_id, client_id))
    }

    pub fn pending_count(&self) -> usize {
        self.debouncer.pending_count()
    }

    pub fn delay(&self) -> Duration {
        self.debouncer.delay()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<u32>>>, value: u32) -> impl Future<Output = ()> + Send + 'static {
        let log = Arc::clone(log);
        async move {
            log.lock().unwrap().push(value);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_collapses_into_last_write() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let log = Arc::new(Mutex::new(Vec::new()));

        for v in 1..=3 {
            debouncer.stage("client-a", recorder(&log, v));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(debouncer.pending_count(), 1);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(*log.lock().unwrap(), vec![3]);
        assert_eq!(debouncer.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_debounce_independently() {
        let debouncer = Debouncer::new(Duration::from_millis(200));
        let log = Arc::new(Mutex::new(Vec::new()));

        debouncer.stage("a", recorder(&log, 1));
        debouncer.stage("b", recorder(&log, 2));
        tokio::time::sleep(Duration::from_millis(300)).await;

        let mut written = log.lock().unwrap().clone();
        written.sort();
        assert_eq!(written, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_draft_is_never_written() {
        let debouncer = Debouncer::new(Duration::from_millis(200));
        let log = Arc::new(Mutex::new(Vec::new()));

        debouncer.stage("a", recorder(&log, 1));
        assert!(debouncer.cancel(&"a"));
        assert!(!debouncer.cancel(&"a"));
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_deferred_task_cancels_it() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let task = DeferredTask::schedule(Duration::from_millis(50), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(task);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        let counter = Arc::clone(&runs);
        let task = DeferredTask::schedule(Duration::from_millis(50), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        task.detach();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
