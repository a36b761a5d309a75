use anyhow::{anyhow, Result};
use async_channel::bounded;
use async_channel::Receiver;
use async_channel::Sender;
use async_trait::async_trait;
use hashbrown::HashMap;
use log::*;
use std::fmt::Debug;
use std::hash::Hash;

use crate::level::CacheLevel;
use crate::worker::{JsonString, WorkerState, WorkerStatus, DOWN, OK};

#[derive(Debug, Clone)]
pub enum Command<K, V> {
    Set(K, V, Sender<Option<V>>),
    Get(K, Sender<Option<V>>),
    Remove(K, Sender<Option<V>>),
    Keys(Sender<Vec<K>>),
    Len(Sender<usize>),
    Status(Sender<JsonString>), // request the worker's status
    Shutdown,
}

// the handler loop; owns the map and answers one command at a time
pub async fn handler<K, V>(id: String, rx: Receiver<Command<K, V>>) -> Result<()>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + Debug,
{
    let state = WorkerState::Idle;
    let mut error_count = 0u16;

    let mut cache: HashMap<K, V> = HashMap::new();

    while let Ok(cmd) = rx.recv().await {
        debug!("worker {} recv cmd: {:?}", id, cmd);
        match cmd {
            Command::Set(key, value, tx) => {
                let previous = cache.insert(key, value);
                error_count = error_count.saturating_add(send_response(previous, tx).await);
            }
            Command::Get(key, tx) => {
                let value = cache.get(&key).cloned();
                error_count = error_count.saturating_add(send_response(value, tx).await);
            }
            Command::Remove(key, tx) => {
                let value = cache.remove(&key);
                error_count = error_count.saturating_add(send_response(value, tx).await);
            }
            Command::Keys(tx) => {
                let list: Vec<K> = cache.keys().cloned().collect();
                error_count = error_count.saturating_add(send_response(list, tx).await);
            }
            Command::Len(tx) => {
                let sz = cache.len();
                error_count = error_count.saturating_add(send_response(sz, tx).await);
            }
            Command::Status(tx) => {
                let status = WorkerStatus::new(
                    id.to_string(),
                    OK.to_string(),
                    state.clone(),
                    cache.len(),
                    error_count,
                );

                let msg = status.to_json();
                info!("status response: {}", msg);
                error_count = error_count.saturating_add(send_response(msg, tx).await);
            }
            Command::Shutdown => {
                info!("worker id: {}, state: {:?}", id, WorkerState::Shutdown);
                break;
            }
        }
    }

    // helper functions
    async fn send_response<T>(msg: T, tx: Sender<T>) -> u16 {
        if tx.send(msg).await.is_err() {
            error!("error sending response, receiver dropped");
            1u16
        } else {
            0u16
        }
    }

    rx.close();

    Ok(())
}

/// An in-process cache level: a background task owns a hash map and answers
/// commands sent over a bounded channel.  No eviction, no expiry.
#[derive(Debug, Clone)]
pub struct MemoryWorker<K, V> {
    id: String,
    request_tx: Sender<Command<K, V>>,
}

impl<K, V> MemoryWorker<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
{
    /// create and start a new worker.
    pub async fn new() -> MemoryWorker<K, V> {
        let id = create_worker_id();

        // this is for the worker struct
        let wid = id.clone();

        info!("starting up worker, id: {}", id);

        let (request_tx, request_receiver) = bounded(250);

        // run the handler loop as a background task
        async_std::task::spawn(async move {
            match handler(id.clone(), request_receiver).await {
                Ok(()) => info!("worker handler exit for worker id: {}", id),
                Err(e) => error!("worker exit with error: {:?}", e),
            }
        });

        let worker = MemoryWorker {
            id: wid,
            request_tx,
        };

        info!("worker created: {:?}", &worker);

        worker
    }

    /// return the worker's id
    pub fn id(&self) -> String {
        self.id.to_string()
    }

    /// This is invoked by the client to enable sending command request to
    /// the worker
    pub fn request_channel(&self) -> Sender<Command<K, V>> {
        self.request_tx.clone()
    }

    /// insert the value and return the one it replaced
    pub async fn insert(&self, key: K, value: V) -> Result<Option<V>> {
        let (tx, rx) = bounded(1);
        self.request(Command::Set(key, value, tx), rx).await
    }

    pub async fn lookup(&self, key: K) -> Result<Option<V>> {
        let (tx, rx) = bounded(1);
        self.request(Command::Get(key, tx), rx).await
    }

    pub async fn remove(&self, key: K) -> Result<Option<V>> {
        let (tx, rx) = bounded(1);
        self.request(Command::Remove(key, tx), rx).await
    }

    pub async fn keys(&self) -> Result<Vec<K>> {
        let (tx, rx) = bounded(1);
        self.request(Command::Keys(tx), rx).await
    }

    pub async fn len(&self) -> Result<usize> {
        let (tx, rx) = bounded(1);
        self.request(Command::Len(tx), rx).await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// the worker's status; reported as down when the worker does not answer
    pub async fn status(&self) -> WorkerStatus {
        let (tx, rx) = bounded(1);
        let status = self
            .request(Command::Status(tx), rx)
            .await
            .and_then(|js| {
                serde_json::from_str::<WorkerStatus>(&js).map_err(anyhow::Error::from)
            });

        match status {
            Ok(status) => status,
            Err(e) => {
                warn!("worker {} status failed: {:?}", self.id, e);
                let state = if self.request_tx.is_closed() {
                    WorkerState::Shutdown
                } else {
                    WorkerState::Broken
                };
                WorkerStatus::new(self.id(), DOWN.to_string(), state, 0, 0)
            }
        }
    }

    /// stop the handler loop; later requests fail
    pub async fn shutdown(&self) -> Result<()> {
        if self.request_tx.send(Command::Shutdown).await.is_err() {
            return Err(anyhow!("worker {} already shut down", self.id));
        }
        Ok(())
    }

    async fn request<T>(&self, cmd: Command<K, V>, rx: Receiver<T>) -> Result<T> {
        if self.request_tx.send(cmd).await.is_err() {
            error!("error sending request to worker: {}", self.id);
            return Err(anyhow!("worker {} is not running", self.id));
        }

        match rx.recv().await {
            Ok(resp) => Ok(resp),
            Err(e) => Err(anyhow!("worker {} did not respond: {}", self.id, e)),
        }
    }
}

#[async_trait]
impl<K, V, O> CacheLevel<K, V, O> for MemoryWorker<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Debug + Send + Sync + 'static,
    O: Send + Sync,
{
    async fn get(&self, key: &K, _options: &O) -> Result<Option<V>> {
        self.lookup(key.clone()).await
    }

    // absence is stored by dropping the entry
    async fn set(&self, key: &K, value: Option<&V>, _options: &O) -> Result<()> {
        match value {
            Some(value) => self.insert(key.clone(), value.clone()).await?,
            None => self.remove(key.clone()).await?,
        };
        Ok(())
    }

    fn on_get_error(&self, error: &anyhow::Error) {
        error!("worker {} get error: {}", self.id, error);
    }

    fn on_set_error(&self, error: &anyhow::Error) {
        error!("worker {} set error: {}", self.id, error);
    }
}

// 16 alphanumeric chars
fn create_worker_id() -> String {
    std::iter::repeat_with(fastrand::alphanumeric)
        .take(16)
        .collect()
}
