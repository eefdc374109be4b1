//! Shared helpers for banner-cache integration tests.
#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use banner_cache::cache::{CacheBackend, CacheError, ChannelMessage, LocalCacheBackend, MessageStream};
use banner_db_memory::InMemoryBannerStorage;
use banner_storage::{
    Banner, BannerDeleter, BannerPatch, BannerQuery, BannerReader, BannerWriter, NewBanner,
    StorageError,
};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Polls `check` until it returns true or `timeout` elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Waits until the backend holds an entry for `key`.
pub async fn wait_for_key(backend: &dyn CacheBackend, key: &str) -> bool {
    wait_until(Duration::from_secs(2), || async {
        matches!(backend.get(key).await, Ok(Some(_)))
    })
    .await
}

/// In-memory store that counts source-of-truth calls.
#[derive(Default)]
pub struct CountingStorage {
    pub inner: InMemoryBannerStorage,
    pub find_one_calls: AtomicUsize,
    pub find_many_calls: AtomicUsize,
    pub deleted_pairs: Mutex<Vec<(i64, i64)>>,
    /// When set, `find_one` fails with a connection error.
    pub fail_reads: AtomicBool,
    /// When set, `delete_by_feature_tag` fails after recording the call.
    pub fail_deletes: AtomicBool,
}

impl CountingStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn find_one_calls(&self) -> usize {
        self.find_one_calls.load(Ordering::SeqCst)
    }

    pub fn deleted_pairs(&self) -> Vec<(i64, i64)> {
        self.deleted_pairs.lock().unwrap().clone()
    }

    pub async fn seed(&self, title: &str, feature_id: i64, tag_ids: Vec<i64>) -> i64 {
        self.inner
            .create(NewBanner::new(title, feature_id, tag_ids))
            .await
            .unwrap()
    }
}

#[async_trait]
impl BannerReader for CountingStorage {
    async fn find_one(
        &self,
        feature_id: i64,
        tag_id: i64,
        use_latest: bool,
    ) -> Result<Banner, StorageError> {
        self.find_one_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::connection_error("database is down"));
        }
        self.inner.find_one(feature_id, tag_id, use_latest).await
    }

    async fn find_many(&self, query: &BannerQuery) -> Result<Vec<Banner>, StorageError> {
        self.find_many_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_many(query).await
    }
}

#[async_trait]
impl BannerDeleter for CountingStorage {
    async fn delete_by_id(&self, id: i64) -> Result<(), StorageError> {
        self.inner.delete_by_id(id).await
    }

    async fn delete_by_feature_tag(
        &self,
        feature_id: i64,
        tag_id: i64,
    ) -> Result<(), StorageError> {
        self.deleted_pairs.lock().unwrap().push((feature_id, tag_id));
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::internal("deadlock detected"));
        }
        self.inner.delete_by_feature_tag(feature_id, tag_id).await
    }
}

#[async_trait]
impl BannerWriter for CountingStorage {
    async fn create(&self, banner: NewBanner) -> Result<i64, StorageError> {
        self.inner.create(banner).await
    }

    async fn update(&self, id: i64, patch: BannerPatch) -> Result<(), StorageError> {
        self.inner.update(id, patch).await
    }
}

/// Local backend with switchable failures per operation.
#[derive(Clone, Default)]
pub struct FlakyBackend {
    pub inner: LocalCacheBackend,
    pub fail_get: Arc<AtomicBool>,
    pub fail_set: Arc<AtomicBool>,
    pub fail_publish: Arc<AtomicBool>,
    pub set_calls: Arc<AtomicUsize>,
}

impl FlakyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheBackend for FlakyBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(CacheError::Connection("connection refused".into()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, payload: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(CacheError::Connection("connection refused".into()));
        }
        self.inner.set(key, payload, ttl).await
    }

    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), CacheError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(CacheError::Connection("connection refused".into()));
        }
        self.inner.publish(channel, payload).await
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, CacheError> {
        self.inner.subscribe(channel).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

/// Backend whose subscriptions are fed by the test.
///
/// Every `subscribe` call opens a new feed; `feeds` hands the senders to the
/// test, and dropping a sender closes that subscription stream.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    pub feeds: Arc<Mutex<Vec<mpsc::UnboundedSender<ChannelMessage>>>>,
    pub subscribe_calls: Arc<AtomicUsize>,
    pub fail_subscribe: Arc<AtomicBool>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    /// Sends a raw message on the most recent subscription.
    pub fn push(&self, channel: &str, payload: &[u8]) {
        let feeds = self.feeds.lock().unwrap();
        let feed = feeds.last().expect("no active subscription");
        let _ = feed.send(ChannelMessage::new(channel, payload.to_vec()));
    }

    /// Closes every open subscription stream.
    pub fn close_all(&self) {
        self.feeds.lock().unwrap().clear();
    }
}

#[async_trait]
impl CacheBackend for ScriptedBackend {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _payload: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), CacheError> {
        for feed in self.feeds.lock().unwrap().iter() {
            let _ = feed.send(ChannelMessage::new(channel, payload.clone()));
        }
        Ok(())
    }

    async fn subscribe(&self, _channel: &str) -> Result<MessageStream, CacheError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(CacheError::Subscribe("not connected".into()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.feeds.lock().unwrap().push(tx);
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}

/// Raises its flag when dropped, i.e. when the future holding it is abandoned.
pub struct DropFlag(pub Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Local backend whose `set` never completes.
#[derive(Clone, Default)]
pub struct StallingBackend {
    pub inner: LocalCacheBackend,
    pub set_started: Arc<AtomicBool>,
    pub set_abandoned: Arc<AtomicBool>,
}

impl StallingBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for StallingBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, _key: &str, _payload: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        let _flag = DropFlag(Arc::clone(&self.set_abandoned));
        self.set_started.store(true, Ordering::SeqCst);
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), CacheError> {
        self.inner.publish(channel, payload).await
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, CacheError> {
        self.inner.subscribe(channel).await
    }

    fn backend_name(&self) -> &'static str {
        "stalling"
    }
}

/// Deleter whose `delete_by_feature_tag` never completes.
#[derive(Default)]
pub struct StallingDeleter {
    pub started: AtomicUsize,
    pub abandoned: Arc<AtomicBool>,
}

#[async_trait]
impl BannerDeleter for StallingDeleter {
    async fn delete_by_id(&self, _id: i64) -> Result<(), StorageError> {
        Ok(())
    }

    async fn delete_by_feature_tag(
        &self,
        _feature_id: i64,
        _tag_id: i64,
    ) -> Result<(), StorageError> {
        let _flag = DropFlag(Arc::clone(&self.abandoned));
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
        Ok(())
    }
}
