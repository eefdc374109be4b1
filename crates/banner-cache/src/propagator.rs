//! Delete-by-feature-tag propagation over the cache pub/sub channel.
//!
//! ## How It Works
//!
//! 1. `request_delete(f, t)` publishes `{"feature_id": f, "tag_id": t}` on the channel
//! 2. Every instance runs one listener subscribed to that channel (the publisher included)
//! 3. Each received message is handed to a fresh task that runs the local delete
//!
//! ```text
//! Instance 1: request_delete(42, 7)
//!   ↓
//! PUBLISH redis_deleter_job_delayer {"feature_id":42,"tag_id":7}
//!   ↓
//! Instance 1: listener → delete_by_feature_tag(42, 7)
//! Instance 2: listener → delete_by_feature_tag(42, 7)
//! ```
//!
//! Delivery is best effort. A failed publish, an instance that is not subscribed
//! at publish time, or a failing delete all end with a log line and nothing else:
//! there is no acknowledgement, retry or dead-letter queue.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use banner_storage::{BannerDeleter, StorageError};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheBackend, CacheError, ChannelMessage, MessageStream};
use crate::config::DeleteChannelConfig;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Payload published on the delete channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteMessage {
    pub feature_id: i64,
    pub tag_id: i64,
}

/// Listener behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagatorSettings {
    /// Channel shared by every instance of the deployment.
    pub channel: String,
    /// Upper bound for one delete task; `None` leaves it unbounded.
    pub delete_timeout: Option<Duration>,
    /// Re-subscribe after the stream closes instead of stopping.
    pub reconnect: bool,
    /// First reconnect delay, doubled after each failed attempt.
    pub initial_backoff: Duration,
    /// Cap for the reconnect delay.
    pub max_backoff: Duration,
}

impl Default for PropagatorSettings {
    fn default() -> Self {
        Self::from(&DeleteChannelConfig::default())
    }
}

impl From<&DeleteChannelConfig> for PropagatorSettings {
    fn from(config: &DeleteChannelConfig) -> Self {
        Self {
            channel: config.channel.clone(),
            delete_timeout: config.delete_timeout_secs.map(Duration::from_secs),
            reconnect: config.reconnect,
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: Duration::from_secs(config.max_backoff_secs),
        }
    }
}

/// Why the listener stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerExit {
    /// The cancellation token passed to [`DeletePropagator::start`] fired.
    Cancelled,
    /// The subscription stream ended (backend connection closed) and reconnect is off.
    StreamClosed,
}

/// Observable state of the background listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Waiting for the next message.
    Listening,
    /// Stream closed, waiting to re-subscribe.
    Reconnecting,
    /// The listener task has exited; this instance no longer applies deletes.
    Stopped(ListenerExit),
}

impl ListenerState {
    pub fn exit(&self) -> Option<ListenerExit> {
        match self {
            Self::Stopped(exit) => Some(*exit),
            _ => None,
        }
    }
}

/// Banner deleter that turns delete-by-feature-tag into a broadcast request.
///
/// Construction subscribes to the channel and spawns exactly one listener task
/// tied to the given [`CancellationToken`]. The token must stay alive (and
/// uncancelled) for as long as this instance should apply deletes.
pub struct DeletePropagator<D: ?Sized> {
    deleter: Arc<D>,
    backend: Arc<dyn CacheBackend>,
    channel: String,
    state: watch::Receiver<ListenerState>,
}

impl<D> DeletePropagator<D>
where
    D: BannerDeleter + ?Sized + 'static,
{
    /// Subscribe to the delete channel and start the listener.
    ///
    /// Returns once the subscription is active, so any message published after
    /// this call returns reaches this instance.
    pub async fn start(
        backend: Arc<dyn CacheBackend>,
        deleter: Arc<D>,
        settings: PropagatorSettings,
        shutdown: CancellationToken,
    ) -> Result<Self, CacheError> {
        let stream = backend.subscribe(&settings.channel).await?;
        let (state_tx, state_rx) = watch::channel(ListenerState::Listening);

        tracing::info!(
            channel = %settings.channel,
            backend = backend.backend_name(),
            "delete listener started"
        );

        let channel = settings.channel.clone();
        let listener = DeleteListener {
            backend: Arc::clone(&backend),
            deleter: Arc::clone(&deleter),
            settings,
            shutdown,
            state: state_tx,
        };
        tokio::spawn(listener.run(stream));

        Ok(Self {
            deleter,
            backend,
            channel,
            state: state_rx,
        })
    }

    /// Publish a delete-by-feature-tag request to every subscribed instance.
    ///
    /// Success means the request was queued for delivery, not that anything was
    /// deleted. Backend failures are logged and reported as an opaque error.
    pub async fn request_delete(&self, feature_id: i64, tag_id: i64) -> Result<(), StorageError> {
        let message = DeleteMessage { feature_id, tag_id };
        let payload = serde_json::to_vec(&message).map_err(|e| {
            tracing::error!(error = %e, "unable to encode delete message");
            StorageError::internal("unknown error")
        })?;

        if let Err(e) = self.backend.publish(&self.channel, payload).await {
            tracing::error!(
                channel = %self.channel,
                feature_id,
                tag_id,
                error = %e,
                "error publishing delete message"
            );
            return Err(StorageError::internal("unknown error"));
        }

        tracing::debug!(channel = %self.channel, feature_id, tag_id, "delete request published");
        Ok(())
    }

    /// Current listener state.
    pub fn listener_state(&self) -> ListenerState {
        *self.state.borrow()
    }

    /// Waits until the listener task exits and reports why.
    pub async fn listener_stopped(&self) -> ListenerExit {
        let mut state = self.state.clone();
        let exit = state
            .wait_for(|s| s.exit().is_some())
            .await
            .ok()
            .and_then(|s| s.exit());
        // The sender only goes away with the task itself
        exit.unwrap_or(ListenerExit::StreamClosed)
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Get a reference to the decorated deleter.
    pub fn inner(&self) -> &Arc<D> {
        &self.deleter
    }
}

#[async_trait]
impl<D> BannerDeleter for DeletePropagator<D>
where
    D: BannerDeleter + ?Sized + 'static,
{
    async fn delete_by_id(&self, id: i64) -> Result<(), StorageError> {
        self.deleter.delete_by_id(id).await
    }

    async fn delete_by_feature_tag(
        &self,
        feature_id: i64,
        tag_id: i64,
    ) -> Result<(), StorageError> {
        self.request_delete(feature_id, tag_id).await
    }
}

/// Background task applying received delete requests to the local deleter.
struct DeleteListener<D: ?Sized> {
    backend: Arc<dyn CacheBackend>,
    deleter: Arc<D>,
    settings: PropagatorSettings,
    shutdown: CancellationToken,
    state: watch::Sender<ListenerState>,
}

impl<D> DeleteListener<D>
where
    D: BannerDeleter + ?Sized + 'static,
{
    async fn run(self, mut stream: MessageStream) {
        let exit = loop {
            match self.consume(&mut stream).await {
                ListenerExit::StreamClosed if self.settings.reconnect => {
                    match self.resubscribe().await {
                        Some(next) => stream = next,
                        None => break ListenerExit::Cancelled,
                    }
                }
                exit => break exit,
            }
        };

        match exit {
            ListenerExit::Cancelled => {
                tracing::info!(channel = %self.settings.channel, "delete listener cancelled");
            }
            ListenerExit::StreamClosed => {
                tracing::error!(
                    channel = %self.settings.channel,
                    "delete channel stream closed, delete propagation stopped on this instance"
                );
            }
        }
        self.state.send_replace(ListenerState::Stopped(exit));
    }

    /// Reads messages until the stream ends or the listener is cancelled.
    async fn consume(&self, stream: &mut MessageStream) -> ListenerExit {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return ListenerExit::Cancelled,
                next = stream.next() => match next {
                    Some(message) => self.dispatch(message),
                    None => {
                        tracing::warn!(channel = %self.settings.channel, "delete channel stream ended");
                        return ListenerExit::StreamClosed;
                    }
                },
            }
        }
    }

    /// Subscribes again with exponential backoff. `None` if cancelled meanwhile.
    async fn resubscribe(&self) -> Option<MessageStream> {
        self.state.send_replace(ListenerState::Reconnecting);
        let mut backoff = self.settings.initial_backoff;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return None,
                _ = tokio::time::sleep(backoff) => {}
            }

            match self.backend.subscribe(&self.settings.channel).await {
                Ok(stream) => {
                    tracing::info!(channel = %self.settings.channel, "delete listener re-subscribed");
                    self.state.send_replace(ListenerState::Listening);
                    return Some(stream);
                }
                Err(e) => {
                    tracing::error!(
                        channel = %self.settings.channel,
                        error = %e,
                        backoff_secs = backoff.as_secs(),
                        "delete listener re-subscribe failed"
                    );
                    backoff = backoff.saturating_mul(2).min(self.settings.max_backoff);
                }
            }
        }
    }

    /// Parses one message and runs the delete on its own task.
    fn dispatch(&self, message: ChannelMessage) {
        if message.channel != self.settings.channel {
            tracing::debug!(channel = %message.channel, "ignoring message from foreign channel");
            return;
        }

        let request: DeleteMessage = match serde_json::from_slice(&message.payload) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    payload = %String::from_utf8_lossy(&message.payload),
                    "unable to parse delete message payload"
                );
                return;
            }
        };

        let deleter = Arc::clone(&self.deleter);
        let delete_timeout = self.settings.delete_timeout;
        tokio::spawn(async move {
            let DeleteMessage { feature_id, tag_id } = request;
            let delete = deleter.delete_by_feature_tag(feature_id, tag_id);
            let result = match delete_timeout {
                Some(limit) => tokio::time::timeout(limit, delete).await.unwrap_or_else(|_| {
                    Err(StorageError::internal(format!(
                        "delete timed out after {limit:?}"
                    )))
                }),
                None => delete.await,
            };

            match result {
                Ok(()) => {
                    tracing::debug!(feature_id, tag_id, "banners deleted by feature and tag");
                }
                Err(e) => {
                    tracing::error!(
                        feature_id,
                        tag_id,
                        error = %e,
                        "unable to delete banners by feature and tag"
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        let json = serde_json::to_string(&DeleteMessage {
            feature_id: 42,
            tag_id: 7,
        })
        .unwrap();
        assert_eq!(json, r#"{"feature_id":42,"tag_id":7}"#);
    }

    #[test]
    fn test_settings_from_config() {
        let settings = PropagatorSettings::default();
        assert_eq!(settings.channel, "redis_deleter_job_delayer");
        assert_eq!(settings.delete_timeout, None);
        assert!(!settings.reconnect);
        assert_eq!(settings.max_backoff, Duration::from_secs(300));

        let config = DeleteChannelConfig {
            delete_timeout_secs: Some(3),
            reconnect: true,
            ..Default::default()
        };
        let settings = PropagatorSettings::from(&config);
        assert_eq!(settings.delete_timeout, Some(Duration::from_secs(3)));
        assert!(settings.reconnect);
    }

    #[test]
    fn test_listener_state_exit() {
        assert_eq!(ListenerState::Listening.exit(), None);
        assert_eq!(ListenerState::Reconnecting.exit(), None);
        assert_eq!(
            ListenerState::Stopped(ListenerExit::Cancelled).exit(),
            Some(ListenerExit::Cancelled)
        );
    }
}
