use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use jsonschema::Validator;

use crate::channel::Channel;
use crate::config::RouterConfig;
use crate::error::{Result, RouterError};
use crate::message::{now_millis, Message};
use crate::validator::{compile, validate_payload};

/// What a subscriber callback returns. Errors are logged, never propagated.
pub type SubscriberResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A subscriber callback.
///
/// Registrations are identified by pointer: keep a clone of the `Arc` to
/// unsubscribe later.
pub type Subscriber = Arc<dyn Fn(&Message) -> SubscriberResult + Send + Sync>;

/// Wrap a closure as a [`Subscriber`].
pub fn subscriber<F>(f: F) -> Subscriber
where
    F: Fn(&Message) -> SubscriberResult + Send + Sync + 'static,
{
    Arc::new(f)
}

struct ChannelState {
    channel: Channel,
    buffer: VecDeque<Message>,
    subscribers: Vec<Subscriber>,
    validator: Option<Arc<Validator>>,
}

impl ChannelState {
    fn new(channel: Channel) -> Self {
        Self {
            buffer: VecDeque::with_capacity(channel.buffer_size.min(1024)),
            channel,
            subscribers: Vec::new(),
            validator: None,
        }
    }

    fn trim_to_capacity(&mut self) {
        let excess = self.buffer.len().saturating_sub(self.channel.buffer_size);
        self.buffer.drain(..excess);
    }
}

/// Channel-keyed pub/sub router with bounded per-channel history.
///
/// Subscriber callbacks run synchronously on the publishing thread, in
/// subscription order, against a snapshot of the subscriber list taken
/// when the publish began. No lock is held while callbacks run, so a
/// callback may itself subscribe, unsubscribe, or publish.
pub struct Router {
    channels: RwLock<HashMap<String, Arc<Mutex<ChannelState>>>>,
    config: RouterConfig,
}

impl Router {
    /// Create an empty router with default config.
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    /// Create an empty router with explicit config.
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Insert or update a channel definition.
    ///
    /// A new name starts with no subscribers and an empty buffer. For an
    /// existing name the definition is replaced while subscribers, buffered
    /// history, and statistics are kept; history beyond a smaller
    /// `buffer_size` is evicted oldest-first.
    pub fn register_channel(&self, channel: Channel) {
        let mut channel = self.clamped(channel);
        let mut channels = write(&self.channels);
        match channels.get(&channel.name) {
            Some(slot) => {
                let mut state = lock(slot);
                channel.message_count = state.channel.message_count;
                channel.last_message_at = state.channel.last_message_at;
                state.channel = channel;
                state.validator = None;
                state.trim_to_capacity();
            }
            None => {
                tracing::debug!(channel = %channel.name, kind = %channel.kind, "registered channel");
                channels.insert(
                    channel.name.clone(),
                    Arc::new(Mutex::new(ChannelState::new(channel))),
                );
            }
        }
    }

    /// Register `channel` unless its name is already taken.
    ///
    /// The check and the insert happen under one write lock, so a
    /// definition registered concurrently is never overwritten. Returns
    /// true if `channel` was inserted.
    pub fn register_if_absent(&self, channel: Channel) -> bool {
        let channel = self.clamped(channel);
        let mut channels = write(&self.channels);
        if channels.contains_key(&channel.name) {
            return false;
        }
        tracing::debug!(channel = %channel.name, kind = %channel.kind, "registered channel");
        channels.insert(
            channel.name.clone(),
            Arc::new(Mutex::new(ChannelState::new(channel))),
        );
        true
    }

    fn clamped(&self, mut channel: Channel) -> Channel {
        if channel.buffer_size > self.config.max_buffer_size {
            tracing::warn!(
                channel = %channel.name,
                requested = channel.buffer_size,
                max = self.config.max_buffer_size,
                "clamping channel buffer size"
            );
            channel.buffer_size = self.config.max_buffer_size;
        }
        channel
    }

    /// Snapshot of a channel's definition and statistics.
    pub fn get_channel(&self, name: &str) -> Option<Channel> {
        self.slot(name).map(|slot| lock(&slot).channel.clone())
    }

    /// Snapshot of every channel, sorted by name.
    pub fn list_channels(&self) -> Vec<Channel> {
        let slots: Vec<_> = read(&self.channels).values().cloned().collect();
        let mut channels: Vec<Channel> = slots
            .iter()
            .map(|slot| lock(slot).channel.clone())
            .collect();
        channels.sort_by(|a, b| a.name.cmp(&b.name));
        channels
    }

    /// Append a subscriber. Returns false if the channel is not registered.
    pub fn subscribe(&self, channel_name: &str, subscriber: Subscriber) -> bool {
        match self.slot(channel_name) {
            Some(slot) => {
                lock(&slot).subscribers.push(subscriber);
                true
            }
            None => false,
        }
    }

    /// Remove one registration of `subscriber`.
    ///
    /// Returns false if the channel or the registration is not found.
    pub fn unsubscribe(&self, channel_name: &str, subscriber: &Subscriber) -> bool {
        let Some(slot) = self.slot(channel_name) else {
            return false;
        };

        let mut state = lock(&slot);
        match state
            .subscribers
            .iter()
            .position(|existing| Arc::ptr_eq(existing, subscriber))
        {
            Some(index) => {
                state.subscribers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of subscribers on a channel, or `None` if it is not registered.
    pub fn subscriber_count(&self, channel_name: &str) -> Option<usize> {
        self.slot(channel_name)
            .map(|slot| lock(&slot).subscribers.len())
    }

    /// Publish to the channel named by `message.channel`.
    ///
    /// Unknown channels are never created here; the message is dropped and
    /// 0 returned. Otherwise statistics and history are updated and every
    /// subscriber is invoked. A subscriber that errors or panics is logged
    /// and skipped. Returns the number of subscribers invoked, successful or
    /// not.
    ///
    /// Panic isolation relies on unwinding; under `panic = "abort"` a
    /// panicking subscriber still aborts the process.
    pub fn publish(&self, message: Message) -> usize {
        let Some(slot) = self.slot(&message.channel) else {
            tracing::trace!(channel = %message.channel, "dropping message for unknown channel");
            return 0;
        };

        let subscribers = {
            let mut state = lock(&slot);
            state.channel.message_count = state.channel.message_count.saturating_add(1);
            state.channel.last_message_at = Some(now_millis());
            if state.channel.buffer_size > 0 {
                if state.buffer.len() >= state.channel.buffer_size {
                    state.buffer.pop_front();
                }
                state.buffer.push_back(message.clone());
            }
            state.subscribers.clone()
        };

        for (index, subscriber) in subscribers.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| subscriber(&message))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(channel = %message.channel, subscriber = index, error = %err, "subscriber failed");
                }
                Err(_) => {
                    tracing::warn!(channel = %message.channel, subscriber = index, "subscriber panicked");
                }
            }
        }

        tracing::debug!(
            channel = %message.channel,
            message_id = %message.id,
            recipients = subscribers.len(),
            "published"
        );
        subscribers.len()
    }

    /// Validate the payload against the channel's schema, then publish.
    ///
    /// Unlike [`Router::publish`], an unknown channel is an error.
    pub fn publish_validated(&self, message: Message) -> Result<usize> {
        let slot = self
            .slot(&message.channel)
            .ok_or_else(|| RouterError::UnknownChannel(message.channel.clone()))?;

        let validator = {
            let mut state = lock(&slot);
            match (&state.validator, &state.channel.payload_schema) {
                (Some(validator), _) => Some(Arc::clone(validator)),
                (None, Some(schema)) => {
                    let compiled = Arc::new(compile(&state.channel.name, schema)?);
                    state.validator = Some(Arc::clone(&compiled));
                    Some(compiled)
                }
                (None, None) => None,
            }
        };

        if let Some(validator) = validator {
            validate_payload(&message.channel, &message.payload, &validator)?;
        }

        Ok(self.publish(message))
    }

    /// Up to `limit` most recent messages, oldest first.
    ///
    /// Unknown channels yield an empty list.
    pub fn get_recent_messages(&self, channel_name: &str, limit: usize) -> Vec<Message> {
        let Some(slot) = self.slot(channel_name) else {
            return Vec::new();
        };

        let state = lock(&slot);
        let skip = state.buffer.len().saturating_sub(limit);
        state.buffer.iter().skip(skip).cloned().collect()
    }

    /// Get router configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    fn slot(&self, name: &str) -> Option<Arc<Mutex<ChannelState>>> {
        read(&self.channels).get(name).cloned()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("channels", &read(&self.channels).len())
            .field("config", &self.config)
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
