//! Channel connection lifecycle.
//!
//! A [`ChannelConnection`] owns the broker handle for one side of the channel.
//! It connects lazily, retries with exponential backoff, and drops the handle
//! after a transport failure so the next call reconnects.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

use crate::channel::{Delivery, DeliveryTag, EnvelopeSink, EnvelopeSource};
use crate::errors::ChannelError;
use plan_indexer_shared::Operation;

/// Opens a broker handle.
#[async_trait]
pub trait Connector: Send + Sync {
    type Channel: Send + Sync + 'static;

    async fn connect(&self) -> Result<Arc<Self::Channel>, ChannelError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
}

/// How often and how patiently to retry a failed connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Connect attempts before giving up; at least one is always made.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            ..Self::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay after the given failed attempt (1-based): doubles each time, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Lazily connected, self-healing handle on a channel backend.
pub struct ChannelConnection<C: Connector> {
    connector: C,
    policy: ReconnectPolicy,
    current: Mutex<Option<Arc<C::Channel>>>,
    state: watch::Sender<ConnectionState>,
}

impl<C: Connector> ChannelConnection<C> {
    pub fn new(connector: C, policy: ReconnectPolicy) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            policy,
            current: Mutex::new(None),
            state,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// The live channel, connecting first if needed.
    ///
    /// Concurrent callers wait for a single connect sequence.
    pub async fn channel(&self) -> Result<Arc<C::Channel>, ChannelError> {
        let mut current = self.current.lock().await;
        if let Some(channel) = current.as_ref() {
            return Ok(channel.clone());
        }

        self.state.send_replace(ConnectionState::Connecting);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.connector.connect().await {
                Ok(channel) => {
                    *current = Some(channel.clone());
                    self.state.send_replace(ConnectionState::Ready);
                    info!(attempt = attempt, "Channel connection ready");
                    return Ok(channel);
                }
                Err(e) if attempt < max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Channel connect failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    self.state.send_replace(ConnectionState::Disconnected);
                    error!(attempts = attempt, error = %e, "Giving up on channel connection");
                    return Err(ChannelError::connection(format!(
                        "no connection after {} attempts: {}",
                        attempt, e
                    )));
                }
            }
        }
    }

    /// Drop the current handle; the next call reconnects.
    pub async fn invalidate(&self) {
        let mut current = self.current.lock().await;
        if current.take().is_some() {
            info!("Channel connection invalidated");
        }
        self.state.send_replace(ConnectionState::Disconnected);
    }

    async fn observe<T>(&self, result: &Result<T, ChannelError>) {
        if let Err(e) = result {
            if e.is_transport() {
                warn!(error = %e, "Transport failure on channel");
                self.invalidate().await;
            }
        }
    }
}

#[async_trait]
impl<C> EnvelopeSink for ChannelConnection<C>
where
    C: Connector,
    C::Channel: EnvelopeSink,
{
    async fn send(
        &self,
        key: Option<&str>,
        payload: &[u8],
        operation: Operation,
    ) -> Result<bool, ChannelError> {
        let channel = self.channel().await?;
        let result = channel.send(key, payload, operation).await;
        self.observe(&result).await;
        result
    }
}

#[async_trait]
impl<C> EnvelopeSource for ChannelConnection<C>
where
    C: Connector,
    C::Channel: EnvelopeSource,
{
    async fn fetch(&self) -> Result<Option<Delivery>, ChannelError> {
        let channel = self.channel().await?;
        let result = channel.fetch().await;
        self.observe(&result).await;
        result
    }

    async fn ack(&self, tag: DeliveryTag) -> Result<(), ChannelError> {
        let channel = self.channel().await?;
        let result = channel.ack(tag).await;
        self.observe(&result).await;
        result
    }

    async fn nack(&self, tag: DeliveryTag) -> Result<(), ChannelError> {
        let channel = self.channel().await?;
        let result = channel.nack(tag).await;
        self.observe(&result).await;
        result
    }
}
