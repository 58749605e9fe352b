//! Message Bus Module
//!
//! This module provides the core message bus infrastructure for Ferrobot.
//! The `MessageBus` carries inbound messages (from channel adapters to the
//! agent engine) and outbound messages (from the engine back to adapters),
//! and fans outbound messages out to per-channel subscribers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Adapter   │────>│  MessageBus │────>│  AgentLoop  │
//! │ (any chat)  │     │  (inbound)  │     │             │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            ▲                   │
//!                            │ outbound          │
//! ┌─────────────┐     ┌─────────────┐            │
//! │ Subscribers │<────│  Dispatcher │<───────────┘
//! │ per channel │     │  (fan-out)  │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! Each queue is FIFO and point-to-point: no message reaches more than one
//! queue consumer. Fan-out happens only at the dispatcher, which delivers
//! each outbound item to every subscriber registered for its channel.

pub mod message;

pub use message::{InboundMessage, OutboundMessage, ACTION_TYPING, METADATA_ACTION};

use crate::error::{FerroError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tracing::{debug, warn};

/// Default buffer size for message channels
const DEFAULT_BUFFER_SIZE: usize = 100;

/// How long the dispatcher waits for an outbound item before re-checking
/// the shutdown flag.
const DISPATCH_POLL: Duration = Duration::from_secs(1);

/// A fan-out target for outbound messages on one channel.
///
/// Channel adapters implement this to receive the engine's replies. Delivery
/// failures are logged and swallowed by the dispatcher; no retry state exists
/// at this layer.
#[async_trait]
pub trait OutboundHandler: Send + Sync {
    /// Deliver one outbound message to the adapter's destination.
    async fn deliver(&self, msg: &OutboundMessage) -> Result<()>;
}

/// The central message bus routing messages between adapters and the agent.
///
/// The `MessageBus` maintains two separate queues:
/// - **Inbound**: messages from adapters (and system triggers) to the agent
/// - **Outbound**: messages from the agent back to adapters
///
/// Both queues use async MPSC channels backed by Tokio; receivers are wrapped
/// in `Arc<Mutex>` so clones of the bus share the same queues.
pub struct MessageBus {
    /// Sender for inbound messages
    inbound_tx: mpsc::Sender<InboundMessage>,
    /// Receiver for inbound messages (wrapped in Arc<Mutex> for shared access)
    inbound_rx: Arc<Mutex<mpsc::Receiver<InboundMessage>>>,
    /// Sender for outbound messages
    outbound_tx: mpsc::Sender<OutboundMessage>,
    /// Receiver for outbound messages (wrapped in Arc<Mutex> for shared access)
    outbound_rx: Arc<Mutex<mpsc::Receiver<OutboundMessage>>>,
    /// Per-channel outbound subscribers for dispatcher fan-out
    subscribers: Arc<RwLock<HashMap<String, Vec<Arc<dyn OutboundHandler>>>>>,
}

impl MessageBus {
    /// Creates a new `MessageBus` with default buffer sizes.
    ///
    /// # Example
    /// ```
    /// use ferrobot::bus::MessageBus;
    ///
    /// let bus = MessageBus::new();
    /// ```
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Creates a new `MessageBus` with a custom buffer size.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer_size);
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer_size);

        Self {
            inbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            outbound_tx,
            outbound_rx: Arc::new(Mutex::new(outbound_rx)),
            subscribers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Publishes an inbound message to the bus.
    ///
    /// Called by channel adapters when they receive a message from a user,
    /// and by schedulers delivering synthetic `"system"` triggers.
    ///
    /// # Errors
    /// Returns `FerroError::BusClosed` if the receiver has been dropped.
    pub async fn publish_inbound(&self, msg: InboundMessage) -> Result<()> {
        self.inbound_tx
            .send(msg)
            .await
            .map_err(|_| FerroError::BusClosed)
    }

    /// Consumes the next inbound message from the bus, waiting until one
    /// arrives.
    ///
    /// # Returns
    /// - `Some(InboundMessage)` if a message is available
    /// - `None` if the queue is closed (all senders dropped)
    pub async fn consume_inbound(&self) -> Option<InboundMessage> {
        self.inbound_rx.lock().await.recv().await
    }

    /// Consumes the next inbound message, waiting at most `timeout`.
    ///
    /// Returns `None` on timeout or when the queue is closed. Loop drivers
    /// use the timeout purely to observe their shutdown flag promptly.
    pub async fn consume_inbound_timeout(&self, timeout: Duration) -> Option<InboundMessage> {
        match tokio::time::timeout(timeout, self.consume_inbound()).await {
            Ok(msg) => msg,
            Err(_) => None,
        }
    }

    /// Publishes an outbound message to the bus.
    ///
    /// Called by the agent engine (and by tools that deliver proactively)
    /// when there is a response to send back through a channel.
    ///
    /// # Errors
    /// Returns `FerroError::BusClosed` if the receiver has been dropped.
    pub async fn publish_outbound(&self, msg: OutboundMessage) -> Result<()> {
        self.outbound_tx
            .send(msg)
            .await
            .map_err(|_| FerroError::BusClosed)
    }

    /// Consumes the next outbound message from the bus.
    ///
    /// Normally only the dispatcher drains this queue; direct consumption is
    /// useful in tests and minimal embeddings without fan-out.
    pub async fn consume_outbound(&self) -> Option<OutboundMessage> {
        self.outbound_rx.lock().await.recv().await
    }

    /// Consumes the next outbound message, waiting at most `timeout`.
    pub async fn consume_outbound_timeout(&self, timeout: Duration) -> Option<OutboundMessage> {
        match tokio::time::timeout(timeout, self.consume_outbound()).await {
            Ok(msg) => msg,
            Err(_) => None,
        }
    }

    /// Returns a clone of the inbound message sender.
    ///
    /// Useful for giving each adapter its own sender to publish through.
    pub fn inbound_sender(&self) -> mpsc::Sender<InboundMessage> {
        self.inbound_tx.clone()
    }

    /// Returns a clone of the outbound message sender.
    pub fn outbound_sender(&self) -> mpsc::Sender<OutboundMessage> {
        self.outbound_tx.clone()
    }

    /// Tries to publish an inbound message without blocking.
    ///
    /// # Returns
    /// - `Ok(())` if the message was successfully queued
    /// - `Err(FerroError::BusClosed)` if the queue is closed
    /// - `Err(FerroError::Channel)` if the buffer is full
    pub fn try_publish_inbound(&self, msg: InboundMessage) -> Result<()> {
        self.inbound_tx.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                FerroError::Channel("inbound buffer full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => FerroError::BusClosed,
        })
    }

    /// Tries to publish an outbound message without blocking.
    pub fn try_publish_outbound(&self, msg: OutboundMessage) -> Result<()> {
        self.outbound_tx.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                FerroError::Channel("outbound buffer full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => FerroError::BusClosed,
        })
    }

    /// Registers a fan-out target for outbound messages on `channel`.
    ///
    /// Every handler registered for a channel receives every outbound
    /// message addressed to that channel.
    pub async fn subscribe_outbound(&self, channel: &str, handler: Arc<dyn OutboundHandler>) {
        self.subscribers
            .write()
            .await
            .entry(channel.to_string())
            .or_default()
            .push(handler);
        debug!(channel = %channel, "outbound subscriber registered");
    }

    /// Number of subscribers registered for `channel`.
    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.subscribers
            .read()
            .await
            .get(channel)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Runs the outbound dispatcher loop until `shutdown` flips to `true`.
    ///
    /// Pulls outbound items with a 1-second timeout so the shutdown flag is
    /// observed promptly, then invokes every handler subscribed to the
    /// item's channel. A failing handler is logged and skipped; it never
    /// blocks or crashes the loop. Items addressed to a channel with no
    /// subscribers are dropped with a warning.
    pub async fn dispatch_outbound(&self, shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                debug!("outbound dispatcher stopping");
                return;
            }
            let Some(msg) = self.consume_outbound_timeout(DISPATCH_POLL).await else {
                continue;
            };

            let handlers: Vec<Arc<dyn OutboundHandler>> = {
                let subs = self.subscribers.read().await;
                subs.get(&msg.channel).cloned().unwrap_or_default()
            };
            if handlers.is_empty() {
                warn!(channel = %msg.channel, "no outbound subscriber for channel, dropping message");
                continue;
            }
            for handler in handlers {
                if let Err(e) = handler.deliver(&msg).await {
                    warn!(channel = %msg.channel, error = %e, "outbound delivery failed");
                }
            }
        }
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MessageBus {
    /// Clones the message bus, sharing the same underlying queues and
    /// subscriber table.
    fn clone(&self) -> Self {
        Self {
            inbound_tx: self.inbound_tx.clone(),
            inbound_rx: Arc::clone(&self.inbound_rx),
            outbound_tx: self.outbound_tx.clone(),
            outbound_rx: Arc::clone(&self.outbound_rx),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}
