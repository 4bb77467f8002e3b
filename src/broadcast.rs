//! Subscriber registry and TCP push channel.
//!
//! The registry is the only state shared between the poll loop and the
//! connection handling tasks. It owns one unbounded sender per live
//! subscriber; the matching receiver is drained by that subscriber's
//! connection task, which writes each payload as a newline-terminated
//! UTF-8 text message.
//!
//! Nothing is persisted: after a restart every subscriber reconnects.

use crate::types::SubscriberId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

/// The set of currently connected live subscribers.
///
/// Mutated only by connect/disconnect events and by broadcast discovering
/// a closed channel.
pub struct SubscriberRegistry {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::UnboundedSender<String>>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a new subscriber, returning its id and the receiving end
    /// its connection task drains.
    pub async fn subscribe(&self) -> (SubscriberId, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().await.insert(id, tx);
        debug!("subscriber {} registered", id);
        (id, rx)
    }

    /// Remove a subscriber. Safe to call for an id already removed.
    pub async fn unsubscribe(&self, id: SubscriberId) {
        if self.subscribers.lock().await.remove(&id).is_some() {
            debug!("subscriber {} unregistered", id);
        }
    }

    /// Deliver `text` to every connected subscriber.
    ///
    /// Zero subscribers is a silent no-op. A subscriber whose channel is
    /// already closed is dropped from the registry; its failure never
    /// affects delivery to the others. Returns the number of subscribers
    /// the text was handed to.
    pub async fn broadcast(&self, text: &str) -> usize {
        let mut subscribers = self.subscribers.lock().await;
        if subscribers.is_empty() {
            return 0;
        }

        let mut closed = Vec::new();
        let mut delivered = 0;
        for (&id, tx) in subscribers.iter() {
            if tx.send(text.to_string()).is_ok() {
                delivered += 1;
            } else {
                closed.push(id);
            }
        }

        for id in closed {
            subscribers.remove(&id);
            debug!("subscriber {} dropped (channel closed)", id);
        }

        delivered
    }

    /// Number of currently connected subscribers
    pub async fn count(&self) -> usize {
        self.subscribers.lock().await.len()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// TCP server that accepts live subscribers.
///
/// Runs regardless of the configured sink; subscribers only receive text
/// when the sink is the broadcast target.
pub struct BroadcastServer {
    listener: TcpListener,
    registry: Arc<SubscriberRegistry>,
}

impl BroadcastServer {
    /// Bind the accept endpoint to a local address
    pub async fn bind(addr: &str, registry: Arc<SubscriberRegistry>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, registry })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept subscriber connections until the process terminates
    pub async fn run(self) -> std::io::Result<()> {
        info!("broadcast server listening on {}", self.local_addr()?);

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("subscriber connected from {}", addr);
                    let registry = Arc::clone(&self.registry);
                    tokio::spawn(handle_subscriber(stream, registry));
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
    }
}

/// Serve one subscriber connection until it closes.
///
/// A send half forwards broadcast payloads to the socket; a receive half
/// watches for EOF. Whichever finishes first aborts the other, and the
/// subscriber is unregistered on every exit path.
async fn handle_subscriber(stream: TcpStream, registry: Arc<SubscriberRegistry>) {
    let (id, mut rx) = registry.subscribe().await;
    let (reader, mut writer) = stream.into_split();

    let mut send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if writer.write_all(text.as_bytes()).await.is_err() {
                break;
            }
            if writer.write_all(b"\n").await.is_err() {
                break;
            }
            if let Err(e) = writer.flush().await {
                warn!("send to subscriber failed: {}", e);
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                // EOF or transport error: the remote side is gone
                Ok(0) | Err(_) => break,
                // Inbound payloads are ignored; the channel is push-only
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    registry.unsubscribe(id).await;
    debug!("subscriber {} disconnected", id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_no_subscribers_is_noop() {
        let registry = SubscriberRegistry::new();
        assert_eq!(registry.broadcast("hello").await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let registry = SubscriberRegistry::new();
        let (_id1, mut rx1) = registry.subscribe().await;
        let (_id2, mut rx2) = registry.subscribe().await;

        assert_eq!(registry.broadcast("hello").await, 2);
        assert_eq!(rx1.recv().await.unwrap(), "hello");
        assert_eq!(rx2.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_broadcast_drops_closed_subscriber() {
        let registry = SubscriberRegistry::new();
        let (_id1, mut rx1) = registry.subscribe().await;
        let (_id2, rx2) = registry.subscribe().await;
        drop(rx2);

        // The closed subscriber is removed; the live one still receives
        assert_eq!(registry.broadcast("hello").await, 1);
        assert_eq!(rx1.recv().await.unwrap(), "hello");
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes() {
        let registry = SubscriberRegistry::new();
        let (id, _rx) = registry.subscribe().await;
        assert_eq!(registry.count().await, 1);
        registry.unsubscribe(id).await;
        assert_eq!(registry.count().await, 0);
        // Idempotent
        registry.unsubscribe(id).await;
    }

    #[tokio::test]
    async fn test_subscriber_ids_unique() {
        let registry = SubscriberRegistry::new();
        let (a, _rx_a) = registry.subscribe().await;
        let (b, _rx_b) = registry.subscribe().await;
        assert_ne!(a, b);
    }
}
