//! Neighbor table: the set of peers this node has dialed out to.
//!
//! Per §4.2 (grounded on `node.py`'s `add_neighbor`/`delete_neighbor`), an
//! entry here is created by *this* node dialing *out* to a peer — on
//! bootstrap, or reactively when that peer's HELLO arrives on some inbound
//! connection. An accepted inbound connection does not, by itself, create
//! an entry; only a successful outbound dial does. This mirrors the
//! original's asymmetric socket pairing rather than unifying the two
//! directions into one handle.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::wire::{Endpoint, WireMessage};

#[derive(Debug, thiserror::Error)]
#[error("peer connection closed")]
pub struct PeerClosed;

/// A live outbound connection to one neighbor. Outbound writes go through
/// an mpsc channel to a dedicated writer task, so `Peer` handles are cheap
/// to clone into a forwarding snapshot (§5) without fighting over a lock
/// held across an `.await`.
pub struct PeerInner {
    pub endpoint: Endpoint,
    tx: mpsc::Sender<String>,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
}

pub type Peer = Arc<PeerInner>;

impl PeerInner {
    pub fn new(
        endpoint: Endpoint,
        tx: mpsc::Sender<String>,
        reader_task: JoinHandle<()>,
        writer_task: JoinHandle<()>,
    ) -> Peer {
        Arc::new(Self {
            endpoint,
            tx,
            reader_task,
            writer_task,
        })
    }

    pub async fn send(&self, msg: &WireMessage) -> Result<(), PeerClosed> {
        self.send_line(msg.encode()).await
    }

    pub async fn send_line(&self, line: String) -> Result<(), PeerClosed> {
        self.tx.send(line).await.map_err(|_| PeerClosed)
    }
}

impl Drop for PeerInner {
    fn drop(&mut self) {
        self.reader_task.abort();
        self.writer_task.abort();
    }
}

/// Insertion-ordered endpoint → Peer map, so a stable numeric index exists
/// for console selection (§3).
#[derive(Default)]
pub struct NeighborTable {
    order: Vec<Endpoint>,
    peers: HashMap<Endpoint, Peer>,
}

impl NeighborTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, endpoint: &Endpoint) -> bool {
        self.peers.contains_key(endpoint)
    }

    pub fn insert(&mut self, peer: Peer) {
        if !self.peers.contains_key(&peer.endpoint) {
            self.order.push(peer.endpoint.clone());
        }
        self.peers.insert(peer.endpoint.clone(), peer);
    }

    pub fn remove(&mut self, endpoint: &Endpoint) -> Option<Peer> {
        let removed = self.peers.remove(endpoint);
        if removed.is_some() {
            self.order.retain(|ep| ep != endpoint);
        }
        removed
    }

    pub fn get(&self, endpoint: &Endpoint) -> Option<Peer> {
        self.peers.get(endpoint).cloned()
    }

    /// Endpoints in insertion order, with stable indices for console selection.
    pub fn list(&self) -> Vec<Endpoint> {
        self.order.clone()
    }

    pub fn pick(&self, index: usize) -> Option<Peer> {
        self.order.get(index).and_then(|ep| self.peers.get(ep)).cloned()
    }

    /// A snapshot of every live peer, for forwarding decisions. Cloning the
    /// `Arc<PeerInner>` handles here and releasing the node lock before the
    /// sends is what §5 requires.
    pub fn snapshot(&self) -> Vec<Peer> {
        self.order
            .iter()
            .filter_map(|ep| self.peers.get(ep).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn fake_peer(endpoint: Endpoint) -> Peer {
        let (tx, mut rx) = mpsc::channel::<String>(1);
        let reader_task = tokio::spawn(async move {});
        let writer_task = tokio::spawn(async move {
            while rx.recv().await.is_some() {}
        });
        PeerInner::new(endpoint, tx, reader_task, writer_task)
    }

    #[tokio::test]
    async fn insert_preserves_order_and_is_idempotent() {
        let mut table = NeighborTable::new();
        let a = Endpoint::new("127.0.0.1", 1);
        let b = Endpoint::new("127.0.0.1", 2);
        table.insert(fake_peer(a.clone()));
        table.insert(fake_peer(b.clone()));
        table.insert(fake_peer(a.clone()));
        assert_eq!(table.list(), vec![a, b]);
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn remove_clears_entry_and_order() {
        let mut table = NeighborTable::new();
        let a = Endpoint::new("127.0.0.1", 1);
        table.insert(fake_peer(a.clone()));
        assert!(table.remove(&a).is_some());
        assert!(!table.contains(&a));
        assert!(table.list().is_empty());
    }

    #[tokio::test]
    async fn pick_returns_none_out_of_range() {
        let table = NeighborTable::new();
        assert!(table.pick(0).is_none());
    }
}
