//! Shared node state, behind one coarse lock.
//!
//! Grounded on `freeq-server`'s pattern of a single `Arc<Node>` passed into
//! every task, with mutable state behind `parking_lot::Mutex` rather than
//! scattered `tokio::sync::Mutex`es — the critical sections here are all
//! synchronous bookkeeping, never an `.await`, so a blocking lock is the
//! right tool (see `freeq-server/src/server.rs`).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::dfs::{DfsState, ProbeOutcome};
use crate::neighbor::{NeighborTable, Peer};
use crate::seen::SeenFilter;
use crate::stats::{Statistics, StatsSnapshot};
use crate::wire::{Endpoint, SearchMode};

struct NodeState {
    neighbors: NeighborTable,
    seen: SeenFilter,
    dfs: DfsState,
    stats: Statistics,
    seqno: u64,
    default_ttl: u32,
}

/// All state for one running overlay node. Cheap to clone as an `Arc` into
/// every spawned task.
pub struct Node {
    self_endpoint: Endpoint,
    local_data: HashMap<String, String>,
    state: Mutex<NodeState>,
}

impl Node {
    pub fn new(self_endpoint: Endpoint, local_data: HashMap<String, String>, default_ttl: u32) -> Arc<Node> {
        Arc::new(Node {
            self_endpoint,
            local_data,
            state: Mutex::new(NodeState {
                neighbors: NeighborTable::new(),
                seen: SeenFilter::new(),
                dfs: DfsState::new(),
                stats: Statistics::new(),
                seqno: 1,
                default_ttl,
            }),
        })
    }

    pub fn self_endpoint(&self) -> &Endpoint {
        &self.self_endpoint
    }

    pub fn local_value(&self, key: &str) -> Option<String> {
        self.local_data.get(key).cloned()
    }

    pub fn list_neighbors(&self) -> Vec<Endpoint> {
        self.state.lock().neighbors.list()
    }

    pub fn neighbor_count(&self) -> usize {
        self.state.lock().neighbors.len()
    }

    pub fn pick_neighbor(&self, index: usize) -> Option<Peer> {
        self.state.lock().neighbors.pick(index)
    }

    pub fn get_peer(&self, endpoint: &Endpoint) -> Option<Peer> {
        self.state.lock().neighbors.get(endpoint)
    }

    pub fn peers_snapshot(&self) -> Vec<Peer> {
        self.state.lock().neighbors.snapshot()
    }

    pub fn default_ttl(&self) -> u32 {
        self.state.lock().default_ttl
    }

    pub fn set_default_ttl(&self, ttl: u32) {
        self.state.lock().default_ttl = ttl;
    }

    pub fn statistics_snapshot(&self) -> StatsSnapshot {
        self.state.lock().stats.snapshot()
    }

    pub fn record_search_seen(&self, mode: SearchMode) {
        self.state.lock().stats.record_seen(mode);
    }

    pub fn record_hop_count(&self, mode: SearchMode, hop_count: u32) {
        self.state.lock().stats.record_hop_count(mode, hop_count);
    }

    /// Peek the current sequence number without consuming it. Per §3, the
    /// counter only advances after a successfully sent outbound message.
    pub fn peek_seqno(&self) -> u64 {
        self.state.lock().seqno
    }

    pub fn advance_seqno(&self) {
        self.state.lock().seqno += 1;
    }

    pub fn already_seen(&self, origin: &str, seqno: u64) -> bool {
        self.state.lock().seen.already_seen(origin, seqno)
    }

    /// Record a processed non-confirmation message in the Seen Filter,
    /// skipping our own origin (§4.3/§4.4).
    pub fn record_seen(&self, origin: &Endpoint, seqno: u64) {
        if origin == &self.self_endpoint {
            return;
        }
        self.state.lock().seen.record(&origin.to_string(), seqno);
    }

    /// Reset depth-first state for a search this node is initiating.
    /// Returns the chosen first-hop Peer, if any neighbor exists.
    pub fn dfs_initiate(&self) -> Option<Peer> {
        let mut state = self.state.lock();
        let peer_endpoints = state.neighbors.list();
        let chosen = state.dfs.reset_for_initiate(&self.self_endpoint, peer_endpoints)?;
        state.neighbors.get(&chosen)
    }

    /// Apply the BP transition rules for a probe arriving from `previous`.
    pub fn dfs_on_probe(&self, previous: &Endpoint, already_seen: bool) -> ProbeOutcome {
        let mut state = self.state.lock();
        let current_peers = state.neighbors.list();
        state
            .dfs
            .on_probe(&self.self_endpoint, previous, already_seen, current_peers)
    }

    /// §4.2 `add`: dial out to `endpoint` reactively (e.g. on inbound
    /// HELLO). A no-op, logged, if already known.
    pub async fn add_neighbor(self: &Arc<Self>, endpoint: Endpoint) {
        if self.state.lock().neighbors.contains(&endpoint) {
            tracing::debug!(peer = %endpoint, "neighbor already known, ignoring");
            return;
        }
        tracing::info!(peer = %endpoint, "dialing neighbor");
        match crate::connection::connect_peer(endpoint.clone(), self.clone()).await {
            Ok(peer) => {
                self.state.lock().neighbors.insert(peer);
                tracing::info!(peer = %endpoint, "neighbor added");
            }
            Err(e) => {
                tracing::warn!(peer = %endpoint, error = %e, "failed to connect to neighbor");
            }
        }
    }

    /// §4.2 `connect_initial`: dial every bootstrap endpoint with the
    /// bounded connect timeout, sending HELLO on each success.
    pub async fn connect_initial(self: &Arc<Self>, endpoints: Vec<Endpoint>) {
        for endpoint in endpoints {
            if self.state.lock().neighbors.contains(&endpoint) {
                continue;
            }
            tracing::info!(peer = %endpoint, "dialing bootstrap neighbor");
            match crate::connection::connect_peer_with_timeout(endpoint.clone(), self.clone()).await {
                Ok(peer) => {
                    if let Err(e) = crate::control::send_hello(self, &peer).await {
                        tracing::warn!(peer = %endpoint, error = %e, "failed to send initial HELLO");
                    }
                    self.state.lock().neighbors.insert(peer);
                }
                Err(e) => {
                    tracing::warn!(peer = %endpoint, error = %e, "failed to connect to bootstrap neighbor");
                }
            }
        }
    }

    /// §4.2 `remove`: drop the Peer (closing its connection) and forget its
    /// Seen Filter entry. A no-op, logged, if not present.
    pub fn remove_neighbor(&self, endpoint: &Endpoint) {
        let mut state = self.state.lock();
        if state.neighbors.remove(endpoint).is_none() {
            tracing::debug!(peer = %endpoint, "neighbor not in table, ignoring removal");
            return;
        }
        state.seen.forget(&endpoint.to_string());
        tracing::info!(peer = %endpoint, "neighbor removed");
    }

    /// Called by a peer's reader task when its connection drops on its own
    /// (EOF or reset), as opposed to an explicit BYE-driven removal.
    pub fn remove_neighbor_after_disconnect(&self, endpoint: &Endpoint) {
        let mut state = self.state.lock();
        if state.neighbors.remove(endpoint).is_some() {
            state.seen.forget(&endpoint.to_string());
            tracing::info!(peer = %endpoint, "neighbor connection dropped");
        }
    }
}
