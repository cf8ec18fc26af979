//! Search engine: initiation and forwarding for all three strategies, per
//! §4.5. Grounded on `node.py`'s `start_search_*` / `handle_message_search`
//! / `handle_message_value` family.

use std::sync::Arc;

use rand::Rng;

use crate::dfs::ProbeOutcome;
use crate::neighbor::Peer;
use crate::node::Node;
use crate::wire::{Endpoint, SearchMode, WireMessage};

/// Entry point for a console-initiated search. Checks local data first, per
/// §4.5 step 0, before picking a strategy.
pub async fn start_search(node: &Arc<Node>, mode: SearchMode, key: String) {
    if let Some(value) = node.local_value(&key) {
        tracing::info!(%key, %value, "value found locally, no search needed");
        return;
    }
    match mode {
        SearchMode::Flooding => initiate_flooding(node, key).await,
        SearchMode::RandomWalk => initiate_random_walk(node, key).await,
        SearchMode::DepthFirst => initiate_depth_first(node, key).await,
    }
}

async fn initiate_flooding(node: &Arc<Node>, key: String) {
    let peers = node.peers_snapshot();
    if peers.is_empty() {
        tracing::info!(%key, "flooding: no neighbors, search not sent");
        return;
    }
    let seqno = node.peek_seqno();
    let ttl = node.default_ttl() as i64;
    for peer in &peers {
        let msg = search_message(node, &key, seqno, ttl, SearchMode::Flooding, 1);
        if let Err(e) = peer.send(&msg).await {
            tracing::warn!(peer = %peer.endpoint, error = %e, "failed to send flooding search");
        }
    }
    node.advance_seqno();
}

async fn initiate_random_walk(node: &Arc<Node>, key: String) {
    let peers = node.peers_snapshot();
    let Some(peer) = pick_random_peer(&peers) else {
        tracing::info!(%key, "random walk: no neighbors, search not sent");
        return;
    };
    let seqno = node.peek_seqno();
    let ttl = node.default_ttl() as i64;
    let msg = search_message(node, &key, seqno, ttl, SearchMode::RandomWalk, 1);
    match peer.send(&msg).await {
        Ok(()) => node.advance_seqno(),
        Err(e) => tracing::warn!(peer = %peer.endpoint, error = %e, "failed to send random-walk search"),
    }
}

async fn initiate_depth_first(node: &Arc<Node>, key: String) {
    let Some(peer) = node.dfs_initiate() else {
        tracing::info!(%key, "depth-first: no neighbors, search not sent");
        return;
    };
    let seqno = node.peek_seqno();
    let ttl = node.default_ttl() as i64;
    let msg = search_message(node, &key, seqno, ttl, SearchMode::DepthFirst, 1);
    match peer.send(&msg).await {
        Ok(()) => node.advance_seqno(),
        Err(e) => tracing::warn!(peer = %peer.endpoint, error = %e, "failed to send depth-first search"),
    }
}

fn search_message(node: &Node, key: &str, seqno: u64, ttl: i64, mode: SearchMode, hop_count: u32) -> WireMessage {
    WireMessage::Search {
        origin: node.self_endpoint().clone(),
        seqno,
        ttl,
        mode,
        last_hop_port: node.self_endpoint().port,
        key: key.to_string(),
        hop_count,
    }
}

/// Handle an inbound SEARCH: local hit, TTL exhaustion, or per-mode
/// forwarding (§4.5 steps 1-3).
pub async fn handle_search(node: &Arc<Node>, msg: &WireMessage, sender_ip: &str) {
    let WireMessage::Search {
        origin,
        seqno,
        ttl,
        mode,
        last_hop_port,
        key,
        hop_count,
    } = msg
    else {
        unreachable!("handle_search called with a non-Search message");
    };
    let (origin, seqno, ttl, mode, last_hop_port, key, hop_count) =
        (origin.clone(), *seqno, *ttl, *mode, *last_hop_port, key.clone(), *hop_count);

    node.record_search_seen(mode);

    if let Some(value) = node.local_value(&key) {
        tracing::info!(%key, "key found locally, replying with VAL");
        reply_with_value(node, &origin, mode, &key, &value, hop_count).await;
        return;
    }

    let remaining_ttl = ttl - 1;
    if remaining_ttl <= 0 {
        tracing::debug!(%key, %origin, "ttl exhausted, discarding search");
        return;
    }
    let next_hop_count = hop_count + 1;

    match mode {
        SearchMode::Flooding => {
            forward_flooding(node, &origin, seqno, remaining_ttl, &key, next_hop_count, sender_ip, last_hop_port).await
        }
        SearchMode::RandomWalk => {
            forward_random_walk(node, &origin, seqno, remaining_ttl, &key, next_hop_count, sender_ip, last_hop_port)
                .await
        }
        SearchMode::DepthFirst => {
            forward_depth_first(node, &origin, seqno, remaining_ttl, &key, next_hop_count, sender_ip, last_hop_port)
                .await
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn forward_flooding(
    node: &Arc<Node>,
    origin: &Endpoint,
    seqno: u64,
    ttl: i64,
    key: &str,
    hop_count: u32,
    sender_ip: &str,
    last_hop_port: u16,
) {
    if origin == node.self_endpoint() || node.already_seen(&origin.to_string(), seqno) {
        tracing::debug!(%key, "flooding: self-origin or duplicate, dropping");
        return;
    }
    let sender = Endpoint::new(sender_ip, last_hop_port);
    let targets: Vec<Peer> = node
        .peers_snapshot()
        .into_iter()
        .filter(|p| p.endpoint != sender)
        .collect();
    for peer in &targets {
        let out = WireMessage::Search {
            origin: origin.clone(),
            seqno,
            ttl,
            mode: SearchMode::Flooding,
            last_hop_port: node.self_endpoint().port,
            key: key.to_string(),
            hop_count,
        };
        if let Err(e) = peer.send(&out).await {
            tracing::warn!(peer = %peer.endpoint, error = %e, "failed to forward flooding search");
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn forward_random_walk(
    node: &Arc<Node>,
    origin: &Endpoint,
    seqno: u64,
    ttl: i64,
    key: &str,
    hop_count: u32,
    sender_ip: &str,
    last_hop_port: u16,
) {
    let sender = Endpoint::new(sender_ip, last_hop_port);
    let mut peers = node.peers_snapshot();
    if peers.len() > 1 {
        peers.retain(|p| p.endpoint != sender);
    }
    let Some(target) = pick_random_peer(&peers) else {
        tracing::debug!(%key, %origin, "random walk: no peer to forward to, dropping");
        return;
    };
    let out = WireMessage::Search {
        origin: origin.clone(),
        seqno,
        ttl,
        mode: SearchMode::RandomWalk,
        last_hop_port: node.self_endpoint().port,
        key: key.to_string(),
        hop_count,
    };
    if let Err(e) = target.send(&out).await {
        tracing::warn!(peer = %target.endpoint, error = %e, "failed to forward random-walk search");
    }
}

#[allow(clippy::too_many_arguments)]
async fn forward_depth_first(
    node: &Arc<Node>,
    origin: &Endpoint,
    seqno: u64,
    ttl: i64,
    key: &str,
    hop_count: u32,
    sender_ip: &str,
    last_hop_port: u16,
) {
    let previous = Endpoint::new(sender_ip, last_hop_port);
    if node.get_peer(&previous).is_none() {
        tracing::warn!(peer = %previous, "depth-first probe from an unregistered neighbor, discarding");
        return;
    }

    let already_seen = node.already_seen(&origin.to_string(), seqno);
    let outcome = node.dfs_on_probe(&previous, already_seen);

    let target = match outcome {
        ProbeOutcome::NotFound => {
            tracing::info!(%key, %origin, "depth-first: search exhausted, key not found");
            return;
        }
        ProbeOutcome::Bounce(target) | ProbeOutcome::BackTrack(target) | ProbeOutcome::Advance(target) => target,
    };

    let Some(peer) = node.get_peer(&target) else {
        tracing::warn!(peer = %target, "depth-first target is not in the neighbor table");
        return;
    };
    let out = WireMessage::Search {
        origin: origin.clone(),
        seqno,
        ttl,
        mode: SearchMode::DepthFirst,
        last_hop_port: node.self_endpoint().port,
        key: key.to_string(),
        hop_count,
    };
    if let Err(e) = peer.send(&out).await {
        tracing::warn!(peer = %target, error = %e, "failed to forward depth-first probe");
    }
}

async fn reply_with_value(node: &Arc<Node>, origin: &Endpoint, mode: SearchMode, key: &str, value: &str, hop_count: u32) {
    let seqno = node.peek_seqno();
    let msg = WireMessage::Val {
        origin: node.self_endpoint().clone(),
        seqno,
        mode,
        key: key.to_string(),
        value: value.to_string(),
        hop_count,
    };

    if let Some(peer) = node.get_peer(origin) {
        match peer.send(&msg).await {
            Ok(()) => node.advance_seqno(),
            Err(e) => tracing::warn!(peer = %origin, error = %e, "failed to send VAL over existing peer connection"),
        }
        return;
    }

    match crate::connection::send_once(origin, &msg.encode()).await {
        Ok(()) => node.advance_seqno(),
        Err(e) => tracing::warn!(peer = %origin, error = %e, "failed to send VAL over one-shot connection"),
    }
}

/// Handle an inbound VAL: record the hop count against this search mode's
/// statistics and surface the result (§4.5 step 4, §4.7).
pub fn handle_val(node: &Arc<Node>, msg: &WireMessage) {
    let WireMessage::Val {
        mode,
        key,
        value,
        hop_count,
        ..
    } = msg
    else {
        unreachable!("handle_val called with a non-Val message");
    };
    if node.local_value(key).is_some() {
        tracing::info!(%key, "value already present locally, dropping VAL");
        return;
    }
    tracing::info!(%key, %value, hop_count, "value received");
    node.record_hop_count(*mode, *hop_count);
}

fn pick_random_peer(peers: &[Peer]) -> Option<Peer> {
    if peers.is_empty() {
        return None;
    }
    let idx = rand::thread_rng().gen_range(0..peers.len());
    Some(peers[idx].clone())
}
