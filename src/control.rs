//! HELLO/BYE membership primitives, per §4.6.
//!
//! Grounded on `node.py`'s `handle_message_hello` / `handle_message_bye` /
//! `send_hello` / `send_bye`: HELLO triggers a reactive dial-back through
//! the Neighbor Table, BYE simply tears the entry down. Neither is ever
//! forwarded past one hop.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::neighbor::Peer;
use crate::node::Node;
use crate::wire::{Endpoint, WireMessage};

pub async fn handle_hello(node: &Arc<Node>, origin: &Endpoint) {
    node.add_neighbor(origin.clone()).await;
}

pub fn handle_bye(node: &Arc<Node>, origin: &Endpoint) {
    node.remove_neighbor(origin);
}

/// Craft and send a HELLO over `peer`, advancing the sequence counter only
/// on success (§3).
pub async fn send_hello(node: &Node, peer: &Peer) -> Result<()> {
    let seqno = node.peek_seqno();
    let msg = WireMessage::Hello {
        origin: node.self_endpoint().clone(),
        seqno,
    };
    peer.send(&msg).await.context("sending HELLO")?;
    node.advance_seqno();
    Ok(())
}

/// Craft and send a BYE over `peer`, advancing the sequence counter only
/// on success (§3).
pub async fn send_bye(node: &Node, peer: &Peer) -> Result<()> {
    let seqno = node.peek_seqno();
    let msg = WireMessage::Bye {
        origin: node.self_endpoint().clone(),
        seqno,
    };
    peer.send(&msg).await.context("sending BYE")?;
    node.advance_seqno();
    Ok(())
}
