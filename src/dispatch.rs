//! Routes a decoded wire message to the control-plane or search-engine
//! handler for its operation, independent of which connection — a
//! registered peer or a bare unregistered inbound socket — it arrived on.

use std::sync::Arc;

use crate::control;
use crate::node::Node;
use crate::search;
use crate::wire::WireMessage;

pub async fn handle_message(node: &Arc<Node>, msg: &WireMessage, sender_ip: &str) {
    match msg {
        WireMessage::Hello { origin, .. } => control::handle_hello(node, origin).await,
        WireMessage::Bye { origin, .. } => control::handle_bye(node, origin),
        WireMessage::Search { .. } => search::handle_search(node, msg, sender_ip).await,
        WireMessage::Val { .. } => search::handle_val(node, msg),
    }
}
