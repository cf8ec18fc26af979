//! End-to-end overlay tests: real TCP sockets on loopback, no mocks.
//!
//! Each node is a full `Node` driven by the crate's own `connection::accept_loop`,
//! exactly as `main.rs` wires one up, just bound to an OS-assigned port.

use std::collections::HashMap;
use std::time::Duration;

use p2p_node::connection;
use p2p_node::node::Node;
use p2p_node::wire::{Endpoint, SearchMode};
use tokio::net::TcpListener;

async fn spawn_node(local_data: HashMap<String, String>) -> (std::sync::Arc<Node>, Endpoint) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let endpoint = Endpoint::new(addr.ip().to_string(), addr.port());
    let node = Node::new(endpoint.clone(), local_data, 7);
    tokio::spawn(connection::accept_loop(listener, node.clone()));
    (node, endpoint)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn hello_handshake_adds_each_node_to_the_others_table() {
    let (a, a_ep) = spawn_node(HashMap::new()).await;
    let (b, b_ep) = spawn_node(HashMap::new()).await;

    a.connect_initial(vec![b_ep.clone()]).await;
    settle().await;

    assert!(a.list_neighbors().contains(&b_ep));
    assert!(b.list_neighbors().contains(&a_ep));
}

#[tokio::test]
async fn flooding_search_reaches_a_key_two_hops_away() {
    // A — B — C, key at C.
    let (a, _a_ep) = spawn_node(HashMap::new()).await;
    let (b, b_ep) = spawn_node(HashMap::new()).await;
    let (_c, c_ep) = spawn_node(HashMap::from([("foo".to_string(), "bar".to_string())])).await;

    a.connect_initial(vec![b_ep.clone()]).await;
    b.connect_initial(vec![c_ep.clone()]).await;
    settle().await;

    p2p_node::search::start_search(&a, SearchMode::Flooding, "foo".to_string()).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let snapshot = a.statistics_snapshot();
    assert_eq!(snapshot.flooding.messages_seen, 0, "A is the initiator, not a forwarder");
    let hops = a.statistics_snapshot().flooding.mean_hop_count;
    assert_eq!(hops, 2.0, "VAL should report 2 hops: A->B->C and back");
}

#[tokio::test]
async fn ttl_of_one_prevents_any_forward() {
    let (a, _a_ep) = spawn_node(HashMap::new()).await;
    let (b, b_ep) = spawn_node(HashMap::new()).await;
    let (_c, c_ep) = spawn_node(HashMap::from([("foo".to_string(), "bar".to_string())])).await;

    a.connect_initial(vec![b_ep.clone()]).await;
    b.connect_initial(vec![c_ep.clone()]).await;
    settle().await;

    a.set_default_ttl(1);
    p2p_node::search::start_search(&a, SearchMode::Flooding, "foo".to_string()).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(a.statistics_snapshot().flooding.mean_hop_count, 0.0, "no VAL should have returned");
}

#[tokio::test]
async fn bye_removes_the_neighbor_on_both_sides() {
    let (a, a_ep) = spawn_node(HashMap::new()).await;
    let (b, b_ep) = spawn_node(HashMap::new()).await;

    a.connect_initial(vec![b_ep.clone()]).await;
    settle().await;
    assert!(a.list_neighbors().contains(&b_ep));

    let peer = a.get_peer(&b_ep).unwrap();
    p2p_node::control::send_bye(&a, &peer).await.unwrap();
    settle().await;

    assert!(!b.list_neighbors().contains(&a_ep));
}

#[tokio::test]
async fn local_hit_answers_without_any_network_search() {
    let (a, _a_ep) = spawn_node(HashMap::from([("foo".to_string(), "bar".to_string())])).await;
    p2p_node::search::start_search(&a, SearchMode::Flooding, "foo".to_string()).await;
    settle().await;
    assert_eq!(a.statistics_snapshot().flooding.messages_seen, 0);
}
