//! Connection manager: the accept loop, and one reader/writer task pair per
//! live TCP connection.
//!
//! Grounded on `freeq-server/src/s2s.rs`'s `handle_s2s_connection`: split
//! the stream, run a dedicated writer task fed by an mpsc channel so
//! outbound sends never block on a peer's read side, and a reader task
//! that decodes line by line. Unlike `s2s.rs`'s symmetric peer set, not
//! every accepted connection here becomes a `Peer` — only ones reactively
//! registered through a HELLO (§4.2, §4.6).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::neighbor::{Peer, PeerInner};
use crate::node::Node;
use crate::wire::{self, Endpoint};

/// Bootstrap connect timeout, per §4.2.
const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

const WRITER_CHANNEL_CAPACITY: usize = 64;

/// Dial `endpoint` with no explicit timeout, used by the reactive `add()` path.
pub async fn dial(endpoint: &Endpoint) -> std::io::Result<TcpStream> {
    TcpStream::connect((endpoint.ip.as_str(), endpoint.port)).await
}

async fn dial_with_timeout(endpoint: &Endpoint) -> std::io::Result<TcpStream> {
    match tokio::time::timeout(CONNECT_TIMEOUT, dial(endpoint)).await {
        Ok(result) => result,
        Err(_) => Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out")),
    }
}

/// Run the accept loop for the node's entire lifetime.
pub async fn accept_loop(listener: TcpListener, node: Arc<Node>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tracing::info!(peer = %addr, "accepted inbound connection");
                tokio::spawn(handle_inbound(stream, addr, node.clone()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
            }
        }
    }
}

fn spawn_writer(mut write_half: OwnedWriteHalf, label: String) -> (mpsc::Sender<String>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<String>(WRITER_CHANNEL_CAPACITY);
    let task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if let Err(e) = write_half.write_all(format!("{line}\n").as_bytes()).await {
                tracing::warn!(conn = %label, error = %e, "write failed, closing connection");
                break;
            }
        }
    });
    (tx, task)
}

/// Handle a raw accepted connection that is not (yet) a registered
/// neighbor. It gets its own reader loop and answers confirmations on its
/// own write half; it only becomes a [`Peer`] if its HELLO triggers a
/// reactive dial-back (§4.2, §4.6).
async fn handle_inbound(stream: TcpStream, addr: SocketAddr, node: Arc<Node>) {
    let sender_ip = addr.ip().to_string();
    let (read_half, write_half) = stream.into_split();
    let (tx, writer_task) = spawn_writer(write_half, format!("inbound {addr}"));

    read_loop(read_half, &sender_ip, &node, &tx).await;

    writer_task.abort();
    tracing::info!(peer = %addr, "inbound connection handler exiting");
}

/// Shared per-line decode/dispatch/confirm loop, used both by unregistered
/// inbound connections and by a registered peer's reader task.
async fn read_loop(read_half: OwnedReadHalf, sender_ip: &str, node: &Arc<Node>, tx: &mpsc::Sender<String>) {
    let mut lines = BufReader::new(read_half).lines();
    let mut msg_count: u64 = 0;
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!(peer = sender_ip, msg_count, "connection closed (eof)");
                return;
            }
            Err(e) => {
                tracing::warn!(peer = sender_ip, error = %e, "read error");
                return;
            }
        };
        msg_count += 1;

        if let Some(op) = wire::confirmation_op(&line) {
            tracing::debug!(peer = sender_ip, op, "confirmation received");
            continue;
        }

        let msg = match wire::decode(&line) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(peer = sender_ip, error = %e, %line, "malformed message, discarding");
                continue;
            }
        };

        crate::dispatch::handle_message(node, &msg, sender_ip).await;

        if tx.send(wire::confirmation_for(&msg)).await.is_err() {
            tracing::warn!(peer = sender_ip, "failed to send confirmation, writer gone");
        }
        node.record_seen(msg.origin(), msg.seqno());
    }
}

/// Dial `endpoint` and wire it up as a registered [`Peer`] sharing the same
/// dispatcher as inbound connections.
pub async fn connect_peer(endpoint: Endpoint, node: Arc<Node>) -> std::io::Result<Peer> {
    let stream = dial(&endpoint).await?;
    Ok(spawn_peer(stream, endpoint, node))
}

pub async fn connect_peer_with_timeout(endpoint: Endpoint, node: Arc<Node>) -> std::io::Result<Peer> {
    let stream = dial_with_timeout(&endpoint).await?;
    Ok(spawn_peer(stream, endpoint, node))
}

fn spawn_peer(stream: TcpStream, endpoint: Endpoint, node: Arc<Node>) -> Peer {
    let (read_half, write_half) = stream.into_split();
    let (tx, writer_task) = spawn_writer(write_half, endpoint.to_string());
    let reader_endpoint = endpoint.clone();
    let reader_tx = tx.clone();
    let reader_task = tokio::spawn(async move {
        let sender_ip = reader_endpoint.ip.clone();
        read_loop(read_half, &sender_ip, &node, &reader_tx).await;
        node.remove_neighbor_after_disconnect(&reader_endpoint);
    });
    PeerInner::new(endpoint, tx, reader_task, writer_task)
}

/// Dial a one-shot connection to `endpoint`, send `line`, and close it.
/// Used for a VAL reply when no existing Peer reaches ORIGIN (§4.5).
pub async fn send_once(endpoint: &Endpoint, line: &str) -> std::io::Result<()> {
    let mut stream = dial(endpoint).await?;
    stream.write_all(format!("{line}\n").as_bytes()).await
}
