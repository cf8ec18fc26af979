//! Interactive console menu, per §4.10.
//!
//! Grounded on `node.py`'s `show_menu` / `handle_menu_action` family: a
//! numbered menu, read one line at a time, with certain options prompting
//! for a follow-up line (neighbor index, search key, new TTL). The blocking
//! stdin read runs on its own thread via `spawn_blocking`, feeding an async
//! loop through an mpsc channel so the rest of the node keeps running
//! independent of what the operator is doing at the keyboard.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::control;
use crate::node::Node;
use crate::search;
use crate::wire::SearchMode;

enum Prompt {
    MenuOption,
    NeighborIndex,
    SearchKey(SearchMode),
    NewTtl,
}

/// Drive the console until the operator chooses to quit, then send BYE to
/// every neighbor before returning.
pub async fn run(node: Arc<Node>) {
    let (tx, mut rx) = mpsc::channel::<String>(16);
    tokio::task::spawn_blocking(move || stdin_loop(tx));

    print_menu();
    let mut awaiting = Prompt::MenuOption;
    while let Some(line) = rx.recv().await {
        let line = line.trim().to_string();
        awaiting = match awaiting {
            Prompt::MenuOption => handle_menu_option(&node, &line).await,
            Prompt::NeighborIndex => {
                handle_neighbor_index(&node, &line).await;
                print_menu();
                Prompt::MenuOption
            }
            Prompt::SearchKey(mode) => {
                handle_search_key(&node, mode, &line).await;
                print_menu();
                Prompt::MenuOption
            }
            Prompt::NewTtl => {
                handle_new_ttl(&node, &line);
                print_menu();
                Prompt::MenuOption
            }
        };
        if matches!(awaiting, Prompt::MenuOption) && should_quit() {
            return;
        }
    }
}

fn stdin_loop(tx: mpsc::Sender<String>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(line) => {
                if tx.blocking_send(line).is_err() {
                    return;
                }
            }
            Err(_) => return,
        }
    }
}

/// Set once `handle_menu_option` processes the quit command; checked right
/// after so the channel's blocking reader thread (which outlives the async
/// loop otherwise) doesn't keep the process alive.
static QUIT_REQUESTED: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

fn should_quit() -> bool {
    QUIT_REQUESTED.load(std::sync::atomic::Ordering::SeqCst)
}

async fn handle_menu_option(node: &Arc<Node>, line: &str) -> Prompt {
    let Ok(option) = line.parse::<u32>() else {
        println!("Invalid option");
        print_menu();
        return Prompt::MenuOption;
    };

    match option {
        0 => {
            show_neighbors(node);
            print_menu();
            Prompt::MenuOption
        }
        1 => {
            println!("Choose the neighbor:");
            show_neighbors(node);
            if node.neighbor_count() == 0 {
                print_menu();
                Prompt::MenuOption
            } else {
                Prompt::NeighborIndex
            }
        }
        2 => {
            println!("Enter the key to search for");
            Prompt::SearchKey(SearchMode::Flooding)
        }
        3 => {
            println!("Enter the key to search for");
            Prompt::SearchKey(SearchMode::RandomWalk)
        }
        4 => {
            println!("Enter the key to search for");
            Prompt::SearchKey(SearchMode::DepthFirst)
        }
        5 => {
            show_statistics(node);
            print_menu();
            Prompt::MenuOption
        }
        6 => {
            println!("Enter the new default TTL");
            Prompt::NewTtl
        }
        9 => {
            handle_quit(node).await;
            Prompt::MenuOption
        }
        _ => {
            println!("Invalid option");
            print_menu();
            Prompt::MenuOption
        }
    }
}

async fn handle_neighbor_index(node: &Arc<Node>, line: &str) {
    let Ok(index) = line.parse::<usize>() else {
        println!("Invalid neighbor");
        return;
    };
    let Some(peer) = node.pick_neighbor(index) else {
        println!("Invalid neighbor");
        return;
    };
    if let Err(e) = control::send_hello(node, &peer).await {
        tracing::warn!(peer = %peer.endpoint, error = %e, "failed to send HELLO from console");
    }
}

async fn handle_search_key(node: &Arc<Node>, mode: SearchMode, key: &str) {
    if key.is_empty() || key.contains(' ') {
        println!("Invalid key");
        return;
    }
    if let Some(value) = node.local_value(key) {
        println!("Value in local table");
        println!("    key: {key} value: {value}");
        return;
    }
    search::start_search(node, mode, key.to_string()).await;
}

fn handle_new_ttl(node: &Arc<Node>, line: &str) {
    match line.parse::<u32>() {
        Ok(ttl) if ttl > 0 => node.set_default_ttl(ttl),
        _ => println!("Invalid TTL value"),
    }
}

async fn handle_quit(node: &Arc<Node>) {
    for peer in node.peers_snapshot() {
        if let Err(e) = control::send_bye(node, &peer).await {
            tracing::warn!(peer = %peer.endpoint, error = %e, "failed to send BYE on quit");
        }
    }
    QUIT_REQUESTED.store(true, std::sync::atomic::Ordering::SeqCst);
}

fn show_neighbors(node: &Arc<Node>) {
    let neighbors = node.list_neighbors();
    println!("{} neighbor(s) in the table", neighbors.len());
    for (idx, endpoint) in neighbors.iter().enumerate() {
        println!("    [{idx}] {endpoint}");
    }
}

fn show_statistics(node: &Arc<Node>) {
    let snapshot = node.statistics_snapshot();
    for (label, mode) in [
        ("flooding", &snapshot.flooding),
        ("random walk", &snapshot.random_walk),
        ("depth-first", &snapshot.depth_first),
    ] {
        println!("{label}:");
        println!("    messages seen: {}", mode.messages_seen);
        println!("    mean hop count: {:.2}", mode.mean_hop_count);
        println!("    hop count stddev: {:.2}", mode.stddev_hop_count);
    }
}

fn print_menu() {
    println!(
        "\nChoose a command\n\
         [0] List neighbors\n\
         [1] HELLO\n\
         [2] SEARCH (flooding)\n\
         [3] SEARCH (random walk)\n\
         [4] SEARCH (depth-first)\n\
         [5] Statistics\n\
         [6] Change default TTL\n\
         [9] Quit"
    );
    let _ = io::stdout().flush();
}
