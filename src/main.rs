use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use p2p_node::config::Args;
use p2p_node::node::Node;
use p2p_node::{bootstrap, connection, console};

#[tokio::main]
async fn main() -> Result<()> {
    let json_logs = std::env::var("P2P_NODE_LOG_JSON").unwrap_or_default() == "1";
    let filter = EnvFilter::try_from_env("P2P_NODE_LOG").unwrap_or_else(|_| EnvFilter::new("p2p_node=info"));
    if json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let args = Args::parse();
    let self_endpoint = args.listen_endpoint().context("invalid listen address")?;

    let neighbors = match &args.neighbors_file {
        Some(path) => bootstrap::load_neighbors(path)?,
        None => Vec::new(),
    };
    let local_data = match &args.data_file {
        Some(path) => bootstrap::load_data(path)?,
        None => Default::default(),
    };

    tracing::info!(listen = %self_endpoint, neighbors = neighbors.len(), keys = local_data.len(), "starting node");

    let node = Node::new(self_endpoint.clone(), local_data, args.default_ttl);

    let listener = TcpListener::bind((self_endpoint.ip.as_str(), self_endpoint.port))
        .await
        .with_context(|| format!("binding listener on {self_endpoint}"))?;
    tokio::spawn(connection::accept_loop(listener, node.clone()));

    node.connect_initial(neighbors).await;

    console::run(node).await;
    Ok(())
}
