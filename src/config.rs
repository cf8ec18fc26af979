//! CLI argument parsing, per §4.8.
//!
//! Grounded on `freeq-bots/src/main.rs`'s derive-style `clap::Parser`
//! usage; `node.py`'s `create_node` is the original's positional-argument
//! equivalent (`ip:port [neighbors_file] [data_file]`), kept here as named
//! flags instead since that is how this pack's CLIs are shaped.

use std::path::PathBuf;

use clap::Parser;

use crate::wire::Endpoint;

#[derive(Parser, Debug)]
#[command(name = "p2p-node", about = "Unstructured P2P overlay node")]
pub struct Args {
    /// This node's own listen address, `ip:port`.
    pub listen: String,

    /// File of bootstrap neighbor addresses, one `ip:port` per line.
    #[arg(long)]
    pub neighbors_file: Option<PathBuf>,

    /// File of local key/value pairs, one `key value` per line.
    #[arg(long)]
    pub data_file: Option<PathBuf>,

    /// Default TTL applied to searches this node initiates.
    #[arg(long, default_value_t = 7)]
    pub default_ttl: u32,
}

impl Args {
    pub fn listen_endpoint(&self) -> anyhow::Result<Endpoint> {
        let endpoint: Endpoint = self.listen.parse()?;
        validate_endpoint(&endpoint)?;
        Ok(endpoint)
    }
}

/// Mirrors `utils.is_valid_ip` / `utils.is_valid_port`: reject malformed
/// dotted-quad IPs and out-of-range ports up front, before any socket is
/// opened.
pub fn validate_endpoint(endpoint: &Endpoint) -> anyhow::Result<()> {
    let octets: Vec<&str> = endpoint.ip.split('.').collect();
    let valid_ip = octets.len() == 4 && octets.iter().all(|o| o.parse::<u8>().is_ok());
    if !valid_ip {
        anyhow::bail!("invalid IPv4 address: {}", endpoint.ip);
    }
    if endpoint.port == 0 {
        anyhow::bail!("invalid port: {}", endpoint.port);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_dotted_quad() {
        let ep = Endpoint::new("not-an-ip", 5000);
        assert!(validate_endpoint(&ep).is_err());
    }

    #[test]
    fn accepts_a_plain_dotted_quad() {
        let ep = Endpoint::new("127.0.0.1", 5000);
        assert!(validate_endpoint(&ep).is_ok());
    }
}
