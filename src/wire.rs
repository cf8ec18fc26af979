//! Wire format for the overlay's text protocol.
//!
//! Every record is a space-delimited ASCII line, newline-terminated on the
//! socket by the connection manager. Common prefix: `<ORIGIN> <SEQNO> <TTL>
//! <OP> ...`. Confirmations are a special case recognized by the `_OK`
//! suffix and carry no further structure:
//!
//! ```text
//! 127.0.0.1:5000 1 1 HELLO
//! 127.0.0.1:5000 3 99 SEARCH FL 5000 foo 1
//! 127.0.0.1:5001 1 98 VAL FL foo bar 2
//! HELLO_OK
//! ```

use std::fmt;
use std::str::FromStr;

/// An (ip, port) pair identifying a node's listen address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint {
    pub ip: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self { ip: ip.into(), port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ip, port) = s
            .rsplit_once(':')
            .ok_or_else(|| DecodeError::BadEndpoint(s.to_string()))?;
        let port: u16 = port
            .parse()
            .map_err(|_| DecodeError::BadEndpoint(s.to_string()))?;
        if ip.is_empty() || port == 0 {
            return Err(DecodeError::BadEndpoint(s.to_string()));
        }
        Ok(Endpoint::new(ip, port))
    }
}

/// Which search strategy a SEARCH/VAL record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
    Flooding,
    RandomWalk,
    DepthFirst,
}

impl SearchMode {
    fn as_wire(self) -> &'static str {
        match self {
            SearchMode::Flooding => "FL",
            SearchMode::RandomWalk => "RW",
            SearchMode::DepthFirst => "BP",
        }
    }

    fn from_wire(s: &str) -> Option<Self> {
        match s {
            "FL" => Some(SearchMode::Flooding),
            "RW" => Some(SearchMode::RandomWalk),
            "BP" => Some(SearchMode::DepthFirst),
            _ => None,
        }
    }

    /// Index into per-mode statistics arrays.
    pub fn index(self) -> usize {
        match self {
            SearchMode::Flooding => 0,
            SearchMode::RandomWalk => 1,
            SearchMode::DepthFirst => 2,
        }
    }

    pub const ALL: [SearchMode; 3] = [
        SearchMode::Flooding,
        SearchMode::RandomWalk,
        SearchMode::DepthFirst,
    ];
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// A fully parsed, typed wire record. Field extraction happens once, here,
/// at decode time — handlers never index into raw `parts[n]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    Hello {
        origin: Endpoint,
        seqno: u64,
    },
    Bye {
        origin: Endpoint,
        seqno: u64,
    },
    Search {
        origin: Endpoint,
        seqno: u64,
        ttl: i64,
        mode: SearchMode,
        last_hop_port: u16,
        key: String,
        hop_count: u32,
    },
    Val {
        origin: Endpoint,
        seqno: u64,
        mode: SearchMode,
        key: String,
        value: String,
        hop_count: u32,
    },
}

impl WireMessage {
    /// The operation name, as used for the `<OP>_OK` confirmation.
    pub fn op(&self) -> &'static str {
        match self {
            WireMessage::Hello { .. } => "HELLO",
            WireMessage::Bye { .. } => "BYE",
            WireMessage::Search { .. } => "SEARCH",
            WireMessage::Val { .. } => "VAL",
        }
    }

    pub fn origin(&self) -> &Endpoint {
        match self {
            WireMessage::Hello { origin, .. }
            | WireMessage::Bye { origin, .. }
            | WireMessage::Search { origin, .. }
            | WireMessage::Val { origin, .. } => origin,
        }
    }

    pub fn seqno(&self) -> u64 {
        match self {
            WireMessage::Hello { seqno, .. }
            | WireMessage::Bye { seqno, .. }
            | WireMessage::Search { seqno, .. }
            | WireMessage::Val { seqno, .. } => *seqno,
        }
    }

    /// Render the deterministic wire encoding of this message (no trailing newline).
    pub fn encode(&self) -> String {
        match self {
            WireMessage::Hello { origin, seqno } => format!("{origin} {seqno} 1 HELLO"),
            WireMessage::Bye { origin, seqno } => format!("{origin} {seqno} 1 BYE"),
            WireMessage::Search {
                origin,
                seqno,
                ttl,
                mode,
                last_hop_port,
                key,
                hop_count,
            } => format!(
                "{origin} {seqno} {ttl} SEARCH {mode} {last_hop_port} {key} {hop_count}"
            ),
            WireMessage::Val {
                origin,
                seqno,
                mode,
                key,
                value,
                hop_count,
            } => {
                // TTL is carried for wire-shape symmetry with SEARCH but is
                // never read back out: VAL is a terminal, unforwarded reply.
                format!("{origin} {seqno} 1 VAL {mode} {key} {value} {hop_count}")
            }
        }
    }
}

/// Returns the `<OP>` prefix of a confirmation line, if `line` is one.
///
/// A confirmation is recognized purely by its literal `_OK` suffix, per
/// §4.1; it carries no other structure and is never itself confirmed.
pub fn confirmation_op(line: &str) -> Option<&str> {
    line.strip_suffix("_OK")
}

/// Build the confirmation record for a received, non-confirmation message.
pub fn confirmation_for(msg: &WireMessage) -> String {
    format!("{}_OK", msg.op())
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed endpoint: {0}")]
    BadEndpoint(String),
    #[error("unknown operation: {0}")]
    UnknownOp(String),
    #[error("unknown search mode: {0}")]
    UnknownMode(String),
    #[error("malformed integer field in: {0}")]
    BadInteger(String),
    #[error("too few fields for {op}: {line}")]
    TooFewFields { op: String, line: String },
    #[error("record exceeds maximum line length")]
    TooLong,
}

/// Maximum accepted record length, per §4.1 framing.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Decode one already-framed (newline-stripped) line into a [`WireMessage`].
///
/// Callers must check [`confirmation_op`] first; this function does not
/// attempt to parse confirmations.
pub fn decode(line: &str) -> Result<WireMessage, DecodeError> {
    if line.len() > MAX_LINE_LEN {
        return Err(DecodeError::TooLong);
    }
    let parts: Vec<&str> = line.split(' ').collect();
    if parts.len() < 4 {
        return Err(DecodeError::TooFewFields {
            op: "?".to_string(),
            line: line.to_string(),
        });
    }

    let origin: Endpoint = parts[0].parse()?;
    let seqno: u64 = parts[1]
        .parse()
        .map_err(|_| DecodeError::BadInteger(line.to_string()))?;
    let op = parts[3];

    match op {
        "HELLO" => Ok(WireMessage::Hello { origin, seqno }),
        "BYE" => Ok(WireMessage::Bye { origin, seqno }),
        "SEARCH" => {
            if parts.len() < 8 {
                return Err(DecodeError::TooFewFields {
                    op: op.to_string(),
                    line: line.to_string(),
                });
            }
            let ttl: i64 = parts[2]
                .parse()
                .map_err(|_| DecodeError::BadInteger(line.to_string()))?;
            let mode = SearchMode::from_wire(parts[4])
                .ok_or_else(|| DecodeError::UnknownMode(parts[4].to_string()))?;
            let last_hop_port: u16 = parts[5]
                .parse()
                .map_err(|_| DecodeError::BadInteger(line.to_string()))?;
            let key = parts[6].to_string();
            let hop_count: u32 = parts[7]
                .parse()
                .map_err(|_| DecodeError::BadInteger(line.to_string()))?;
            Ok(WireMessage::Search {
                origin,
                seqno,
                ttl,
                mode,
                last_hop_port,
                key,
                hop_count,
            })
        }
        "VAL" => {
            if parts.len() < 8 {
                return Err(DecodeError::TooFewFields {
                    op: op.to_string(),
                    line: line.to_string(),
                });
            }
            let mode = SearchMode::from_wire(parts[4])
                .ok_or_else(|| DecodeError::UnknownMode(parts[4].to_string()))?;
            let key = parts[5].to_string();
            let value = parts[6].to_string();
            let hop_count: u32 = parts[7]
                .parse()
                .map_err(|_| DecodeError::BadInteger(line.to_string()))?;
            Ok(WireMessage::Val {
                origin,
                seqno,
                mode,
                key,
                value,
                hop_count,
            })
        }
        other => Err(DecodeError::UnknownOp(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_round_trips() {
        let ep: Endpoint = "127.0.0.1:5000".parse().unwrap();
        assert_eq!(ep.to_string(), "127.0.0.1:5000");
    }

    #[test]
    fn endpoint_rejects_garbage() {
        assert!("not-an-endpoint".parse::<Endpoint>().is_err());
        assert!("127.0.0.1:".parse::<Endpoint>().is_err());
    }

    #[test]
    fn hello_round_trips() {
        let msg = WireMessage::Hello {
            origin: Endpoint::new("127.0.0.1", 5000),
            seqno: 1,
        };
        let line = msg.encode();
        assert_eq!(line, "127.0.0.1:5000 1 1 HELLO");
        assert_eq!(decode(&line).unwrap(), msg);
    }

    #[test]
    fn search_round_trips() {
        let msg = WireMessage::Search {
            origin: Endpoint::new("127.0.0.1", 5000),
            seqno: 3,
            ttl: 99,
            mode: SearchMode::Flooding,
            last_hop_port: 5000,
            key: "foo".to_string(),
            hop_count: 1,
        };
        let line = msg.encode();
        assert_eq!(line, "127.0.0.1:5000 3 99 SEARCH FL 5000 foo 1");
        assert_eq!(decode(&line).unwrap(), msg);
    }

    #[test]
    fn val_round_trips() {
        let msg = WireMessage::Val {
            origin: Endpoint::new("127.0.0.1", 5000),
            seqno: 1,
            mode: SearchMode::RandomWalk,
            key: "foo".to_string(),
            value: "bar".to_string(),
            hop_count: 2,
        };
        let line = msg.encode();
        assert_eq!(decode(&line).unwrap(), msg);
    }

    #[test]
    fn confirmation_is_recognized_by_suffix_only() {
        assert_eq!(confirmation_op("HELLO_OK"), Some("HELLO"));
        assert_eq!(confirmation_op("SEARCH_OK"), Some("SEARCH"));
        assert_eq!(confirmation_op("HELLO"), None);
    }

    #[test]
    fn unknown_op_is_a_decode_error() {
        let err = decode("127.0.0.1:5000 1 1 NONSENSE").unwrap_err();
        assert_eq!(err, DecodeError::UnknownOp("NONSENSE".to_string()));
    }

    #[test]
    fn unknown_mode_is_a_decode_error() {
        let err = decode("127.0.0.1:5000 1 1 SEARCH ZZ 5000 foo 1").unwrap_err();
        assert_eq!(err, DecodeError::UnknownMode("ZZ".to_string()));
    }

    #[test]
    fn short_search_is_too_few_fields() {
        let err = decode("127.0.0.1:5000 1 1 SEARCH FL").unwrap_err();
        assert!(matches!(err, DecodeError::TooFewFields { .. }));
    }
}
