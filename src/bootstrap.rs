//! Bootstrap file loaders, per §4.9.
//!
//! Grounded on `utils.get_all_neighbors_from_file` / `get_key_value_from_file`:
//! plain line-oriented text files, loaded once at startup.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::wire::Endpoint;

/// Load bootstrap neighbor endpoints, one `ip:port` per line.
pub fn load_neighbors(path: &Path) -> Result<Vec<Endpoint>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading neighbors file {}", path.display()))?;
    contents
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                anyhow::bail!("blank line in neighbors file");
            }
            let endpoint: Endpoint = line
                .parse()
                .with_context(|| format!("parsing neighbor line {line:?}"))?;
            crate::config::validate_endpoint(&endpoint)?;
            Ok(endpoint)
        })
        .collect()
}

/// Load local key/value data, one `key value` pair per line.
pub fn load_data(path: &Path) -> Result<HashMap<String, String>> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading data file {}", path.display()))?;
    let mut data = HashMap::new();
    for line in contents.lines().filter(|line| !line.trim().is_empty()) {
        let (key, value) = line
            .split_once(' ')
            .with_context(|| format!("data line missing a space separator: {line:?}"))?;
        data.insert(key.to_string(), value.to_string());
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_neighbors_one_per_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "127.0.0.1:5000").unwrap();
        writeln!(file, "127.0.0.1:5001").unwrap();
        let neighbors = load_neighbors(file.path()).unwrap();
        assert_eq!(neighbors, vec![Endpoint::new("127.0.0.1", 5000), Endpoint::new("127.0.0.1", 5001)]);
    }

    #[test]
    fn rejects_a_blank_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "127.0.0.1:5000").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "127.0.0.1:5001").unwrap();
        assert!(load_neighbors(file.path()).is_err());
    }

    #[test]
    fn rejects_an_invalid_neighbor_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not-a-neighbor").unwrap();
        assert!(load_neighbors(file.path()).is_err());
    }

    #[test]
    fn loads_key_value_data() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "foo bar").unwrap();
        writeln!(file, "baz qux").unwrap();
        let data = load_data(file.path()).unwrap();
        assert_eq!(data.get("foo"), Some(&"bar".to_string()));
        assert_eq!(data.get("baz"), Some(&"qux".to_string()));
    }
}
