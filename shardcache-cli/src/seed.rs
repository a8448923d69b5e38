//! The demo backing source: a flat key/value table, either loaded from a
//! JSON file or a small built-in default.
//!
//! The default table mirrors `original_source/ocache_test.go`'s `db` map
//! (`Tom`/`Jack`/`Sam` with their sample scores) so a freshly-started peer
//! behaves the same way the original's test harness does out of the box.

use std::fmt;
use std::path::Path;

use hashbrown::HashMap;

pub fn load(path: Option<&Path>) -> anyhow::Result<HashMap<String, String>> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let table: HashMap<String, String> = serde_json::from_str(&raw)?;
            Ok(table)
        }
        None => Ok(default_table()),
    }
}

fn default_table() -> HashMap<String, String> {
    HashMap::from([
        ("Tom".to_string(), "630".to_string()),
        ("Jack".to_string(), "589".to_string()),
        ("Sam".to_string(), "567".to_string()),
    ])
}

/// Raised by the demo backing source when a key has no entry in the table.
#[derive(Debug)]
pub struct NotFound(pub String);

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} not exist", self.0)
    }
}

impl std::error::Error for NotFound {}
