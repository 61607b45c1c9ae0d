//! The immutable name → value table every session reads from.
//!
//! The table is loaded once, before the socket is bound, and then shared
//! behind an `Arc` for the lifetime of the server. Nothing mutates it after
//! construction, so lookups need no locking.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read resource table {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("resource table is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("resource table must be a JSON object of name/value pairs")]
    NotAnObject,
    #[error("resource '{name}' has a {kind} value; expected a string, number, or boolean")]
    UnsupportedValue { name: String, kind: &'static str },
    #[error("resource table is empty")]
    Empty,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    entries: HashMap<Vec<u8>, String>,
}

impl ResourceTable {
    /// Builds a table from in-memory pairs. An empty table is rejected the
    /// same way an empty file is.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Vec<u8>>,
        V: Into<String>,
    {
        let entries: HashMap<Vec<u8>, String> = entries
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        if entries.is_empty() {
            return Err(TableError::Empty);
        }
        Ok(Self { entries })
    }

    /// Parses a flat JSON object. Scalars other than strings are kept in
    /// their JSON text form.
    pub fn from_json_str(text: &str) -> Result<Self, TableError> {
        let document: Value = serde_json::from_str(text)?;
        let Value::Object(object) = document else {
            return Err(TableError::NotAnObject);
        };

        let mut entries = Vec::with_capacity(object.len());
        for (name, value) in object {
            let value = match value {
                Value::String(text) => text,
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                Value::Null => return Err(unsupported(name, "null")),
                Value::Array(_) => return Err(unsupported(name, "array")),
                Value::Object(_) => return Err(unsupported(name, "object")),
            };
            entries.push((name, value));
        }

        Self::from_entries(entries)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| TableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Exact byte match, no trimming or case folding.
    pub fn get(&self, name: &[u8]) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names no request can ever reach because they exceed `limit` bytes.
    pub fn unreachable_names(&self, limit: usize) -> impl Iterator<Item = &[u8]> {
        self.entries
            .keys()
            .filter(move |name| name.len() > limit)
            .map(Vec::as_slice)
    }
}

fn unsupported(name: String, kind: &'static str) -> TableError {
    TableError::UnsupportedValue { name, kind }
}
