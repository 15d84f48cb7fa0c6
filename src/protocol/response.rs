//! Response rendering
//!
//! Formats command results as lines of the job output file.

use std::io::Write;

use crate::store::{Entry, KVS_ERROR, KVS_MISSING};

/// Result of a READ: one slot per requested key, in request order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResponse {
    pub results: Vec<(String, Option<String>)>,
}

impl ReadResponse {
    pub fn new(results: Vec<(String, Option<String>)>) -> Self {
        Self { results }
    }

    /// `[(k,v)(k2,KVSERROR)]`
    pub fn render(&self) -> String {
        let mut line = String::from("[");
        for (key, value) in &self.results {
            line.push('(');
            line.push_str(key);
            line.push(',');
            line.push_str(value.as_deref().unwrap_or(KVS_ERROR));
            line.push(')');
        }
        line.push_str("]\n");
        line
    }
}

/// Result of a DELETE: only the keys that were missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResponse {
    pub missing: Vec<String>,
}

impl DeleteResponse {
    pub fn new(missing: Vec<String>) -> Self {
        Self { missing }
    }

    /// `[(k,KVSMISSING)]`, or `None` when every key was removed
    pub fn render(&self) -> Option<String> {
        if self.missing.is_empty() {
            return None;
        }

        let mut line = String::from("[");
        for key in &self.missing {
            line.push('(');
            line.push_str(key);
            line.push(',');
            line.push_str(KVS_MISSING);
            line.push(')');
        }
        line.push_str("]\n");
        Some(line)
    }
}

/// Write one `(key, value)` line per entry
///
/// Shared by SHOW and backup files.
pub fn write_entries<W: Write>(out: &mut W, entries: &[Entry]) -> std::io::Result<()> {
    for entry in entries {
        writeln!(out, "{}", entry)?;
    }
    Ok(())
}
