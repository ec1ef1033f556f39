//! Source directory entries
//!
//! `Source.list` replies with one component per live source, each of the
//! form `c:<name>` or `s:<name>` depending on who runs the source.

use std::fmt;

/// Who owns a listed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Pushed by a connected client
    Client,
    /// Runs inside the server itself
    Server,
}

/// One entry from the server's source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Who owns the source
    pub kind: SourceKind,
    /// The source's name
    pub name: String,
}

impl SourceInfo {
    /// Parse a directory entry. `None` for anything not of the form
    /// `c:<name>` or `s:<name>`.
    pub(crate) fn parse(entry: &str) -> Option<SourceInfo> {
        let (kind, name) = entry.split_once(':')?;
        let kind = match kind {
            "c" => SourceKind::Client,
            "s" => SourceKind::Server,
            _ => return None,
        };
        if name.is_empty() {
            return None;
        }
        Some(SourceInfo {
            kind,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            SourceKind::Client => 'c',
            SourceKind::Server => 's',
        };
        write!(f, "{}:{}", prefix, self.name)
    }
}
