//! Non-fatal failures collected during a walk or merge pass.

use std::fmt;

use crate::error::Error;

/// A failure that degraded one field path without aborting the pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Dotted field path where the failure happened.
    pub path: String,
    /// What went wrong.
    pub error: Error,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.error)
        } else {
            write!(f, "{}: {}", self.path, self.error)
        }
    }
}

/// Ordered collector of diagnostics for one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and log it.
    pub fn push(&mut self, path: impl Into<String>, error: Error) {
        let path = path.into();
        tracing::warn!(path = %path, error = %error, "preview degraded");
        self.entries.push(Diagnostic { path, error });
    }

    /// Recorded diagnostics, in order.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Number of diagnostics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the collector.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Join a dotted path prefix and a field name.
pub(crate) fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}
