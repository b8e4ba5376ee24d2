//! Optimistic concurrency expectations.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Version expectation supplied with a write.
///
/// Records start at version 1 on first save and gain one per update; a client
/// that echoes back the version it read gets a conflict if someone else wrote
/// in between.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExpectedVersion {
    /// Skip version checking (last write wins).
    #[default]
    Any,
    /// Require the stored record to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// Build from an optional client-provided version.
    pub fn from_option(version: Option<u64>) -> Self {
        version.map(Self::Exact).unwrap_or(Self::Any)
    }

    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "stale version (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}
