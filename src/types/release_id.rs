// ABOUTME: Timestamp-derived release identifiers.
// ABOUTME: Fixed-width digit strings so lexicographic order equals chronological order.

use chrono::Utc;
use std::fmt;
use thiserror::Error;

/// UTC timestamp with millisecond resolution, e.g. `20260825143015042`.
const FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// Number of digits in a release identifier.
const WIDTH: usize = 17;

#[derive(Debug, Error)]
pub enum ReleaseIdError {
    #[error("release identifier must be 17 digits, got '{0}'")]
    Malformed(String),
}

/// Identifier of one release, ordered newest-last when sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReleaseId(String);

impl ReleaseId {
    /// Generate an identifier from the current wall clock.
    pub fn now() -> Self {
        Self(Utc::now().format(FORMAT).to_string())
    }

    /// Parse a directory name back into an identifier.
    pub fn parse(value: &str) -> Result<Self, ReleaseIdError> {
        if value.len() != WIDTH || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ReleaseIdError::Malformed(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    /// The next identifier in sort order. Used to resolve collisions when two
    /// deploys land in the same millisecond; the result is not required to be
    /// a valid calendar timestamp, only to sort strictly after this one.
    pub fn bumped(&self) -> Self {
        let n: u64 = self.0.parse().unwrap_or(0);
        Self(format!("{:01$}", n + 1, WIDTH))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
