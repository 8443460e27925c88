//! Symbol relocation rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when validating a [`Relocation`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RelocationError {
    /// A prefix was empty.
    #[error("Relocation prefix must not be empty")]
    EmptyPrefix,

    /// Source and target prefix are identical.
    #[error("Relocation of '{0}' onto itself")]
    Identity(String),

    /// The input to [`Relocation::from_str`] was not `from=to`.
    #[error("Invalid relocation '{0}': expected 'from.prefix=to.prefix'")]
    Malformed(String),
}

/// A symbol rewrite instruction: every reference under `from` moves under `to`.
///
/// Prefixes are written in dotted form (`com.google.gson`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRelocation")]
pub struct Relocation {
    from: String,
    to: String,
}

impl Relocation {
    /// Create a validated relocation rule.
    ///
    /// # Errors
    ///
    /// Returns [`RelocationError::EmptyPrefix`] if either prefix is empty, or
    /// [`RelocationError::Identity`] if both prefixes are equal.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Result<Self, RelocationError> {
        let from = from.into().trim().trim_end_matches('.').to_string();
        let to = to.into().trim().trim_end_matches('.').to_string();

        if from.is_empty() || to.is_empty() {
            return Err(RelocationError::EmptyPrefix);
        }
        if from == to {
            return Err(RelocationError::Identity(from));
        }

        Ok(Self { from, to })
    }

    /// The prefix being moved.
    pub fn from(&self) -> &str {
        &self.from
    }

    /// The prefix it moves to.
    pub fn to(&self) -> &str {
        &self.to
    }
}

#[derive(Deserialize)]
struct RawRelocation {
    from: String,
    to: String,
}

impl TryFrom<RawRelocation> for Relocation {
    type Error = RelocationError;

    fn try_from(raw: RawRelocation) -> Result<Self, Self::Error> {
        Self::new(raw.from, raw.to)
    }
}

impl FromStr for Relocation {
    type Err = RelocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once('=')
            .ok_or_else(|| RelocationError::Malformed(s.to_string()))?;
        Self::new(from, to)
    }
}

impl fmt::Display for Relocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
