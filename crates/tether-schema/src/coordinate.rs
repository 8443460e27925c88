//! Repository coordinates (`group:artifact:version`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{FLOATING_SUFFIX, is_file_name_safe};

/// Errors that can occur when parsing a [`Coordinate`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CoordinateError {
    /// The input did not have exactly three `:`-separated parts.
    #[error("Invalid coordinate '{0}': expected 'group:artifact:version'")]
    Malformed(String),

    /// One of the three parts was empty.
    #[error("Invalid coordinate '{coordinate}': empty {field}")]
    EmptyField {
        /// The full input string.
        coordinate: String,
        /// Which part was empty.
        field: &'static str,
    },

    /// A part would escape the working directory once used in a file name.
    #[error("Invalid coordinate '{coordinate}': {field} must not contain path separators or '..'")]
    UnsafeField {
        /// The full input string.
        coordinate: String,
        /// Which part was rejected.
        field: &'static str,
    },
}

/// A repository coordinate identifying one artifact build.
///
/// # Example
///
/// ```
/// use tether_schema::Coordinate;
///
/// let c: Coordinate = "com.google.code.gson:gson:2.10.1".parse().unwrap();
/// assert_eq!(c.group_path(), "com/google/code/gson");
/// assert!(!c.is_floating());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coordinate {
    group: String,
    artifact: String,
    version: String,
}

impl Coordinate {
    /// Create a coordinate without validation.
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
        }
    }

    /// The dotted repository group (e.g. `org.ow2.asm`).
    pub fn group(&self) -> &str {
        &self.group
    }

    /// The artifact name within the group.
    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    /// The requested version string, including any floating suffix.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The group with dots turned into path separators (`org/ow2/asm`).
    pub fn group_path(&self) -> String {
        self.group.replace('.', "/")
    }

    /// Whether this version floats and must be resolved through repository metadata.
    pub fn is_floating(&self) -> bool {
        self.version.contains(FLOATING_SUFFIX)
    }

    /// The version with the floating suffix removed (`1.0-SNAPSHOT` -> `1.0`).
    pub fn base_version(&self) -> String {
        self.version.replace(FLOATING_SUFFIX, "")
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [group, artifact, version] = parts.as_slice() else {
            return Err(CoordinateError::Malformed(s.to_string()));
        };

        for (field, value) in [("group", group), ("artifact", artifact), ("version", version)] {
            let value = value.trim();
            if value.is_empty() {
                return Err(CoordinateError::EmptyField {
                    coordinate: s.to_string(),
                    field,
                });
            }
            if !is_file_name_safe(value) {
                return Err(CoordinateError::UnsafeField {
                    coordinate: s.to_string(),
                    field,
                });
            }
        }

        Ok(Self::new(group.trim(), artifact.trim(), version.trim()))
    }
}

impl TryFrom<String> for Coordinate {
    type Error = CoordinateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Coordinate> for String {
    fn from(c: Coordinate) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}
