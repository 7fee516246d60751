use crate::error::{FerrioError, Result};
use serde::{Deserialize, Serialize};

/// Longest name the facade will accept. Matches the common blob name limit
/// across hosted backends.
const MAX_NAME_LEN: usize = 1024;

/// A validated, caller-supplied object name.
///
/// Validation happens once at construction; a constructed name is never
/// empty, never contains control characters, and fits the backend name
/// length limit. Backend-specific addressing rules are checked later, at
/// resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectName(String);

impl ObjectName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(FerrioError::InvalidReference(
                "object name cannot be empty".to_string(),
            ));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(FerrioError::InvalidReference(format!(
                "object name exceeds {} bytes",
                MAX_NAME_LEN
            )));
        }
        if name.chars().any(char::is_control) {
            return Err(FerrioError::InvalidReference(
                "object name contains control characters".to_string(),
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ObjectName {
    type Error = FerrioError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ObjectName> for String {
    fn from(name: ObjectName) -> Self {
        name.0
    }
}
