//! Decentralized identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// A DID string such as `did:quarkid:zksync:EiB...`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Did(String);

impl Did {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The method segment, e.g. `quarkid` for `did:quarkid:...`
    pub fn method(&self) -> Option<&str> {
        let mut parts = self.0.splitn(3, ':');
        match (parts.next(), parts.next()) {
            (Some("did"), Some(method)) if !method.is_empty() => Some(method),
            _ => None,
        }
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_did_method() {
        assert_eq!(Did::new("did:quarkid:zksync:abc").method(), Some("quarkid"));
        assert_eq!(Did::new("did:web:example.org").method(), Some("web"));
        assert_eq!(Did::new("not-a-did").method(), None);
        assert_eq!(Did::new("did::x").method(), None);
    }
}
