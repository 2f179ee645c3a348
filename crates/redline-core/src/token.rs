//! Lock ownership tokens.

use std::fmt;

/// Opaque value proving ownership of a distributed lock.
///
/// Possession of the token, not caller identity, is what grants release
/// and renew rights. Tokens compare by value and are safe to log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockToken(String);

impl LockToken {
    /// A fresh random token. Collisions are as unlikely as v4 UUID
    /// collisions, which is what lock correctness rests on.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for LockToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for LockToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_tokens_differ() {
        assert_ne!(LockToken::random(), LockToken::random());
    }

    #[test]
    fn display_matches_inner() {
        let token = LockToken::new("t1");
        assert_eq!(token.to_string(), "t1");
        assert_eq!(token.as_str(), "t1");
    }

    #[test]
    fn empty_token_is_detectable() {
        assert!(LockToken::new("").is_empty());
        assert!(!LockToken::random().is_empty());
    }
}
