//! The `visited` tri-state for addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error parsing a [`Visited`] value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("visited must be \"yes\" or \"no\", got {0:?}")]
pub struct VisitedError(pub String);

/// Whether an address has been visited.
///
/// The absent case is expressed as `Option<Visited>` rather than a third
/// variant, so the database NULL and the JSON null line up with `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visited {
    Yes,
    No,
}

impl Visited {
    /// The wire/database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }

    /// Parse from the wire/database representation.
    ///
    /// # Errors
    ///
    /// Returns `VisitedError` for anything other than `"yes"` or `"no"`.
    pub fn parse(s: &str) -> Result<Self, VisitedError> {
        match s {
            "yes" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            other => Err(VisitedError(other.to_owned())),
        }
    }
}

impl fmt::Display for Visited {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Visited {
    type Err = VisitedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Visited::parse("yes"), Ok(Visited::Yes));
        assert_eq!(Visited::parse("no"), Ok(Visited::No));
        assert!(Visited::parse("maybe").is_err());
        assert!(Visited::parse("Yes").is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&Visited::Yes).expect("serialize"),
            "\"yes\""
        );
        let v: Visited = serde_json::from_str("\"no\"").expect("deserialize");
        assert_eq!(v, Visited::No);
    }
}
