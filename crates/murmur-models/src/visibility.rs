use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Who may read a status (and therefore any poll attached to it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Unlisted,
    Private,
    Direct,
    Limited,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown visibility: {0}")]
pub struct ParseVisibilityError(pub String);

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
            Visibility::Direct => "direct",
            Visibility::Limited => "limited",
        }
    }

    /// Only the author and mentioned accounts may read these.
    pub fn requires_mention(self) -> bool {
        matches!(self, Visibility::Direct | Visibility::Limited)
    }

    /// Public and unlisted statuses are readable without any relationship.
    pub fn is_world_readable(self) -> bool {
        matches!(self, Visibility::Public | Visibility::Unlisted)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = ParseVisibilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "unlisted" => Ok(Visibility::Unlisted),
            "private" => Ok(Visibility::Private),
            "direct" => Ok(Visibility::Direct),
            "limited" => Ok(Visibility::Limited),
            _ => Err(ParseVisibilityError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stored_names() {
        assert_eq!("public".parse(), Ok(Visibility::Public));
        assert_eq!(" Private ".parse(), Ok(Visibility::Private));
        assert!("friends-only".parse::<Visibility>().is_err());
    }

    #[test]
    fn mention_gated_levels() {
        assert!(Visibility::Direct.requires_mention());
        assert!(Visibility::Limited.requires_mention());
        assert!(!Visibility::Private.requires_mention());
        assert!(Visibility::Unlisted.is_world_readable());
        assert!(!Visibility::Private.is_world_readable());
    }
}
