//! Provider identifiers for grey-literature sources.
//!
//! Providers themselves (the search HTTP clients) live outside this
//! crate; the pipeline only needs a stable identifier per source to
//! select a filtering strategy and to key the session aggregate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The grey-literature sources the pipeline knows how to filter.
///
/// Unknown provider identifiers are not an error anywhere in the
/// pipeline — they simply get the passthrough behavior (everything
/// relevant, nothing filtered).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Code repositories (name, description, readme).
    Repos,

    /// Issue-tracker entries (title, body excerpt).
    Issues,

    /// Q&A forum posts (title, HTML body excerpt, url).
    Qa,

    /// General web-search results (title, snippets, meta descriptions, url).
    Web,
}

impl ProviderKind {
    /// All known providers, in registry order.
    pub const ALL: [ProviderKind; 4] = [Self::Repos, Self::Issues, Self::Qa, Self::Web];

    /// Parses a provider identifier. Returns `None` for unknown ids.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "repos" => Some(Self::Repos),
            "issues" => Some(Self::Issues),
            "qa" => Some(Self::Qa),
            "web" => Some(Self::Web),
            _ => None,
        }
    }

    /// Returns the stable identifier used in session JSON and model paths.
    pub const fn id(&self) -> &'static str {
        match self {
            Self::Repos => "repos",
            Self::Issues => "issues",
            Self::Qa => "qa",
            Self::Web => "web",
        }
    }

    /// Returns a human-readable name for progress reporting.
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Repos => "Repositories",
            Self::Issues => "Issues",
            Self::Qa => "Q&A Posts",
            Self::Web => "Web Search",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        for kind in ProviderKind::ALL {
            assert_eq!(ProviderKind::from_id(kind.id()), Some(kind));
        }
    }

    #[test]
    fn test_unknown_id() {
        assert_eq!(ProviderKind::from_id("usenet"), None);
    }

    #[test]
    fn test_display_matches_id() {
        assert_eq!(ProviderKind::Qa.to_string(), "qa");
        assert_eq!(ProviderKind::Web.display_name(), "Web Search");
    }
}
