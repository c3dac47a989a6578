//! Client roles.

use serde::{Deserialize, Serialize};

/// The role a client plays in a narration session.
///
/// Exactly one role may mutate shared state; every other client only
/// observes and reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The privileged narrator (game master).
    Narrator,
    /// A read-only observer.
    Observer,
}

impl Role {
    /// Returns `true` if this role may write shared state.
    #[must_use]
    pub fn is_privileged(self) -> bool {
        matches!(self, Self::Narrator)
    }

    /// Parses a role name. `narrator` and `gm` (any case) are privileged;
    /// anything else observes.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("narrator") || name.eq_ignore_ascii_case("gm") {
            Self::Narrator
        } else {
            Self::Observer
        }
    }
}
