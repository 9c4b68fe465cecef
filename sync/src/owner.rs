//! Identity and data-ownership types.
//!
//! The identity source reports who is signed in; the synchronizer turns those
//! reports into a [`DataOwner`], which decides where (if anywhere) the state
//! may be written.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable user id, used to namespace the remote document.
    pub id: String,

    /// Name offered by the identity provider, used to seed new documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// One report from the identity source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityReport {
    /// `None` when nobody is signed in.
    pub identity: Option<Identity>,

    /// `false` while the determination is still pending.
    pub resolved: bool,
}

impl IdentityReport {
    /// Sign-in state not yet known.
    #[must_use]
    pub fn pending() -> Self {
        Self {
            identity: None,
            resolved: false,
        }
    }

    /// Resolved: nobody is signed in.
    #[must_use]
    pub fn guest() -> Self {
        Self {
            identity: None,
            resolved: true,
        }
    }

    /// Resolved: `identity` is signed in.
    #[must_use]
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            resolved: true,
        }
    }
}

/// Which backend, if any, the in-memory state belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum DataOwner {
    /// Ownership is being determined; persistence is disabled.
    #[default]
    Unresolved,
    /// Bound to the local guest store.
    Guest,
    /// Bound to the remote document of this user id.
    Identity(String),
}

impl DataOwner {
    /// `true` once a load has completed for the current identity.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

impl fmt::Display for DataOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => f.write_str("unresolved"),
            Self::Guest => f.write_str("guest"),
            Self::Identity(id) => write!(f, "identity:{id}"),
        }
    }
}
