//! Identity/session precondition.
//!
//! A workflow only runs steps, and only enters auto mode, while an identity
//! is available. The identity source is handed to the workflow at
//! construction and read synchronously each time it is needed.

use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// The account a workflow acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Create an identity from an account id.
    pub fn new(account_id: impl Into<String>) -> Self {
        Self(account_id.into())
    }

    /// The account id.
    pub fn account_id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supplies the currently active identity, if any.
pub trait IdentitySource: Send + Sync {
    /// The active identity, or `None` when no session is usable.
    fn current(&self) -> Option<Identity>;
}

/// An identity source backed by a connect/disconnect session.
#[derive(Debug, Default)]
pub struct SessionIdentity {
    active: RwLock<Option<Identity>>,
}

impl SessionIdentity {
    /// A session with no identity connected.
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// A session already connected as `account_id`.
    pub fn connected(account_id: impl Into<String>) -> Self {
        Self {
            active: RwLock::new(Some(Identity::new(account_id))),
        }
    }

    /// Connect (or switch) the session identity.
    pub fn connect(&self, identity: Identity) {
        let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
        *active = Some(identity);
    }

    /// Drop the session identity.
    pub fn disconnect(&self) {
        let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
        *active = None;
    }
}

impl IdentitySource for SessionIdentity {
    fn current(&self) -> Option<Identity> {
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
