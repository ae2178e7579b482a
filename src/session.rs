//! Session
//!
//! Local stand-in for the signed-in shopper. There is no authentication server; a session
//! either carries a user or it does not.

use std::fmt;

use serde::{Deserialize, Serialize};

/// User identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new user id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: UserId,

    /// Display name
    pub name: String,

    /// Email address
    pub email: String,
}

/// Shopper session
#[derive(Debug, Clone, Default)]
pub struct Session {
    user: Option<User>,
}

impl Session {
    /// A session with nobody signed in
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    /// A session for the given user
    pub fn signed_in(user: User) -> Self {
        Self { user: Some(user) }
    }

    /// The signed-in user, if any
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Whether a user is signed in
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}
