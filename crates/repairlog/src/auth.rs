//! Session and role gate.
//!
//! Two accounts are recognized, both taken from [`AuthConfig`]: a privileged
//! admin and an unprivileged user. Deleting records requires an
//! [`AdminGuard`], which can only be obtained from an admin [`Session`], so
//! an unprivileged session never has a delete operation to call.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::error::{Error, Result};

/// Role attached to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May submit, list, and export records.
    User,
    /// May additionally delete records.
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// A logged-in session. Lives until the process exits or the user logs out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    username: String,
    role: Role,
}

/// Proof that the holder is an admin. Required by delete operations.
#[derive(Debug)]
pub struct AdminGuard<'a>(&'a Session);

impl AdminGuard<'_> {
    /// The admin session this guard was issued for.
    #[must_use]
    pub fn session(&self) -> &Session {
        self.0
    }
}

impl Session {
    /// The user name the session was opened with.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The session's role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether the session is privileged.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// An [`AdminGuard`] if the session is privileged.
    #[must_use]
    pub fn require_admin(&self) -> Option<AdminGuard<'_>> {
        self.is_admin().then_some(AdminGuard(self))
    }
}

/// Check a credential pair against the configured accounts.
///
/// The admin account always checks its password. The user account checks
/// its password only when one is configured.
///
/// # Errors
///
/// Returns [`Error::UnknownUser`] for an unrecognized user name and
/// [`Error::WrongPassword`] when the password does not match.
pub fn login(auth: &AuthConfig, username: &str, password: &str) -> Result<Session> {
    let role = if username == auth.admin_username {
        if password != auth.admin_password {
            warn!(user = username, "Rejected login: wrong password");
            return Err(Error::WrongPassword {
                username: username.to_string(),
            });
        }
        Role::Admin
    } else if username == auth.user_username {
        if let Some(expected) = &auth.user_password {
            if password != expected.as_str() {
                warn!(user = username, "Rejected login: wrong password");
                return Err(Error::WrongPassword {
                    username: username.to_string(),
                });
            }
        }
        Role::User
    } else {
        warn!(user = username, "Rejected login: unknown user");
        return Err(Error::UnknownUser {
            username: username.to_string(),
        });
    };

    info!(user = username, %role, "Logged in");
    Ok(Session {
        username: username.to_string(),
        role,
    })
}
