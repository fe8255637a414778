//! Session identity supplied by the auth provider.

use std::fmt;

use deskline_core::error::AppError;
use deskline_core::types::UserId;

/// Opaque bearer token, verified by the server at handshake time.
///
/// `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wraps a raw token.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw token, for placing on the wire.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True when the token is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken(<{} bytes>)", self.0.len())
    }
}

/// The authenticated user a session belongs to.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    /// User ID.
    pub user_id: UserId,
    /// Name shown to other users.
    pub display_name: String,
    /// Token presented on every handshake.
    pub auth_token: AuthToken,
}

impl SessionIdentity {
    /// Builds an identity, rejecting a blank user id or token.
    pub fn new(
        user_id: impl Into<UserId>,
        display_name: impl Into<String>,
        auth_token: AuthToken,
    ) -> Result<Self, AppError> {
        let user_id = user_id.into();
        if user_id.is_blank() {
            return Err(AppError::authentication("User id must not be empty"));
        }
        if auth_token.is_blank() {
            return Err(AppError::authentication("Auth token must not be empty"));
        }

        Ok(Self {
            user_id,
            display_name: display_name.into(),
            auth_token,
        })
    }
}
