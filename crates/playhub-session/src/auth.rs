//! Authentication hook for validating a connecting user's identity.
//!
//! playhub doesn't own accounts or login forms. It only needs to turn the
//! token a browser presents during the handshake into a stable
//! [`UserId`]. The [`Authenticator`] trait is that seam; the portal's
//! account service (or a test double) implements it.

use std::collections::HashMap;

use playhub_protocol::UserId;

use crate::SessionError;

/// Validates a client's auth token and returns their identity.
///
/// `Send + Sync + 'static` because one authenticator lives as long as the
/// server and is called from every connection task.
///
/// # Example
///
/// ```rust
/// use playhub_protocol::UserId;
/// use playhub_session::{Authenticator, SessionError};
///
/// /// Trusts the token as the username. Development only.
/// struct DevAuthenticator;
///
/// impl Authenticator for DevAuthenticator {
///     async fn authenticate(&self, token: &str) -> Result<UserId, SessionError> {
///         if token.is_empty() {
///             return Err(SessionError::AuthFailed("empty token".into()));
///         }
///         Ok(UserId::from(token))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates the given token and returns the user's identity.
    ///
    /// Called once per connection, during the `auth:hello` handshake.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<UserId, SessionError>> + Send;
}

/// Resolves API keys issued at login to usernames.
///
/// The portal hands each logged-in user an opaque API key; the browser
/// presents it when opening the game socket.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyAuthenticator {
    keys: HashMap<String, UserId>,
}

impl ApiKeyAuthenticator {
    /// Creates an authenticator with no known keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the key for a user.
    pub fn insert(&mut self, api_key: impl Into<String>, user: impl Into<UserId>) {
        self.keys.insert(api_key.into(), user.into());
    }

    /// Parses `name:key` pairs separated by commas, e.g.
    /// `alice:k-1,bob:k-2`.
    ///
    /// # Errors
    /// Returns [`SessionError::AuthFailed`] for an entry without a `:` or
    /// with an empty name or key.
    pub fn from_pairs(pairs: &str) -> Result<Self, SessionError> {
        let mut auth = Self::new();
        for entry in pairs.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, key) = entry.split_once(':').ok_or_else(|| {
                SessionError::AuthFailed(format!("malformed user entry: {entry}"))
            })?;
            let (name, key) = (name.trim(), key.trim());
            if name.is_empty() || key.is_empty() {
                return Err(SessionError::AuthFailed(format!(
                    "malformed user entry: {entry}"
                )));
            }
            auth.insert(key, name);
        }
        Ok(auth)
    }

    /// Number of known keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if no keys are registered.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<UserId, SessionError> {
        self.keys
            .get(token)
            .cloned()
            .ok_or_else(|| SessionError::AuthFailed("unknown api key".into()))
    }
}
