//! Login for the dashboard and the `/login` route.
//!
//! The real identity provider is out of scope; anything that turns a
//! username/password pair into pass/fail plus an opaque token fits behind
//! [`Authenticator`].

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

/// Opaque session token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Token(value.into())
    }

    fn generate() -> Self {
        Token(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

pub trait Authenticator: Send + Sync {
    /// `Ok(Some(token))` on success, `Ok(None)` on bad credentials.
    fn authenticate(&self, username: &str, password: &str) -> Result<Option<Token>, AuthError>;
}

/// Accepts every non-empty login. For local development only.
#[derive(Debug, Default, Clone)]
pub struct BypassAuthenticator;

impl Authenticator for BypassAuthenticator {
    fn authenticate(&self, username: &str, password: &str) -> Result<Option<Token>, AuthError> {
        check_non_empty(username, password)?;
        log::warn!("Authentication bypassed for user '{username}'");
        Ok(Some(Token::generate()))
    }
}

/// Compares against one configured credential pair.
#[derive(Clone)]
pub struct StaticAuthenticator {
    credentials: Option<(String, String)>,
}

impl StaticAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Some((username.into(), password.into())),
        }
    }

    /// Rejects every login.
    pub fn deny_all() -> Self {
        Self { credentials: None }
    }
}

impl fmt::Debug for StaticAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticAuthenticator")
            .field("username", &self.credentials.as_ref().map(|(u, _)| u))
            .finish_non_exhaustive()
    }
}

impl Authenticator for StaticAuthenticator {
    fn authenticate(&self, username: &str, password: &str) -> Result<Option<Token>, AuthError> {
        check_non_empty(username, password)?;
        match &self.credentials {
            Some((u, p)) if u == username && p == password => {
                log::info!("User '{username}' logged in");
                Ok(Some(Token::generate()))
            }
            _ => {
                log::warn!("Rejected login for user '{username}'");
                Ok(None)
            }
        }
    }
}

fn check_non_empty(username: &str, password: &str) -> Result<(), AuthError> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(AuthError::EmptyCredentials);
    }
    Ok(())
}
