//! Sign-in: a configured custom token, or an anonymous session
//!
//! Failure is never fatal. The app becomes ready either way and simply has
//! no user id.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("custom token is empty")]
    EmptyToken,
    #[error("custom token contains whitespace")]
    MalformedToken,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub ready: bool,
    pub user_id: Option<String>,
}

impl AuthState {
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

/// Subject of a `<uid>` or `<uid>.<signature>` token
fn token_subject(token: &str) -> Result<String, AuthError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }
    if token.chars().any(char::is_whitespace) {
        return Err(AuthError::MalformedToken);
    }
    let subject = token.split('.').next().unwrap_or_default();
    if subject.is_empty() {
        return Err(AuthError::MalformedToken);
    }
    Ok(subject.to_string())
}

fn anonymous_id() -> String {
    format!("anon-{}", uuid::Uuid::new_v4().simple())
}

/// Sign in with the custom token when one is configured, anonymously otherwise
pub fn sign_in(custom_token: Option<&str>) -> AuthState {
    let result = match custom_token {
        Some(token) => token_subject(token),
        None => Ok(anonymous_id()),
    };

    match result {
        Ok(user_id) => {
            tracing::info!("Signed in as {}", user_id);
            AuthState {
                ready: true,
                user_id: Some(user_id),
            }
        }
        Err(e) => {
            tracing::warn!("Error during authentication: {}", e);
            AuthState {
                ready: true,
                user_id: None,
            }
        }
    }
}
