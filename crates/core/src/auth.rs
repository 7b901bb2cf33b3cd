//! Single-candidate gate and the context it hands to the exam.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthError {
    #[error("candidate name is not recognised")]
    UnknownCandidate,
}

/// Accepts exactly one configured candidate name.
///
/// This is a name match, not authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGate {
    expected: String,
}

impl LoginGate {
    #[must_use]
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into().trim().to_string(),
        }
    }

    #[must_use]
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// # Errors
    ///
    /// Returns `AuthError::UnknownCandidate` if the trimmed name differs.
    pub fn login(&self, name: &str) -> Result<SessionContext, AuthError> {
        let name = name.trim();
        if name.is_empty() || name != self.expected {
            return Err(AuthError::UnknownCandidate);
        }
        Ok(SessionContext {
            candidate: name.to_string(),
            authenticated: true,
        })
    }
}

/// Who is sitting the exam. Created by [`LoginGate::login`], read when the
/// session starts, cleared once the session completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    candidate: String,
    authenticated: bool,
}

impl SessionContext {
    #[must_use]
    pub fn candidate(&self) -> &str {
        &self.candidate
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn clear(&mut self) {
        self.authenticated = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_matches_trimmed_name() {
        let gate = LoginGate::new("Abduraxmatov Abdulaziz");
        let ctx = gate.login("  Abduraxmatov Abdulaziz ").unwrap();
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.candidate(), "Abduraxmatov Abdulaziz");

        assert_eq!(
            gate.login("abduraxmatov abdulaziz").unwrap_err(),
            AuthError::UnknownCandidate
        );
        assert!(LoginGate::new("").login("").is_err());
    }

    #[test]
    fn clear_drops_authentication() {
        let mut ctx = LoginGate::new("A").login("A").unwrap();
        ctx.clear();
        assert!(!ctx.is_authenticated());
    }
}
