//! Password credentials

use async_trait::async_trait;

use crate::AuthError;

/// Hashes and verifies passwords
#[async_trait]
pub trait CredentialHasher: Send + Sync {
    /// Hash a password for storage
    async fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Check a password against a stored hash
    async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// bcrypt hasher. Work runs on the blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[async_trait]
impl CredentialHasher for BcryptHasher {
    async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))?
            .map_err(|e| AuthError::Internal(format!("hashing failed: {e}")))
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("verification task failed: {e}")))?;

        // A stored hash that does not parse can never match
        Ok(outcome.unwrap_or(false))
    }
}

/// Check a display name: 2 to 255 characters after trimming
pub fn validate_name(name: &str) -> Result<&str, AuthError> {
    let name = name.trim();
    let len = name.chars().count();
    if !(2..=255).contains(&len) {
        return Err(AuthError::InvalidArgument(
            "name must be between 2 and 255 characters".to_string(),
        ));
    }
    Ok(name)
}

/// Syntactic email check, returning the trimmed lowercase address
pub fn validate_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let invalid = || AuthError::InvalidArgument("email is not valid".to_string());

    if email.len() > 255 || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(email)
}

/// Minimum password length in characters
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Check password length
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AuthError::InvalidArgument(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert_eq!(validate_email(" Alice@X.com ").unwrap(), "alice@x.com");
        assert!(validate_email("alice").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("alice@x").is_err());
        assert!(validate_email("alice@x..com").is_err());
        assert!(validate_email("a b@x.com").is_err());
        assert!(validate_email("a@b@x.com").is_err());
    }

    #[test]
    fn test_name_and_password_validation() {
        assert!(validate_name("A").is_err());
        assert_eq!(validate_name(" Al ").unwrap(), "Al");
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
    }

    #[tokio::test]
    async fn test_bcrypt_roundtrip() {
        let hasher = BcryptHasher::new(4);
        let hash = hasher.hash("correct horse").await.unwrap();
        assert!(hasher.verify("correct horse", &hash).await.unwrap());
        assert!(!hasher.verify("wrong horse", &hash).await.unwrap());
        assert!(!hasher.verify("anything", "not-a-hash").await.unwrap());
    }
}
