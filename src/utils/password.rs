use super::error::AppError;

/// Hashes a plaintext password with bcrypt on the blocking pool.
pub async fn hash_password(plain: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Checks a plaintext password against a stored bcrypt hash.
///
/// A stored hash bcrypt cannot parse is an `Internal` error, not a mismatch.
pub async fn verify_password(plain: String, hashed: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hashed))
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
        .map_err(|e| {
            log::error!("❌ Stored password hash could not be verified: {}", e);
            AppError::Internal(format!("Unreadable password hash: {}", e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_is_not_plaintext_and_verifies() {
        let hashed = hash_password("s3cret".to_string(), 4).await.unwrap();
        assert_ne!(hashed, "s3cret");
        assert!(hashed.starts_with("$2"));
        assert!(verify_password("s3cret".to_string(), hashed.clone()).await.unwrap());
        assert!(!verify_password("wrong".to_string(), hashed).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash_is_an_internal_error() {
        let err = verify_password("s3cret".to_string(), "not-a-hash".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
