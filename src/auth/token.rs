use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::shared::errors::AppError;

/// Tokens expire 72 hours after issuance.
pub const TOKEN_TTL_HOURS: i64 = 72;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: i32,
    pub exp: i64,
}

pub fn issue(user_id: i32, secret: &str) -> Result<String, AppError> {
    let claims = Claims {
        id: user_id,
        exp: (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::System(format!("failed to sign token: {e}")))
}

pub fn verify(token: &str, secret: &str) -> Result<i32, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.set_required_spec_claims(&["exp"]);

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims.id)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Unauthorized("token expired".to_string())
            }
            _ => AppError::Unauthorized("invalid token".to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let token = issue(42, "secret").expect("issue failed");
        assert_eq!(verify(&token, "secret").expect("verify failed"), 42);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue(42, "secret").unwrap();
        assert!(matches!(
            verify(&token, "other"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = Claims {
            id: 42,
            exp: (Utc::now() - Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(matches!(
            verify(&token, "secret"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(verify("not-a-token", "secret").is_err());
    }
}
