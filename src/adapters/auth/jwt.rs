use crate::domain::{CallerContext, User, UserId};
use crate::ports::credentials::{AuthError, TokenIssuer, TokenPair};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TokenType {
    Access,
    Refresh,
}

/// JWT claims carried by both token types.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    is_admin: bool,
    token_type: TokenType,
    iat: i64,
    exp: i64,
}

/// HS256 access/refresh token issuer.
pub struct JwtTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtTokenIssuer {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    fn sign(
        &self,
        user_id: Uuid,
        is_admin: bool,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            is_admin,
            token_type,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Backend(e.to_string()))
    }

    fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?
            .claims;

        if claims.token_type != expected {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, user: &User) -> Result<TokenPair, AuthError> {
        let user_id = user.user_id.value();
        Ok(TokenPair {
            access: self.sign(user_id, user.is_staff, TokenType::Access, self.access_ttl)?,
            refresh: self.sign(user_id, user.is_staff, TokenType::Refresh, self.refresh_ttl)?,
        })
    }

    fn verify_access(&self, token: &str) -> Result<CallerContext, AuthError> {
        let claims = self.decode(token, TokenType::Access)?;
        Ok(CallerContext {
            user_id: UserId::from_uuid(claims.sub),
            is_admin: claims.is_admin,
        })
    }

    fn issue_access(&self, user: &User) -> Result<String, AuthError> {
        self.sign(user.user_id.value(), user.is_staff, TokenType::Access, self.access_ttl)
    }

    fn verify_refresh(&self, refresh_token: &str) -> Result<UserId, AuthError> {
        let claims = self.decode(refresh_token, TokenType::Refresh)?;
        Ok(UserId::from_uuid(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Email;

    fn issuer() -> JwtTokenIssuer {
        JwtTokenIssuer::new(b"test-secret", Duration::minutes(5), Duration::days(1))
    }

    fn user(is_staff: bool) -> User {
        let now = Utc::now();
        User {
            user_id: UserId::new(),
            email: Email::parse("reader@example.com").unwrap(),
            password_hash: String::new(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            date_of_birth: None,
            is_active: true,
            is_staff,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_access_token_resolves_caller() {
        let issuer = issuer();
        let admin = user(true);
        let pair = issuer.issue(&admin).unwrap();

        let caller = issuer.verify_access(&pair.access).unwrap();
        assert_eq!(caller, CallerContext::admin(admin.user_id));
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let issuer = issuer();
        let pair = issuer.issue(&user(false)).unwrap();

        assert!(matches!(
            issuer.verify_access(&pair.refresh),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            issuer.verify_refresh(&pair.access),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_refresh_token_names_its_user() {
        let issuer = issuer();
        let reader = user(false);
        let pair = issuer.issue(&reader).unwrap();

        assert_eq!(issuer.verify_refresh(&pair.refresh).unwrap(), reader.user_id);

        let access = issuer.issue_access(&reader).unwrap();
        assert_eq!(
            issuer.verify_access(&access).unwrap(),
            CallerContext::user(reader.user_id)
        );
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = JwtTokenIssuer::new(b"test-secret", Duration::seconds(-120), Duration::days(1));
        let pair = issuer.issue(&user(false)).unwrap();

        assert!(matches!(
            issuer.verify_access(&pair.access),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let pair = issuer().issue(&user(false)).unwrap();
        let other = JwtTokenIssuer::new(b"other-secret", Duration::minutes(5), Duration::days(1));

        assert!(other.verify_access(&pair.access).is_err());
    }
}
