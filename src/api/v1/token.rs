use jsonwebtoken::TokenData;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::Error;

use super::auth::{UserModel, UserRole};

/// Access tokens live for one day.
pub const ACCESS_TOKEN_TTL: Duration = Duration::days(1);

#[derive(Clone)]
pub struct JwtState {
    validation: jsonwebtoken::Validation,
    header: jsonwebtoken::Header,

    encoding_key: jsonwebtoken::EncodingKey,
    decoding_key: jsonwebtoken::DecodingKey,
}

impl JwtState {
    pub fn new(secret: &[u8]) -> Self {
        let header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256);
        let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256);
        // expiry is checked manually so the caller decides the rejection type
        validation.validate_exp = false;

        Self {
            header,
            validation,

            encoding_key: jsonwebtoken::EncodingKey::from_secret(secret),
            decoding_key: jsonwebtoken::DecodingKey::from_secret(secret),
        }
    }

    pub fn new_from_env() -> Self {
        let secret = std::env::var("JWT_SECRET_KEY")
            .expect("Cannot retrieve JWT_SECRET_KEY from environment variable.");

        Self::new(secret.as_bytes())
    }
}

pub fn current_timestamp() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AccessTokenClaims {
    /// The caller's email, the identity every ownership check compares against.
    pub sub: String,
    pub user_role: UserRole,
    pub exp: i64,
}

impl AccessTokenClaims {
    pub fn is_expired(&self) -> bool {
        self.exp < current_timestamp().unix_timestamp()
    }
}

pub struct GenerateAccessTokenResponse {
    pub expired_at: OffsetDateTime,
    pub token: String,
}

pub fn generate_access_token(
    jwt_state: &JwtState,
    user: &UserModel,
) -> Result<GenerateAccessTokenResponse, Error> {
    let expired_at = current_timestamp() + ACCESS_TOKEN_TTL;
    let token = generate_access_token_with_exp(jwt_state, user, expired_at.unix_timestamp())?;

    Ok(GenerateAccessTokenResponse { expired_at, token })
}

pub fn generate_access_token_with_exp(
    jwt_state: &JwtState,
    user: &UserModel,
    exp: i64,
) -> Result<String, Error> {
    jsonwebtoken::encode(
        &jwt_state.header,
        &AccessTokenClaims {
            sub: user.email.clone(),
            user_role: user.role,
            exp,
        },
        &jwt_state.encoding_key,
    )
    .map_err(Into::into)
}

pub fn decode_access_token(
    jwt_state: &JwtState,
    token: &str,
) -> Result<TokenData<AccessTokenClaims>, Error> {
    jsonwebtoken::decode(token, &jwt_state.decoding_key, &jwt_state.validation).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use bson::oid::ObjectId;
    use time::Duration;

    use crate::api::v1::auth::VerificationStatus;

    use super::*;

    fn jwt() -> JwtState {
        JwtState::new(b"test-signing-secret")
    }

    fn user() -> UserModel {
        UserModel {
            id: ObjectId::new(),
            name: "name".to_string(),
            email: "seller@test.com".to_string(),
            role: UserRole::Seller,
            status: VerificationStatus::Unverified,
            created_at: bson::DateTime::now(),
        }
    }

    #[test]
    pub fn test_access_token() {
        let jwt = jwt();
        let user = user();

        let token = generate_access_token(&jwt, &user).unwrap();

        let decoded = decode_access_token(&jwt, &token.token).unwrap();
        assert_eq!(decoded.claims.sub, user.email);
        assert_eq!(decoded.claims.user_role, user.role);
        assert!(!decoded.claims.is_expired());
    }

    #[test]
    pub fn test_access_token_expires_in_a_day() {
        let jwt = jwt();

        let token = generate_access_token(&jwt, &user()).unwrap();
        let lifetime = token.expired_at - current_timestamp();

        assert!(lifetime <= Duration::days(1));
        assert!(lifetime > Duration::days(1) - Duration::minutes(1));
    }

    #[test]
    pub fn test_expired_access_token() {
        let jwt = jwt();

        let token = generate_access_token_with_exp(
            &jwt,
            &user(),
            (current_timestamp() + Duration::seconds(-1)).unix_timestamp(),
        )
        .unwrap();

        let decoded = decode_access_token(&jwt, &token).unwrap();
        assert!(decoded.claims.is_expired());
    }

    #[test]
    pub fn test_token_signed_with_other_secret_is_rejected() {
        let token = generate_access_token(&jwt(), &user()).unwrap();

        let other = JwtState::new(b"a-different-secret");
        decode_access_token(&other, &token.token).unwrap_err();
    }
}
