use axum::{
    extract::{FromRef, FromRequestParts, Query, State},
    headers::{authorization::Bearer, Authorization},
    http::request::Parts,
    Json, RequestPartsExt, TypedHeader,
};
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use tap::TapFallible;
use time::OffsetDateTime;
use validator::Validate;

use crate::{
    error::Error,
    mongo_ext::Collection,
    util::{FormattedDateTime, ObjectIdString},
};

use super::token::{decode_access_token, generate_access_token, JwtState};

#[derive(Clone)]
pub struct UserCollection(pub Collection<UserModel>);

impl std::ops::Deref for UserCollection {
    type Target = Collection<UserModel>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserModel {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub name: String,
    pub email: String,
    pub role: UserRole,

    #[serde(default)]
    pub status: VerificationStatus,

    pub created_at: bson::DateTime,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UserRole {
    #[default]
    Buyer,
    Seller,
    Admin,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerificationStatus {
    #[default]
    Unverified,
    Verified,
}

/// The decoded bearer identity. Role guards do not trust the role claim,
/// they re-check against the stored user document.
#[derive(Debug)]
pub struct UserAccess {
    pub email: String,
    pub role: UserRole,
}

impl UserAccess {
    pub fn from_token(jwt_state: &JwtState, token: &str) -> Result<Self, Error> {
        let token = decode_access_token(jwt_state, token).map_err(|_| Error::Forbidden)?;

        if token.claims.is_expired() {
            return Err(Error::Forbidden)
                .tap_err(|_| tracing::debug!("tried authenticating with expired token"));
        }

        Ok(Self {
            email: token.claims.sub,
            role: token.claims.user_role,
        })
    }

    /// Ownership predicate: the decoded identity must equal the resource
    /// owner's email.
    pub fn assert_owner(&self, email: &str) -> Result<(), Error> {
        if self.email != email {
            return Err(Error::Forbidden)
                .tap_err(|_| tracing::debug!("tried accessing another user's resource"));
        }

        Ok(())
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for UserAccess
where
    JwtState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(token)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| Error::Unauthorized)?;

        let jwt = JwtState::from_ref(state);

        Self::from_token(&jwt, token.token())
    }
}

impl UserModel {
    pub async fn from_email(
        email: &str,
        UserCollection(users): &UserCollection,
    ) -> Result<Self, Error> {
        users
            .find_one(
                bson::doc! {
                    "email": email
                },
                None,
            )
            .await?
            .ok_or(Error::Forbidden)
            .tap_err(|_| tracing::debug!("token identity has no user document"))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for UserModel
where
    JwtState: FromRef<S>,
    UserCollection: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let access = parts.extract_with_state::<UserAccess, _>(state).await?;
        let users = UserCollection::from_ref(state);
        Self::from_email(&access.email, &users).await
    }
}

// Role guards: each permits the request only when the stored role matches,
// rejecting everything else with 403.
macro_rules! role_guard {
    ($name:ident, $role:ident) => {
        #[derive(Debug)]
        pub struct $name(pub UserModel);

        #[axum::async_trait]
        impl<S> FromRequestParts<S> for $name
        where
            JwtState: FromRef<S>,
            UserCollection: FromRef<S>,
            S: Send + Sync,
        {
            type Rejection = Error;
            async fn from_request_parts(
                parts: &mut Parts,
                state: &S,
            ) -> Result<Self, Self::Rejection> {
                let user = parts.extract_with_state::<UserModel, _>(state).await?;

                match user.role {
                    UserRole::$role => Ok(Self(user)),
                    _ => Err(Error::Forbidden).tap_err(|_| {
                        tracing::debug!(
                            role = ?user.role,
                            "tried an action requiring the {} role",
                            stringify!($role),
                        )
                    }),
                }
            }
        }
    };
}

role_guard!(SellerAccess, Seller);
role_guard!(BuyerAccess, Buyer);
role_guard!(AdminAccess, Admin);

#[derive(Validate, Serialize, Deserialize, Debug, Clone)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 124))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[serde(default)]
    pub role: UserRole,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserResponse {
    pub id: ObjectIdString,

    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub status: VerificationStatus,

    pub created_at: FormattedDateTime,
}

impl From<UserModel> for UserResponse {
    fn from(value: UserModel) -> Self {
        Self {
            id: value.id.into(),
            name: value.name,
            email: value.email,
            role: value.role,
            status: value.status,

            created_at: value.created_at.into(),
        }
    }
}

/// The unique index on `email` makes the duplicate check and the insert a
/// single store operation; a second registration comes back as a 409.
pub async fn create_user(
    users: UserCollection,
    request: CreateUserRequest,
) -> Result<UserModel, Error> {
    request.validate()?;

    let model = UserModel {
        id: ObjectId::new(),
        name: request.name,
        email: request.email,
        role: request.role,
        status: VerificationStatus::Unverified,
        created_at: OffsetDateTime::now_utc().into(),
    };
    users.insert_unique(&model, "email").await?;

    Ok(model)
}

#[derive(Deserialize, Debug)]
pub struct IssueTokenQuery {
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IssueTokenResponse {
    pub access_token: String,
    pub expired_at: FormattedDateTime,
}

/// Token issuance: only identities already present in the user store get a
/// token; anyone else is refused.
pub async fn issue_token(
    State(users): State<UserCollection>,
    State(jwt_state): State<JwtState>,
    Query(query): Query<IssueTokenQuery>,
) -> Result<Json<IssueTokenResponse>, Error> {
    let user = users
        .find_one(
            bson::doc! {
                "email": &query.email
            },
            None,
        )
        .await?
        .ok_or(Error::Forbidden)
        .tap_err(|_| tracing::debug!("token requested for unknown email"))?;

    let access_token = generate_access_token(&jwt_state, &user)?;

    Ok(Json(IssueTokenResponse {
        access_token: access_token.token,
        expired_at: access_token.expired_at.into(),
    }))
}
