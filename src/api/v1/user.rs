use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tap::TapFallible;

use crate::{error::Error, util::PathObjectId};

use super::{
    auth::{AdminAccess, CreateUserRequest, UserCollection, UserResponse, UserRole, VerificationStatus},
    product::ProductCollection,
};

pub async fn create(
    State(users): State<UserCollection>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<UserResponse>, Error> {
    let model = super::auth::create_user(users, request).await?;

    Ok(Json(model.into()))
}

async fn has_role(users: &UserCollection, email: &str, role: UserRole) -> Result<bool, Error> {
    let user = users
        .find_one(
            bson::doc! {
                "email": email
            },
            None,
        )
        .await?;

    Ok(matches!(user, Some(user) if user.role == role))
}

#[derive(Serialize, Deserialize, Debug)]
pub struct IsAdminResponse {
    pub is_admin: bool,
}

pub async fn is_admin(
    State(users): State<UserCollection>,
    Path(email): Path<String>,
) -> Result<Json<IsAdminResponse>, Error> {
    Ok(Json(IsAdminResponse {
        is_admin: has_role(&users, &email, UserRole::Admin).await?,
    }))
}

#[derive(Serialize, Deserialize, Debug)]
pub struct IsSellerResponse {
    pub is_seller: bool,
}

pub async fn is_seller(
    State(users): State<UserCollection>,
    Path(email): Path<String>,
) -> Result<Json<IsSellerResponse>, Error> {
    Ok(Json(IsSellerResponse {
        is_seller: has_role(&users, &email, UserRole::Seller).await?,
    }))
}

#[derive(Serialize, Deserialize, Debug)]
pub struct IsBuyerResponse {
    pub is_buyer: bool,
}

pub async fn is_buyer(
    State(users): State<UserCollection>,
    Path(email): Path<String>,
) -> Result<Json<IsBuyerResponse>, Error> {
    Ok(Json(IsBuyerResponse {
        is_buyer: has_role(&users, &email, UserRole::Buyer).await?,
    }))
}

#[tracing::instrument(
    skip_all,
    fields(
        admin = %admin.0.email,
        id = %user_id,
    )
)]
pub async fn delete(
    State(users): State<UserCollection>,
    admin: AdminAccess,
    PathObjectId(user_id): PathObjectId,
) -> Result<(), Error> {
    let deleted = users.delete_one_by_id(user_id).await?;

    if deleted == 0 {
        return Err(Error::NoResource)
            .tap_err(|_| tracing::debug!("tried deleting non existing user"));
    }

    Ok(())
}

/// Admin marks an account as verified. Products owned by a verified seller
/// carry the badge too, so the seller's products are stamped in the same go.
#[tracing::instrument(
    skip_all,
    fields(
        admin = %admin.0.email,
        id = %user_id,
    )
)]
pub async fn verify(
    State(users): State<UserCollection>,
    State(products): State<ProductCollection>,
    admin: AdminAccess,
    PathObjectId(user_id): PathObjectId,
) -> Result<Json<UserResponse>, Error> {
    let user = users
        .find_one_by_id(user_id)
        .await?
        .ok_or(Error::NoResource)
        .tap_err(|_| tracing::debug!("tried verifying non existing user"))?;

    users
        .update_one(
            bson::doc! { "_id": user_id },
            bson::doc! { "$set": { "status": bson::to_bson(&VerificationStatus::Verified)? } },
            None,
        )
        .await?;

    products
        .update_many(
            bson::doc! { "seller_email": &user.email },
            bson::doc! { "$set": { "status": bson::to_bson(&VerificationStatus::Verified)? } },
            None,
        )
        .await?;

    let user = users
        .find_one_by_id(user_id)
        .await?
        .ok_or(Error::NoResource)?;

    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use axum::{extract::Path, Json};
    use bson::oid::ObjectId;

    use crate::{
        api::v1::{
            auth::{CreateUserRequest, UserRole, VerificationStatus},
            tests::bootstrap,
        },
        error::Error,
        util::PathObjectId,
    };

    #[tokio::test]
    #[ignore = "requires MONGODB_URI pointing at a running MongoDB"]
    pub async fn test_create_then_role_flags() {
        let bootstrap = bootstrap().await;

        let Json(user) = super::create(
            bootstrap.user_collection(),
            Json(CreateUserRequest {
                name: "buyer".to_string(),
                email: "buyer@test.com".to_string(),
                role: UserRole::Buyer,
            }),
        )
        .await
        .unwrap();

        assert_eq!(user.role, UserRole::Buyer);
        assert_eq!(user.status, VerificationStatus::Unverified);

        let Json(buyer) = super::is_buyer(
            bootstrap.user_collection(),
            Path("buyer@test.com".to_string()),
        )
        .await
        .unwrap();
        assert!(buyer.is_buyer);

        let Json(seller) = super::is_seller(
            bootstrap.user_collection(),
            Path("buyer@test.com".to_string()),
        )
        .await
        .unwrap();
        assert!(!seller.is_seller);

        let Json(admin) = super::is_admin(
            bootstrap.user_collection(),
            Path("nobody@test.com".to_string()),
        )
        .await
        .unwrap();
        assert!(!admin.is_admin);
    }

    #[tokio::test]
    #[ignore = "requires MONGODB_URI pointing at a running MongoDB"]
    pub async fn test_duplicate_create_conflicts() {
        let bootstrap = bootstrap().await;

        let request = CreateUserRequest {
            name: "buyer".to_string(),
            email: "dup@test.com".to_string(),
            role: UserRole::Buyer,
        };

        let _ = super::create(bootstrap.user_collection(), Json(request.clone()))
            .await
            .unwrap();

        let err = super::create(bootstrap.user_collection(), Json(request))
            .await
            .expect_err("second create must conflict");
        assert_matches!(err, Error::AlreadyExists("email"));
    }

    #[tokio::test]
    #[ignore = "requires MONGODB_URI pointing at a running MongoDB"]
    pub async fn test_admin_can_delete_user() {
        let bootstrap = bootstrap().await;

        let buyer = bootstrap.derive("buyer@test.com", UserRole::Buyer).await;

        super::delete(
            bootstrap.user_collection(),
            bootstrap.admin_access().await,
            PathObjectId(buyer.user_id()),
        )
        .await
        .unwrap();

        let err = super::delete(
            bootstrap.user_collection(),
            bootstrap.admin_access().await,
            PathObjectId(buyer.user_id()),
        )
        .await
        .expect_err("user is already gone");
        assert_matches!(err, Error::NoResource);
    }

    #[tokio::test]
    #[ignore = "requires MONGODB_URI pointing at a running MongoDB"]
    pub async fn test_verify_stamps_user_and_their_products() {
        let bootstrap = bootstrap().await;

        let seller = bootstrap.derive("seller@test.com", UserRole::Seller).await;
        let product = seller.create_product("Toyota", "Axio", "Sedan", 100).await;

        let Json(user) = super::verify(
            bootstrap.user_collection(),
            bootstrap.product_collection(),
            bootstrap.admin_access().await,
            PathObjectId(seller.user_id()),
        )
        .await
        .unwrap();
        assert_eq!(user.status, VerificationStatus::Verified);

        let product = bootstrap
            .app_state
            .product_collection
            .find_one_by_id(product.id.into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.status, VerificationStatus::Verified);
    }

    #[tokio::test]
    #[ignore = "requires MONGODB_URI pointing at a running MongoDB"]
    pub async fn test_verify_unknown_user() {
        let bootstrap = bootstrap().await;

        let err = super::verify(
            bootstrap.user_collection(),
            bootstrap.product_collection(),
            bootstrap.admin_access().await,
            PathObjectId(ObjectId::new()),
        )
        .await
        .expect_err("");
        assert_matches!(err, Error::NoResource);
    }
}
