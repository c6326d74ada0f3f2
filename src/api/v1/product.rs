use axum::{
    extract::{Query, State},
    Json,
};
use bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tap::TapFallible;
use time::OffsetDateTime;
use validator::Validate;

use crate::{
    error::Error,
    mongo_ext::Collection,
    util::{FormattedDateTime, ObjectIdString, PathObjectId},
};

use super::auth::{AdminAccess, BuyerAccess, SellerAccess, UserModel, UserRole, VerificationStatus};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProductModel {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub seller_email: String,

    pub brand: String,
    pub series: String,
    pub category_name: String,
    pub price: Decimal,

    #[serde(default)]
    pub advertised: bool,
    #[serde(default)]
    pub reported: bool,
    #[serde(default)]
    pub status: VerificationStatus,

    pub created_at: bson::DateTime,
}

#[derive(Clone)]
pub struct ProductCollection(pub Collection<ProductModel>);

impl std::ops::Deref for ProductCollection {
    type Target = Collection<ProductModel>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Product {
    pub id: ObjectIdString,
    pub seller_email: String,

    pub brand: String,
    pub series: String,
    pub category_name: String,
    pub price: Decimal,

    pub advertised: bool,
    pub reported: bool,
    pub status: VerificationStatus,

    pub created_at: FormattedDateTime,
}

impl From<ProductModel> for Product {
    fn from(product: ProductModel) -> Self {
        Self {
            id: product.id.into(),
            seller_email: product.seller_email,

            brand: product.brand,
            series: product.series,
            category_name: product.category_name,
            price: product.price,

            advertised: product.advertised,
            reported: product.reported,
            status: product.status,

            created_at: product.created_at.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IndexResponse {
    pub products: Vec<Product>,
}

#[derive(Deserialize, Debug, Default)]
pub struct IndexQuery {
    pub category: Option<String>,
    pub advertised: Option<bool>,
}

/// Public catalog listing, optionally narrowed by category name and/or the
/// advertised flag.
pub async fn index(
    State(products): State<ProductCollection>,
    Query(query): Query<IndexQuery>,
) -> Result<Json<IndexResponse>, Error> {
    let mut filter = bson::Document::new();

    if let Some(category) = query.category {
        filter.insert("category_name", category);
    }

    if let Some(advertised) = query.advertised {
        filter.insert("advertised", advertised);
    }

    let products = products.find_all(filter).await?;

    Ok(Json(IndexResponse {
        products: products.into_iter().map(Into::into).collect(),
    }))
}

/// A seller's own inventory.
pub async fn mine(
    State(products): State<ProductCollection>,
    seller: SellerAccess,
) -> Result<Json<IndexResponse>, Error> {
    let products = products
        .find_all(bson::doc! { "seller_email": &seller.0.email })
        .await?;

    Ok(Json(IndexResponse {
        products: products.into_iter().map(Into::into).collect(),
    }))
}

/// Reported items for the admin dashboard.
pub async fn reported(
    State(products): State<ProductCollection>,
    _admin: AdminAccess,
) -> Result<Json<IndexResponse>, Error> {
    let products = products.find_all(bson::doc! { "reported": true }).await?;

    Ok(Json(IndexResponse {
        products: products.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Validate, Serialize, Deserialize, Debug, Clone)]
pub struct CreateRequest {
    #[validate(length(min = 1, max = 124))]
    pub brand: String,

    #[validate(length(min = 1, max = 124))]
    pub series: String,

    #[validate(length(min = 1, max = 124))]
    pub category_name: String,

    pub price: Decimal,
}

#[tracing::instrument(
    skip_all,
    fields(
        seller = %seller.0.email,
    )
)]
pub async fn create(
    State(products): State<ProductCollection>,
    seller: SellerAccess,
    Json(request): Json<CreateRequest>,
) -> Result<Json<Product>, Error> {
    request.validate()?;

    if request.price < 0.into() {
        return Err(Error::Forbidden)
            .tap_err(|_| tracing::debug!("tried creating product with price less than 0"));
    }

    let model = ProductModel {
        id: ObjectId::new(),
        seller_email: seller.0.email,
        brand: request.brand,
        series: request.series,
        category_name: request.category_name,
        price: request.price,
        advertised: false,
        reported: false,
        // products inherit the seller's verification badge
        status: seller.0.status,
        created_at: OffsetDateTime::now_utc().into(),
    };

    tracing::debug!("creating product {:#?}", model);
    products.insert_one(&model, None).await?;

    Ok(Json(model.into()))
}

/// The owner predicate lives in the update filter, so the guard and the
/// mutation are one atomic store operation.
#[tracing::instrument(
    skip_all,
    fields(
        seller = %seller.0.email,
        id = %product_id,
    )
)]
pub async fn advertise(
    State(products): State<ProductCollection>,
    seller: SellerAccess,
    PathObjectId(product_id): PathObjectId,
) -> Result<(), Error> {
    let updated = products
        .update_one(
            bson::doc! {
                "_id": product_id,
                "seller_email": &seller.0.email,
            },
            bson::doc! { "$set": { "advertised": true } },
            None,
        )
        .await?;

    if updated.matched_count == 0 {
        return match products.find_one_by_id(product_id).await? {
            Some(_) => Err(Error::Forbidden)
                .tap_err(|_| tracing::debug!("tried advertising another seller's product")),
            None => Err(Error::NoResource)
                .tap_err(|_| tracing::debug!("tried advertising non existing product")),
        };
    }

    Ok(())
}

#[tracing::instrument(
    skip_all,
    fields(
        buyer = %buyer.0.email,
        id = %product_id,
    )
)]
pub async fn report(
    State(products): State<ProductCollection>,
    buyer: BuyerAccess,
    PathObjectId(product_id): PathObjectId,
) -> Result<(), Error> {
    let updated = products
        .update_one(
            bson::doc! { "_id": product_id },
            bson::doc! { "$set": { "reported": true } },
            None,
        )
        .await?;

    if updated.matched_count == 0 {
        return Err(Error::NoResource)
            .tap_err(|_| tracing::debug!("tried reporting non existing product"));
    }

    Ok(())
}

/// Sellers may delete their own products, admins may delete any.
#[tracing::instrument(
    skip_all,
    fields(
        user = %user.email,
        id = %product_id,
    )
)]
pub async fn delete(
    State(products): State<ProductCollection>,
    user: UserModel,
    PathObjectId(product_id): PathObjectId,
) -> Result<(), Error> {
    let deleted = match user.role {
        UserRole::Buyer => {
            return Err(Error::Forbidden)
                .tap_err(|_| tracing::debug!("tried deleting product as buyer"))
        }
        UserRole::Seller => {
            products
                .delete_one(
                    bson::doc! {
                        "_id": product_id,
                        "seller_email": &user.email,
                    },
                    None,
                )
                .await?
                .deleted_count
        }
        UserRole::Admin => products.delete_one_by_id(product_id).await?,
    };

    if deleted == 0 {
        return match products.find_one_by_id(product_id).await? {
            Some(_) => Err(Error::Forbidden)
                .tap_err(|_| tracing::debug!("tried deleting another seller's product")),
            None => Err(Error::NoResource)
                .tap_err(|_| tracing::debug!("tried deleting non existing product")),
        };
    }

    Ok(())
}
