use axum::{
    extract::{Query, State},
    Json,
};
use bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::{
    error::Error,
    mongo_ext::Collection,
    util::{FormattedDateTime, ObjectIdString},
};

use super::auth::UserAccess;

#[derive(Clone)]
pub struct BookingCollection(pub Collection<BookingModel>);

impl std::ops::Deref for BookingCollection {
    type Target = Collection<BookingModel>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BookingModel {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub buyer_name: String,
    pub email: String,
    pub brand: String,
    pub series: String,
    pub price: Decimal,

    pub created_at: bson::DateTime,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: ObjectIdString,

    pub buyer_name: String,
    pub email: String,
    pub brand: String,
    pub series: String,
    pub price: Decimal,

    pub created_at: FormattedDateTime,
}

impl From<BookingModel> for Booking {
    fn from(value: BookingModel) -> Self {
        Self {
            id: value.id.into(),
            buyer_name: value.buyer_name,
            email: value.email,
            brand: value.brand,
            series: value.series,
            price: value.price,
            created_at: value.created_at.into(),
        }
    }
}

#[derive(Validate, Serialize, Deserialize, Debug, Clone)]
pub struct CreateRequest {
    #[validate(length(min = 1, max = 124))]
    pub buyer_name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 124))]
    pub brand: String,

    #[validate(length(min = 1, max = 124))]
    pub series: String,

    pub price: Decimal,
}

/// The unique index on (buyer_name, email, brand, series) rejects a second
/// identical booking at the store, not with a racy pre-read.
pub async fn create(
    State(bookings): State<BookingCollection>,
    Json(request): Json<CreateRequest>,
) -> Result<Json<Booking>, Error> {
    request.validate()?;

    let model = BookingModel {
        id: ObjectId::new(),
        buyer_name: request.buyer_name,
        email: request.email,
        brand: request.brand,
        series: request.series,
        price: request.price,
        created_at: OffsetDateTime::now_utc().into(),
    };

    bookings.insert_unique(&model, "booking").await?;

    Ok(Json(model.into()))
}

#[derive(Deserialize, Debug)]
pub struct IndexQuery {
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IndexResponse {
    pub bookings: Vec<Booking>,
}

/// Email-scoped listing: the query email must equal the token identity.
pub async fn index(
    user: UserAccess,
    State(bookings): State<BookingCollection>,
    Query(query): Query<IndexQuery>,
) -> Result<Json<IndexResponse>, Error> {
    user.assert_owner(&query.email)?;

    let bookings = bookings
        .find_all(bson::doc! { "email": &query.email })
        .await?;

    Ok(Json(IndexResponse {
        bookings: bookings.into_iter().map(Into::into).collect(),
    }))
}
