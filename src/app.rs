use axum::extract::FromRef;

use crate::{
    api::v1::{
        auth::UserCollection, booking::BookingCollection, category::CategoryCollection,
        payment::PaymentClient, product::ProductCollection, token::JwtState,
    },
    migrate::MigrationCollection,
};

#[derive(FromRef, Clone)]
pub struct AppState {
    pub jwt_state: JwtState,
    pub payment_client: PaymentClient,

    pub mongo_client: mongodb::Client,
    pub migrate_collection: MigrationCollection,
    pub user_collection: UserCollection,
    pub product_collection: ProductCollection,
    pub booking_collection: BookingCollection,
    pub category_collection: CategoryCollection,
}

impl AppState {
    pub async fn new(
        mongo_url: &str,
        database_name: &str,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let jwt_state = JwtState::new_from_env();
        let payment_client = PaymentClient::new_from_env();

        let mongo_client_opt = mongodb::options::ClientOptions::parse(mongo_url).await?;
        let mongo_client = mongodb::Client::with_options(mongo_client_opt)?;

        let db = mongo_client.database(database_name);
        Ok(Self {
            jwt_state,
            payment_client,

            mongo_client,
            migrate_collection: MigrationCollection(db.collection("migrations").into()),
            user_collection: UserCollection(db.collection("users").into()),
            product_collection: ProductCollection(db.collection("products").into()),
            booking_collection: BookingCollection(db.collection("bookings").into()),
            category_collection: CategoryCollection(db.collection("categories").into()),
        })
    }

    pub async fn new_from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let mongodb_url = &std::env::var("MONGODB_URI")
            .expect("Cannot retrieve MONGODB_URI from environment variable.");

        Self::new(mongodb_url, "budget_wheels").await
    }
}
