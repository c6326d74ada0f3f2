pub mod auth;
pub mod booking;
pub mod category;
pub mod payment;
pub mod product;
pub mod token;
pub mod user;

#[cfg(test)]
mod tests {
    use axum::extract::{FromRequestParts, State};
    use bson::oid::ObjectId;
    use rust_decimal::Decimal;

    use crate::{app::AppState, error::Error};

    use super::{
        auth::{
            AdminAccess, BuyerAccess, SellerAccess, UserAccess, UserCollection, UserModel,
            UserRole,
        },
        booking::BookingCollection,
        category::CategoryCollection,
        product::{Product, ProductCollection},
        token::JwtState,
    };

    pub struct Bootstrap {
        pub user_model: UserModel,
        pub app_state: AppState,

        database_name: String,
    }

    fn env_defaults() {
        dotenvy::dotenv().ok();

        if std::env::var("JWT_SECRET_KEY").is_err() {
            std::env::set_var("JWT_SECRET_KEY", "test-signing-secret");
        }
        if std::env::var("STRIPE_SECRET_KEY").is_err() {
            std::env::set_var("STRIPE_SECRET_KEY", "sk_test_dummy");
        }
    }

    impl Bootstrap {
        pub fn jwt_state(&self) -> State<JwtState> {
            State(self.app_state.jwt_state.clone())
        }

        pub fn user_collection(&self) -> State<UserCollection> {
            State(self.app_state.user_collection.clone())
        }

        pub fn product_collection(&self) -> State<ProductCollection> {
            State(self.app_state.product_collection.clone())
        }

        pub fn booking_collection(&self) -> State<BookingCollection> {
            State(self.app_state.booking_collection.clone())
        }

        pub fn category_collection(&self) -> State<CategoryCollection> {
            State(self.app_state.category_collection.clone())
        }

        pub fn user_id(&self) -> ObjectId {
            self.user_model.id
        }

        pub fn user_email(&self) -> String {
            self.user_model.email.clone()
        }

        pub fn user_token(&self) -> String {
            super::token::generate_access_token(&self.app_state.jwt_state, &self.user_model)
                .unwrap()
                .token
        }

        pub fn user_access(&self) -> UserAccess {
            UserAccess::from_token(&self.app_state.jwt_state, &self.user_token()).unwrap()
        }

        async fn extract<T>(&self) -> Result<T, Error>
        where
            T: FromRequestParts<AppState, Rejection = Error>,
        {
            let (mut parts, _) = axum::http::request::Request::get("http://localhost")
                .header("Authorization", format!("Bearer {}", self.user_token()))
                .body(())
                .unwrap()
                .into_parts();

            T::from_request_parts(&mut parts, &self.app_state).await
        }

        pub async fn user_model(&self) -> UserModel {
            self.extract().await.unwrap()
        }

        pub async fn seller_access(&self) -> SellerAccess {
            self.extract().await.unwrap()
        }

        pub async fn try_seller_access(&self) -> Result<SellerAccess, Error> {
            self.extract().await
        }

        pub async fn buyer_access(&self) -> BuyerAccess {
            self.extract().await.unwrap()
        }

        pub async fn admin_access(&self) -> AdminAccess {
            self.extract().await.unwrap()
        }

        pub async fn derive(&self, email: &str, role: UserRole) -> Bootstrap {
            let user = create_user(&self.app_state, email, role).await;

            Bootstrap {
                user_model: user,
                app_state: self.app_state.clone(),
                database_name: self.database_name.clone(),
            }
        }

        pub async fn create_product(
            &self,
            brand: &str,
            series: &str,
            category_name: &str,
            price: i64,
        ) -> Product {
            let axum::Json(product) = super::product::create(
                self.product_collection(),
                self.seller_access().await,
                axum::Json(super::product::CreateRequest {
                    brand: brand.to_string(),
                    series: series.to_string(),
                    category_name: category_name.to_string(),
                    price: Decimal::from(price),
                }),
            )
            .await
            .unwrap();

            product
        }
    }

    pub async fn create_user(app: &AppState, email: &str, role: UserRole) -> UserModel {
        super::auth::create_user(
            app.user_collection.clone(),
            super::auth::CreateUserRequest {
                name: email.split('@').next().unwrap().to_string(),
                email: email.to_string(),
                role,
            },
        )
        .await
        .unwrap()
    }

    pub async fn bootstrap() -> Bootstrap {
        env_defaults();

        let mongodb_url = &std::env::var("MONGODB_URI")
            .expect("MONGODB_URI must be set to run store-backed tests");

        let database_name = format!("budget-wheels-test-{}", ObjectId::new());
        let app_state = AppState::new(mongodb_url, &database_name).await.unwrap();
        app_state.run_migration().await.unwrap();

        let user = create_user(&app_state, "admin@test.com", UserRole::Admin).await;

        Bootstrap {
            app_state,
            user_model: user,
            database_name,
        }
    }
}
