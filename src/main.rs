use std::net::SocketAddr;

use axum::{http::Uri, routing, Router};
use budget_wheels::{
    api::v1::{auth, booking, category, payment, product, user},
    app::AppState,
    error::Error,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "budget_wheels=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app_state = AppState::new_from_env().await.unwrap();
    app_state.run_migration().await.unwrap();

    let api = Router::new().nest(
        "/v1",
        Router::new()
            .route("/category", routing::get(category::index))
            .route(
                "/product",
                routing::get(product::index).post(product::create),
            )
            .route("/product/mine", routing::get(product::mine))
            .route("/product/reported", routing::get(product::reported))
            .route("/product/:id", routing::delete(product::delete))
            .route("/product/:id/advertise", routing::put(product::advertise))
            .route("/product/:id/report", routing::put(product::report))
            .route(
                "/booking",
                routing::get(booking::index).post(booking::create),
            )
            .route("/payment-intent", routing::post(payment::create_intent))
            .route("/jwt", routing::get(auth::issue_token))
            .route("/user", routing::post(user::create))
            .route("/user/admin/:email", routing::get(user::is_admin))
            .route("/user/seller/:email", routing::get(user::is_seller))
            .route("/user/buyer/:email", routing::get(user::is_buyer))
            .route("/user/:id", routing::delete(user::delete))
            .route("/user/:id/verify", routing::put(user::verify)),
    );

    let app = Router::new()
        .route(
            "/",
            routing::get(|| async { "Budget wheels server is running" }),
        )
        .nest("/api", api)
        .fallback(fallback)
        .with_state(app_state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive());

    let port = std::env::var("PORT")
        .ok()
        .and_then(|it| it.parse().ok())
        .unwrap_or(5000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::debug!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}

async fn fallback(uri: Uri) -> Error {
    Error::NotFound(uri)
}
