use axum::{extract::State, http::StatusCode, Json};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Bridge to the payment processor. Holds a pooled HTTP client and the
/// account secret; safe to clone into every request task.
#[derive(Clone)]
pub struct PaymentClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

impl PaymentClient {
    pub fn new(secret_key: String, api_base: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            api_base,
        }
    }

    pub fn new_from_env() -> Self {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .expect("Cannot retrieve STRIPE_SECRET_KEY from environment variable.");
        let api_base =
            std::env::var("STRIPE_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

        Self::new(secret_key, api_base)
    }

    /// One create-intent call restricted to card payment methods. No retry,
    /// no idempotency key.
    pub async fn create_card_intent(
        &self,
        amount: i64,
        currency: &str,
    ) -> Result<PaymentIntent, Error> {
        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("amount", amount.to_string()),
                ("currency", currency.to_string()),
                ("payment_method_types[]", "card".to_string()),
            ])
            .send()
            .await
            .map_err(Error::PaymentUnavailable)?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::PaymentRejected(body));
        }

        response.json().await.map_err(Error::PaymentUnavailable)
    }
}

/// Minor-unit conversion: the processor wants cents.
pub fn to_minor_units(price: Decimal) -> Result<i64, Error> {
    if price < 0.into() {
        return Err(Error::CustomStr(
            StatusCode::UNPROCESSABLE_ENTITY,
            "price must not be negative",
        ));
    }

    price
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|it| it.trunc())
        .and_then(|it| it.to_i64())
        .ok_or(Error::CustomStr(
            StatusCode::UNPROCESSABLE_ENTITY,
            "price is out of range",
        ))
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateIntentRequest {
    pub price: Decimal,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateIntentResponse {
    pub client_secret: String,
}

pub async fn create_intent(
    State(payments): State<PaymentClient>,
    Json(request): Json<CreateIntentRequest>,
) -> Result<Json<CreateIntentResponse>, Error> {
    let amount = to_minor_units(request.price)?;

    let intent = payments.create_card_intent(amount, "usd").await?;

    Ok(Json(CreateIntentResponse {
        client_secret: intent.client_secret,
    }))
}
