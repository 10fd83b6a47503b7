//! Stripe API client for course payments.
//!
//! Two operations back the purchase flow: creating a payment intent for
//! the client to confirm, and retrieving one to verify that a payment
//! actually succeeded before an order is recorded. Verification is
//! server-side: the client's claim of success is never trusted.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::config::StripeConfig;

/// Stripe API base URL.
const BASE_URL: &str = "https://api.stripe.com/v1";

/// Errors that can occur when interacting with the Stripe API.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The payment intent exists but has not succeeded.
    #[error("payment not authorized (status: {0})")]
    NotSucceeded(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A payment intent as returned by the Stripe API.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
}

impl StripeClient {
    /// Create a new Stripe API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| PaymentError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    /// Create a payment intent for an amount in minor units (cents).
    ///
    /// Returns the intent whose `client_secret` the client uses to
    /// confirm the payment.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        let url = format!("{BASE_URL}/payment_intents");

        // Stripe takes form-encoded bodies, not JSON.
        let params = [
            ("amount", amount_minor.to_string()),
            ("currency", currency.to_lowercase()),
            ("metadata[company]", "Learnly".to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];

        let response = self.client.post(&url).form(&params).send().await?;
        parse_intent(response).await
    }

    /// Retrieve a payment intent by id.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError> {
        let url = format!("{BASE_URL}/payment_intents/{}", urlencoding::encode(id));

        let response = self.client.get(&url).send().await?;
        parse_intent(response).await
    }

    /// Verify that a payment intent has succeeded.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotSucceeded` if the intent exists but is
    /// in any state other than `succeeded`.
    pub async fn verify_payment(&self, id: &str) -> Result<PaymentIntent, PaymentError> {
        let intent = self.retrieve_payment_intent(id).await?;

        if intent.status != "succeeded" {
            return Err(PaymentError::NotSucceeded(intent.status));
        }

        Ok(intent)
    }
}

/// Read a Stripe response into a `PaymentIntent`, surfacing API errors.
async fn parse_intent(response: reqwest::Response) -> Result<PaymentIntent, PaymentError> {
    let status = response.status();

    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| PaymentError::Parse(e.to_string()))
}
