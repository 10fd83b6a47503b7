//! Order and payment route handlers.
//!
//! The purchase flow never trusts the client: an order is recorded only
//! after the payment intent is retrieved from Stripe and confirmed
//! succeeded server-side.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use learnly_core::{CourseId, CurrencyCode, Price};

use crate::db::{RepositoryError, courses::CourseRepository, orders::OrderRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::services::auth::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(rename = "courseId")]
    pub course_id: i32,
    pub payment_info: Option<PaymentInfo>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentInfo {
    pub id: String,
}

/// `POST /create-order` — record a purchase after verifying payment.
pub async fn create_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse> {
    let course_id = CourseId::new(req.course_id);

    // Server-side payment verification before anything is written.
    let payment = required_payment_info(req.payment_info.as_ref())?;
    state.payments().verify_payment(&payment.id).await?;

    if user.owns_course(course_id) {
        return Err(AppError::BadRequest(
            "You have already purchased this course".to_string(),
        ));
    }

    let courses = CourseRepository::new(state.pool());
    let course = courses
        .get_by_id(course_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Course".to_string()))?;

    // Order row, ownership, and the purchase counter commit together;
    // a concurrent duplicate purchase rolls all three back.
    let order = OrderRepository::new(state.pool())
        .record_purchase(user.id, course_id, &payment.id)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                AppError::BadRequest("You have already purchased this course".to_string())
            }
            other => AppError::Database(other),
        })?;

    let refreshed = AuthService::new(state.pool()).get_user(user.id).await?;
    state.sessions().insert(&refreshed).await;

    state
        .mailer()
        .send_order_confirmation(user.email.as_str(), &user.name, &course.name)
        .await?;

    tracing::info!(user_id = %user.id, course_id = %course_id, "Order created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "order": order })),
    ))
}

/// `GET /payment/publishable-key` — the client-side Stripe key.
pub async fn publishable_key(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "publishableKey": state.config().stripe.publishable_key,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    /// Amount in major units (e.g. 49.99).
    pub amount: Decimal,
    /// ISO currency code; defaults to USD.
    pub currency: Option<String>,
}

/// `POST /payment` — create a payment intent for the client to confirm.
pub async fn create_payment(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse> {
    let currency: CurrencyCode = req
        .currency
        .as_deref()
        .unwrap_or("USD")
        .to_uppercase()
        .parse()
        .map_err(AppError::BadRequest)?;

    let minor = payment_minor_units(req.amount, currency)?;

    let intent = state
        .payments()
        .create_payment_intent(minor, &currency.code().to_lowercase())
        .await?;

    Ok(Json(json!({
        "success": true,
        "client_secret": intent.client_secret,
    })))
}

/// Purchases always carry payment info; there is no free enrollment path.
fn required_payment_info(info: Option<&PaymentInfo>) -> Result<&PaymentInfo> {
    info.ok_or_else(|| AppError::BadRequest("Payment info is missing".to_string()))
}

/// Convert a major-unit amount to the positive minor units Stripe expects.
fn payment_minor_units(amount: Decimal, currency: CurrencyCode) -> Result<i64> {
    Price::new(amount, currency)
        .minor_units()
        .filter(|minor| *minor > 0)
        .ok_or_else(|| AppError::BadRequest("amount must be positive".to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_payment_info_is_rejected() {
        let result = required_payment_info(None);
        match result {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Payment info is missing"),
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn test_present_payment_info_passes_through() {
        let info = PaymentInfo {
            id: "pi_123".to_string(),
        };
        let passed = required_payment_info(Some(&info)).unwrap();
        assert_eq!(passed.id, "pi_123");
    }

    #[test]
    fn test_payment_amount_converts_to_minor_units() {
        let minor = payment_minor_units(Decimal::new(4999, 2), CurrencyCode::USD).unwrap();
        assert_eq!(minor, 4999);
    }

    #[test]
    fn test_payment_amount_must_be_positive() {
        assert!(payment_minor_units(Decimal::ZERO, CurrencyCode::USD).is_err());
        assert!(payment_minor_units(Decimal::new(-100, 2), CurrencyCode::USD).is_err());
    }
}
