//! Registration submission and payment intent creation.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{self, AppState};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::handlers::common;
use crate::id;
use crate::models::{CreateRegistration, ExperienceLevel, PaymentPercentage, RegistrationStatus};
use crate::payments::PaymentIntent;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub experience_level: ExperienceLevel,
    #[serde(default)]
    pub motivation: Option<String>,
    /// Amount due now in HTG, already scaled to the chosen plan's share.
    pub amount: i64,
    pub payment_percentage: PaymentPercentage,
    #[serde(default)]
    pub promo_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub registration_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    pub status: RegistrationStatus,
    pub message: String,
}

fn validate(req: &RegisterRequest) -> Result<()> {
    if req.full_name.trim().is_empty() {
        return Err(AppError::BadRequest("full_name is required".to_string()));
    }
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(AppError::BadRequest("a valid email is required".to_string()));
    }
    if req.phone.trim().is_empty() {
        return Err(AppError::BadRequest("phone is required".to_string()));
    }
    if req.amount < 0 {
        return Err(AppError::BadRequest("amount must not be negative".to_string()));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    validate(&req)?;

    // Promo codes can bring the amount due to zero; nothing to collect, the
    // registration confirms immediately.
    if req.amount == 0 {
        let registration = {
            let conn = state.db.get()?;
            db::create_registration(
                &conn,
                &CreateRegistration {
                    full_name: req.full_name.trim().to_string(),
                    email: req.email.trim().to_lowercase(),
                    phone: req.phone.trim().to_string(),
                    experience_level: req.experience_level,
                    motivation: req.motivation.clone(),
                    amount_paid: 0,
                    payment_percentage: req.payment_percentage,
                    promo_code: req.promo_code.clone(),
                    status: RegistrationStatus::Confirmed,
                    transaction_id: None,
                },
            )?
        };

        common::send_access_email(&state, &registration).await;

        return Ok(Json(RegisterResponse {
            success: true,
            registration_id: registration.id,
            transaction_id: None,
            payment_url: None,
            status: RegistrationStatus::Confirmed,
            message: "Inscription confirmée".to_string(),
        }));
    }

    let transaction_id = id::initial_transaction_id();

    let registration = {
        let conn = state.db.get()?;
        db::create_registration(
            &conn,
            &CreateRegistration {
                full_name: req.full_name.trim().to_string(),
                email: req.email.trim().to_lowercase(),
                phone: req.phone.trim().to_string(),
                experience_level: req.experience_level,
                motivation: req.motivation.clone(),
                amount_paid: req.amount,
                payment_percentage: req.payment_percentage,
                promo_code: req.promo_code.clone(),
                status: RegistrationStatus::Pending,
                transaction_id: Some(transaction_id.clone()),
            },
        )?
    };

    let callback_url = format!("{}/webhook/bazik", state.base_url);
    let return_url = format!("{}/#inscription", state.base_url);
    let intent = state
        .bazik
        .create_payment_intent(&PaymentIntent {
            amount: req.amount,
            transaction_id: &transaction_id,
            full_name: &registration.full_name,
            email: &registration.email,
            phone: &registration.phone,
            description: "Enskripsyon seminè",
            callback_url: &callback_url,
            return_url: &return_url,
        })
        .await;

    // Intent failure is not fatal: the row stays pending and the payer can
    // retry through verification or a fresh link.
    let message = if intent.success {
        "Inscription enregistrée, paiement en attente".to_string()
    } else {
        tracing::warn!(
            registration_id = registration.id,
            transaction_id,
            "Payment intent creation failed: {}",
            intent.message.as_deref().unwrap_or("no details")
        );
        "Inscription enregistrée, le lien de paiement n'a pas pu être créé".to_string()
    };

    Ok(Json(RegisterResponse {
        success: intent.success,
        registration_id: registration.id,
        transaction_id: Some(transaction_id),
        payment_url: intent.payment_url,
        status: RegistrationStatus::Pending,
        message,
    }))
}
