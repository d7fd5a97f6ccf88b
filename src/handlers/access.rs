//! Access recovery: re-send the course access email to a confirmed
//! registrant who lost the original message.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{self, AppState};
use crate::email::EmailMessage;
use crate::error::{AppError, Result};
use crate::extractors::Json;

#[derive(Debug, Deserialize)]
pub struct AccessRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub success: bool,
    pub message: &'static str,
}

pub async fn send_formation_access(
    State(state): State<AppState>,
    Json(req): Json<AccessRequest>,
) -> Result<Json<AccessResponse>> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("a valid email is required".to_string()));
    }

    let registration = {
        let conn = state.db.get()?;
        db::get_latest_confirmed_by_email(&conn, &email)?
    };

    let Some(registration) = registration else {
        return Err(AppError::NotFound(
            "no confirmed registration for this email".to_string(),
        ));
    };

    // Unlike the post-confirmation path, a failure here must surface: the
    // whole point of the call is the email.
    state
        .email
        .send(&EmailMessage::FormationAccess {
            to: registration.email.clone(),
            full_name: registration.full_name.clone(),
        })
        .await?;

    Ok(Json(AccessResponse {
        success: true,
        message: "Email d'accès envoyé",
    }))
}
