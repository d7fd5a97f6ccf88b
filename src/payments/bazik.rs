//! HTTP client for the Bazik payment provider.
//!
//! Covers the three provider interactions: creating a payment intent,
//! fetching a short-lived access token, and querying a payment's status.
//! Webhook signature verification also lives here since the shared secret
//! belongs to the provider relationship.

use std::time::Duration;

use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Payment intent request parameters.
#[derive(Debug)]
pub struct PaymentIntent<'a> {
    /// Amount due now in HTG.
    pub amount: i64,
    pub transaction_id: &'a str,
    pub full_name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub description: &'a str,
    /// Webhook URL the provider notifies asynchronously.
    pub callback_url: &'a str,
    /// URL the provider redirects the payer to afterwards.
    pub return_url: &'a str,
}

/// Result of a payment intent creation attempt.
///
/// Intent creation is best-effort from the caller's perspective: a failure
/// leaves the registration pending and the payer retries, so this carries a
/// success flag rather than surfacing an Err.
#[derive(Debug, Clone)]
pub struct IntentResult {
    pub success: bool,
    pub payment_url: Option<String>,
    pub message: Option<String>,
}

/// Status query result: the provider either knows the transaction or
/// answers 404 (payment window never opened, or not yet registered).
#[derive(Debug)]
pub enum PollResult {
    Known(Value),
    NotFound,
}

#[derive(Clone)]
pub struct BazikClient {
    client: reqwest::Client,
    base_url: String,
    user_id: String,
    secret_key: String,
    webhook_secret: Option<String>,
}

impl BazikClient {
    pub fn new(
        base_url: String,
        user_id: String,
        secret_key: String,
        webhook_secret: Option<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url,
            user_id,
            secret_key,
            webhook_secret,
        }
    }

    pub fn has_webhook_secret(&self) -> bool {
        self.webhook_secret.is_some()
    }

    /// Create a payment intent and return the hosted payment URL.
    ///
    /// Never returns Err: provider unavailability degrades to an
    /// unsuccessful result so the registration itself still goes through.
    pub async fn create_payment_intent(&self, intent: &PaymentIntent<'_>) -> IntentResult {
        let (first_name, last_name) = split_name(intent.full_name);

        let body = json!({
            "amount": intent.amount,
            "currency": "HTG",
            "transaction_id": intent.transaction_id,
            "customer": {
                "email": intent.email,
                "phone": intent.phone,
                "first_name": first_name,
                "last_name": last_name,
            },
            "description": intent.description,
            "callback_url": intent.callback_url,
            "return_url": intent.return_url,
            "metadata": {
                "transaction_id": intent.transaction_id,
            },
        });

        let response = self
            .client
            .post(format!("{}/v1/payments", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("Payment intent request failed: {}", e);
                return IntentResult {
                    success: false,
                    payment_url: None,
                    message: Some("Payment provider unreachable".to_string()),
                };
            }
        };

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            tracing::error!(
                status = %status,
                transaction_id = intent.transaction_id,
                "Payment intent rejected: {}",
                body
            );
            return IntentResult {
                success: false,
                payment_url: None,
                message: Some(format!("Payment provider returned {}", status)),
            };
        }

        let payment_url = ["payment_url", "paymentUrl", "url"]
            .iter()
            .find_map(|f| body.get(f).and_then(Value::as_str))
            .map(str::to_string);

        if payment_url.is_none() {
            tracing::warn!(
                transaction_id = intent.transaction_id,
                "Payment intent response carried no payment URL"
            );
            return IntentResult {
                success: false,
                payment_url: None,
                message: Some("Payment intent response carried no payment URL".to_string()),
            };
        }

        IntentResult {
            success: true,
            payment_url,
            message: None,
        }
    }

    /// Fetch a short-lived API access token for status queries.
    pub async fn fetch_access_token(&self) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/token", self.base_url))
            .json(&json!({
                "userID": self.user_id,
                "secretKey": self.secret_key,
            }))
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("token request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "token request returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("token response unreadable: {}", e)))?;

        ["access_token", "token"]
            .iter()
            .find_map(|f| body.get(f).and_then(Value::as_str))
            .map(str::to_string)
            .ok_or_else(|| AppError::Provider("token response carried no token".to_string()))
    }

    /// Query a payment's status by our transaction id.
    ///
    /// 404 is a normal answer here, not an error: the payer may never have
    /// opened the payment window.
    pub async fn fetch_payment_status(&self, token: &str, transaction_id: &str) -> Result<PollResult> {
        let response = self
            .client
            .get(format!("{}/moncash/payments/{}", self.base_url, transaction_id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("status request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(PollResult::NotFound);
        }

        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "status request returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("status response unreadable: {}", e)))?;

        Ok(PollResult::Known(body))
    }

    /// Verify a webhook payload's HMAC-SHA256 hex signature in constant time.
    ///
    /// Both the configured secret and the presented signature may carry a
    /// `whsec_` prefix, and the signature may carry a `sha256=` prefix;
    /// all are stripped before comparison. Returns false when no secret is
    /// configured (callers should check has_webhook_secret first).
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool {
        let Some(secret) = &self.webhook_secret else {
            return false;
        };
        let secret = secret.strip_prefix("whsec_").unwrap_or(secret);

        let signature = signature.trim();
        let signature = signature.strip_prefix("whsec_").unwrap_or(signature);
        let signature = signature.strip_prefix("sha256=").unwrap_or(signature);

        let Ok(provided) = hex::decode(signature) else {
            return false;
        };

        let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
            Ok(m) => m,
            Err(_) => return false,
        };
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        if provided.len() != expected.len() {
            return false;
        }

        expected.ct_eq(provided.as_slice()).into()
    }
}

fn split_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or("").to_string();
    let rest: Vec<&str> = parts.collect();
    let last = if rest.is_empty() {
        first.clone()
    } else {
        rest.join(" ")
    };
    (first, last)
}
