//! Transactional email via the Resend API.
//!
//! Two messages exist: the course access email sent on confirmation, and the
//! remaining-balance reminder sent after a completed partial payment. The
//! message type is an enum so each variant's required fields are enforced
//! structurally rather than by runtime validation.

use std::time::Duration;

use serde_json::json;

use crate::error::{AppError, Result};

const RESEND_URL: &str = "https://api.resend.com/emails";

/// Backoff schedule in seconds for retryable send failures.
const RETRY_DELAYS: [u64; 3] = [1, 4, 16];

#[derive(Debug, Clone)]
pub enum EmailMessage {
    /// Full access granted: invite link to the course platform.
    FormationAccess { to: String, full_name: String },
    /// Partial payment received: link to settle the outstanding balance.
    RemainingPayment {
        to: String,
        full_name: String,
        amount_remaining: i64,
        percentage_paid: String,
        payment_link: String,
    },
}

impl EmailMessage {
    fn to(&self) -> &str {
        match self {
            Self::FormationAccess { to, .. } => to,
            Self::RemainingPayment { to, .. } => to,
        }
    }

    fn subject(&self) -> String {
        match self {
            Self::FormationAccess { .. } => {
                "Byenveni nan seminè a! Aksè ou aktive".to_string()
            }
            Self::RemainingPayment {
                amount_remaining, ..
            } => format!("Peman pasyèl resevwa - {} HTG rete", amount_remaining),
        }
    }

    fn html(&self, course_invite_url: &str) -> String {
        match self {
            Self::FormationAccess { full_name, .. } => format!(
                "<h2>Bonjou {full_name},</h2>\
                 <p>Enskripsyon ou konfime! Peman ou resevwa nèt.</p>\
                 <p>Klike sou lyen sa a pou w antre nan platfòm fòmasyon an:</p>\
                 <p><a href=\"{course_invite_url}\">{course_invite_url}</a></p>\
                 <p>N ap tann ou!</p>"
            ),
            Self::RemainingPayment {
                full_name,
                amount_remaining,
                percentage_paid,
                payment_link,
                ..
            } => format!(
                "<h2>Bonjou {full_name},</h2>\
                 <p>Nou resevwa premye peman ou ({percentage_paid}% nan total la). Mèsi!</p>\
                 <p>Li rete <strong>{amount_remaining} HTG</strong> pou w peye \
                 pou w jwenn aksè konplè nan seminè a.</p>\
                 <p>Klike la a pou w fini peman an:</p>\
                 <p><a href=\"{payment_link}\">Peye balans lan</a></p>"
            ),
        }
    }
}

/// Result of a send attempt. Disabled means no API key is configured,
/// which is a normal state in development.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSendResult {
    Sent,
    Disabled,
}

#[derive(Clone)]
pub struct EmailService {
    client: reqwest::Client,
    api_key: Option<String>,
    from_email: String,
    course_invite_url: String,
}

impl EmailService {
    pub fn new(api_key: Option<String>, from_email: String, course_invite_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            from_email,
            course_invite_url,
        }
    }

    /// Send a message, retrying on rate limits, 5xx answers and transport
    /// errors with the fixed backoff schedule. 4xx answers other than 429
    /// are not retried.
    pub async fn send(&self, message: &EmailMessage) -> Result<EmailSendResult> {
        let Some(api_key) = &self.api_key else {
            tracing::warn!(to = message.to(), "Email disabled, no API key configured");
            return Ok(EmailSendResult::Disabled);
        };

        let body = json!({
            "from": self.from_email,
            "to": [message.to()],
            "subject": message.subject(),
            "html": message.html(&self.course_invite_url),
        });

        let mut last_error = String::new();

        for attempt in 0..=RETRY_DELAYS.len() {
            match self
                .client
                .post(RESEND_URL)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    tracing::info!(to = message.to(), "Email sent");
                    return Ok(EmailSendResult::Sent);
                }
                Ok(response) => {
                    let status = response.status();
                    let retryable =
                        status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                    last_error = format!("Resend returned {}", status);
                    if !retryable {
                        break;
                    }
                }
                Err(e) => {
                    last_error = format!("send failed: {}", e);
                }
            }

            let Some(delay) = RETRY_DELAYS.get(attempt) else {
                break;
            };
            tracing::warn!(
                to = message.to(),
                attempt = attempt + 1,
                "Email send failed, retrying: {}",
                last_error
            );
            tokio::time::sleep(Duration::from_secs(*delay)).await;
        }

        Err(AppError::Internal(format!("email delivery failed: {}", last_error)))
    }
}
