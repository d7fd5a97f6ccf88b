use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// App base URL used to build payment callback/return URLs.
    pub base_url: String,
    pub bazik_base_url: String,
    pub bazik_user_id: String,
    pub bazik_secret_key: String,
    /// Optional webhook shared secret. Absence disables signature
    /// verification entirely (unverified mode).
    pub bazik_webhook_secret: Option<String>,
    pub resend_api_key: Option<String>,
    pub from_email: String,
    /// Invite link to the course platform, sent in the full-access email.
    pub course_invite_url: String,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("SEMPAY_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "sempay.db".to_string()),
            base_url,
            bazik_base_url: env::var("BAZIK_BASE_URL")
                .unwrap_or_else(|_| "https://api.bazik.io".to_string()),
            bazik_user_id: env::var("BAZIK_USER_ID").unwrap_or_default(),
            bazik_secret_key: env::var("BAZIK_SECRET_KEY").unwrap_or_default(),
            bazik_webhook_secret: env::var("BAZIK_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            resend_api_key: env::var("RESEND_API_KEY").ok().filter(|s| !s.is_empty()),
            from_email: env::var("FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@sempay.local".to_string()),
            course_invite_url: env::var("COURSE_INVITE_URL").unwrap_or_default(),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
