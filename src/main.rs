use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sempay::config::Config;
use sempay::db::{self, create_pool, init_db, AppState};
use sempay::email::EmailService;
use sempay::handlers;
use sempay::models::{CreateRegistration, ExperienceLevel, PaymentPercentage, RegistrationStatus};
use sempay::payments::BazikClient;

#[derive(Parser, Debug)]
#[command(name = "sempay")]
#[command(about = "Seminar registration and payment reconciliation service")]
struct Cli {
    /// Seed the database with a dev registration (dev mode only)
    #[arg(long)]
    seed: bool,
}

/// Seeds one pending half-plan registration for local testing.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let existing: i64 = conn
        .query_row("SELECT COUNT(*) FROM registrations", [], |r| r.get(0))
        .expect("Failed to count registrations");
    if existing > 0 {
        tracing::info!("Database already has data, skipping seed");
        return;
    }

    let transaction_id = sempay::id::initial_transaction_id();
    let registration = db::create_registration(
        &conn,
        &CreateRegistration {
            full_name: "Dev Registrant".to_string(),
            email: "dev@sempay.local".to_string(),
            phone: "+50937000000".to_string(),
            experience_level: ExperienceLevel::Beginner,
            motivation: Some("local testing".to_string()),
            amount_paid: 2500,
            payment_percentage: PaymentPercentage::Half,
            promo_code: None,
            status: RegistrationStatus::Pending,
            transaction_id: Some(transaction_id.clone()),
        },
    )
    .expect("Failed to seed dev registration");

    tracing::info!("Seeded dev registration {} ({})", registration.id, transaction_id);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sempay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }
    if config.bazik_webhook_secret.is_none() {
        tracing::warn!("No webhook secret configured, webhook signatures will NOT be verified");
    }
    if config.resend_api_key.is_none() {
        tracing::warn!("No Resend API key configured, emails are disabled");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let bazik = BazikClient::new(
        config.bazik_base_url.clone(),
        config.bazik_user_id.clone(),
        config.bazik_secret_key.clone(),
        config.bazik_webhook_secret.clone(),
    );

    let email = EmailService::new(
        config.resend_api_key.clone(),
        config.from_email.clone(),
        config.course_invite_url.clone(),
    );

    let state = AppState {
        db: db_pool,
        bazik,
        email,
        base_url: config.base_url.clone(),
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set SEMPAY_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    let app = handlers::router(state).layer(TraceLayer::new_for_http());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Sempay server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
