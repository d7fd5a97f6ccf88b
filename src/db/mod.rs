mod queries;
mod schema;

pub use queries::*;
pub use schema::init_db;

use r2d2_sqlite::SqliteConnectionManager;

use crate::email::EmailService;
use crate::payments::BazikClient;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    r2d2::Pool::new(manager)
}

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub bazik: BazikClient,
    pub email: EmailService,
    /// App base URL used to build return and fallback payment links.
    pub base_url: String,
}
