use rusqlite::Connection;

use crate::error::Result;

/// Create tables and indexes if they don't exist.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS registrations (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL,
            experience_level TEXT NOT NULL
                CHECK (experience_level IN ('beginner', 'intermediate', 'advanced')),
            motivation TEXT,
            amount_paid INTEGER NOT NULL DEFAULT 0,
            amount_total INTEGER,
            payment_percentage TEXT NOT NULL
                CHECK (payment_percentage IN ('25', '50', '100')),
            promo_code TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'confirmed', 'cancelled')),
            transaction_id TEXT UNIQUE,
            remaining_transaction_id TEXT UNIQUE,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_registrations_email
            ON registrations (email);

        -- Dedup markers for payment confirmations. One row per transaction id
        -- that has been applied; a second delivery of the same id finds the
        -- row and becomes a no-op.
        CREATE TABLE IF NOT EXISTS payment_events (
            id TEXT PRIMARY KEY,
            transaction_id TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL
        );
        "#,
    )?;

    Ok(())
}
