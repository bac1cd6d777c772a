//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema",
        sql: r#"
            -- Staff table; schedule is JSON, normalized on load
            CREATE TABLE IF NOT EXISTS staff (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                role TEXT NOT NULL,
                image TEXT,
                pin_hash TEXT,
                schedule_json TEXT,
                created_at TEXT NOT NULL
            );

            -- Services table
            CREATE TABLE IF NOT EXISTS services (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                price INTEGER NOT NULL CHECK (price >= 0),
                duration_minutes INTEGER NOT NULL DEFAULT 30,
                categories_json TEXT NOT NULL DEFAULT '[]',
                description TEXT NOT NULL DEFAULT '',
                image TEXT
            );

            -- Appointments; never deleted, cancellation is a status
            CREATE TABLE IF NOT EXISTS appointments (
                id TEXT PRIMARY KEY,
                service_id TEXT NOT NULL,
                service_title TEXT NOT NULL,
                service_duration INTEGER NOT NULL,
                staff_id TEXT NOT NULL,
                staff_name TEXT NOT NULL,
                date TEXT NOT NULL,
                time TEXT NOT NULL,
                client_name TEXT NOT NULL,
                client_phone TEXT NOT NULL,
                payment_method TEXT NOT NULL,
                price INTEGER NOT NULL,
                original_price INTEGER NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Add indexes for query performance",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_appointments_staff_date ON appointments(staff_id, date);
            CREATE INDEX IF NOT EXISTS idx_appointments_date ON appointments(date, time);
        "#,
    },
    Migration {
        version: 3,
        description: "Enforce one active appointment per staff slot",
        sql: r#"
            -- Conditional write guard: inserting a second active appointment
            -- for the same slot fails inside the booking transaction
            CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_active_slot
                ON appointments(staff_id, date, time)
                WHERE status <> 'cancelled';
        "#,
    },
    Migration {
        version: 4,
        description: "Add busy slot index",
        sql: r#"
            -- Materialized view of active appointments per staff-day.
            -- Written in the same transaction as appointments.
            CREATE TABLE IF NOT EXISTS busy_slots (
                staff_id TEXT NOT NULL,
                date TEXT NOT NULL,
                time TEXT NOT NULL,
                appointment_id TEXT NOT NULL,
                PRIMARY KEY (staff_id, date, time),
                FOREIGN KEY (appointment_id) REFERENCES appointments(id)
            );

            INSERT OR IGNORE INTO busy_slots (staff_id, date, time, appointment_id)
                SELECT staff_id, date, time, id FROM appointments WHERE status <> 'cancelled';
        "#,
    },
];

/// Initialize the migrations table
fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version
fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .unwrap_or(None);
    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.description,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let current_version = get_current_version(conn)?;
    info!(current_version, "Checking for pending migrations");

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                description = migration.description,
                "Applying migration"
            );

            conn.execute_batch(migration.sql)?;
            record_migration(conn, migration)?;

            info!(version = migration.version, "Migration complete");
        }
    }

    let new_version = get_current_version(conn)?;
    if new_version > current_version {
        info!(
            from = current_version,
            to = new_version,
            "Database schema updated"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Get the latest migration version (test helper)
    fn latest_version() -> u32 {
        MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
    }

    #[test]
    fn test_migrations_run() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let version = get_current_version(&conn).unwrap();
        assert_eq!(version, latest_version());
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_current_version(&conn).unwrap();
        assert_eq!(version, latest_version());
    }

    #[test]
    fn test_migrations_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(
                migration.version as usize,
                i + 1,
                "Migration {} should have version {}",
                migration.description,
                i + 1
            );
        }
    }

    #[test]
    fn test_active_slot_index_ignores_cancelled() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let insert = |id: &str, status: &str| {
            conn.execute(
                "INSERT INTO appointments (id, service_id, service_title, service_duration, staff_id,
                     staff_name, date, time, client_name, client_phone, payment_method, price,
                     original_price, status, created_at)
                 VALUES (?1, 's', 'Corte', 30, 'staff', 'Lucas', '2030-01-07', '09:00', 'Ana',
                     '555', 'cash', 1000, 1000, ?2, '2030-01-01T00:00:00Z')",
                rusqlite::params![id, status],
            )
        };

        insert("a", "cancelled").unwrap();
        insert("b", "confirmed").unwrap();
        assert!(insert("c", "confirmed").is_err());
        insert("d", "cancelled").unwrap();
    }
}
