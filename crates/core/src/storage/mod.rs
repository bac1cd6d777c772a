//! SQLite storage layer for Salon

mod appointments;
mod local;
mod migrations;
mod parse;
mod services;
mod staff;
mod traits;

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::instrument;
use uuid::Uuid;

use crate::availability::BusySlotIndex;
use crate::error::Result;
use crate::models::{Appointment, AppointmentStatus, Service, Staff};
use crate::schedule::WeeklySchedule;

pub use appointments::AppointmentStore;
pub use local::{LocalSnapshot, LocalStore};
pub use services::ServiceStore;
pub use staff::StaffStore;
pub use traits::{
    AppointmentFilter, AppointmentRepository, BookingBackend, Catalog, ClaimOutcome, Durability,
    ServiceRepository, StaffRepository,
};

/// How long a writer waits for another connection's transaction by default
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open or create database, waiting up to `busy_timeout` for locks
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open_with_timeout<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        // journal_mode returns a row, so it cannot go through execute_batch
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Get staff store
    pub fn staff(&self) -> StaffStore<'_> {
        StaffStore::new(&self.conn)
    }

    /// Get service store
    pub fn services(&self) -> ServiceStore<'_> {
        ServiceStore::new(&self.conn)
    }

    /// Get appointment store
    pub fn appointments(&self) -> AppointmentStore<'_> {
        AppointmentStore::new(&self.conn)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl Catalog for Database {
    fn find_staff(&self, id: Uuid) -> Result<Option<Staff>> {
        self.staff().find_by_id(id)
    }

    fn find_service(&self, id: Uuid) -> Result<Option<Service>> {
        self.services().find_by_id(id)
    }
}

impl StaffRepository for Database {
    fn create_staff(&self, staff: &Staff) -> Result<()> {
        self.staff().create(staff)
    }

    fn list_staff(&self) -> Result<Vec<Staff>> {
        self.staff().list()
    }

    fn update_schedule(&self, staff_id: Uuid, schedule: &WeeklySchedule) -> Result<()> {
        self.staff().update_schedule(staff_id, schedule)
    }

    fn set_pin_hash(&self, staff_id: Uuid, pin_hash: Option<&str>) -> Result<()> {
        self.staff().set_pin_hash(staff_id, pin_hash)
    }
}

impl ServiceRepository for Database {
    fn create_service(&self, service: &Service) -> Result<()> {
        self.services().create(service)
    }

    fn list_services(&self) -> Result<Vec<Service>> {
        self.services().list()
    }

    fn update_price(&self, service_id: Uuid, price: i64) -> Result<()> {
        self.services().update_price(service_id, price)
    }
}

impl AppointmentRepository for Database {
    fn durability(&self) -> Durability {
        Durability::Durable
    }

    fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        self.appointments().find_by_id(id)
    }

    fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        self.appointments().list(filter)
    }

    fn busy_index(&self, staff_id: Uuid, date: NaiveDate) -> Result<BusySlotIndex> {
        self.appointments().busy_index(staff_id, date)
    }

    fn claim_slot(&self, appointment: &Appointment) -> Result<ClaimOutcome> {
        self.appointments().claim(appointment)
    }

    fn transition(&self, id: Uuid, from: AppointmentStatus, to: AppointmentStatus) -> Result<bool> {
        self.appointments().transition(id, from, to)
    }

    fn reclaim_slot(&self, id: Uuid) -> Result<ClaimOutcome> {
        self.appointments().reclaim(id)
    }
}
