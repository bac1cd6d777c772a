//! Storage repository traits
//!
//! These traits define the storage interface, allowing for different
//! implementations (SQLite, local snapshot, mocks).

use chrono::NaiveDate;
use uuid::Uuid;

use crate::availability::BusySlotIndex;
use crate::error::Result;
use crate::models::{Appointment, AppointmentStatus, Service, Staff};
use crate::schedule::WeeklySchedule;

/// Guarantee level of a store's booking path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// Shared store; conflicting bookings from any client are rejected
    Durable,
    /// This device only; no protection against bookings made elsewhere
    Local,
}

impl std::fmt::Display for Durability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Durability::Durable => write!(f, "durable"),
            Durability::Local => write!(f, "local only"),
        }
    }
}

/// Result of an atomic attempt to take a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    /// Another active appointment holds the slot
    Taken,
}

/// Appointment list filter; `None` fields match everything
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub staff_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn for_staff_day(staff_id: Uuid, date: NaiveDate) -> Self {
        Self {
            staff_id: Some(staff_id),
            date: Some(date),
            status: None,
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.staff_id.map_or(true, |id| appointment.staff_id == id)
            && self.date.map_or(true, |d| appointment.date == d)
            && self.status.map_or(true, |s| appointment.status == s)
    }
}

/// Read-only lookups the booking path needs
pub trait Catalog {
    /// Find staff member by ID
    fn find_staff(&self, id: Uuid) -> Result<Option<Staff>>;

    /// Find service by ID
    fn find_service(&self, id: Uuid) -> Result<Option<Service>>;
}

/// Staff administration
pub trait StaffRepository {
    fn create_staff(&self, staff: &Staff) -> Result<()>;

    fn list_staff(&self) -> Result<Vec<Staff>>;

    fn update_schedule(&self, staff_id: Uuid, schedule: &WeeklySchedule) -> Result<()>;

    /// Set or clear the hashed PIN
    fn set_pin_hash(&self, staff_id: Uuid, pin_hash: Option<&str>) -> Result<()>;
}

/// Service administration
pub trait ServiceRepository {
    fn create_service(&self, service: &Service) -> Result<()>;

    fn list_services(&self) -> Result<Vec<Service>>;

    /// Change the list price. Existing appointments keep their snapshot.
    fn update_price(&self, service_id: Uuid, price: i64) -> Result<()>;
}

/// The shared appointment collection.
///
/// Only the booking desk writes through this trait. Every write is atomic
/// with respect to other writers on the same `(staff, date, time)` key.
pub trait AppointmentRepository {
    fn durability(&self) -> Durability;

    fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>>;

    /// Appointments matching `filter`, ordered by date then time
    fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>>;

    /// Occupied slots for one staff member on one date
    fn busy_index(&self, staff_id: Uuid, date: NaiveDate) -> Result<BusySlotIndex> {
        let appointments = self.list_appointments(&AppointmentFilter::for_staff_day(staff_id, date))?;
        Ok(BusySlotIndex::from_appointments(staff_id, date, &appointments))
    }

    /// Insert `appointment` only if no active appointment holds its slot
    fn claim_slot(&self, appointment: &Appointment) -> Result<ClaimOutcome>;

    /// Compare-and-set the status. Returns false if the current status was
    /// not `from` (or the appointment does not exist). Moving to `Cancelled`
    /// frees the slot in the same step.
    fn transition(&self, id: Uuid, from: AppointmentStatus, to: AppointmentStatus) -> Result<bool>;

    /// Move a cancelled appointment back to `Confirmed`, re-taking its slot
    /// only if it is still free.
    fn reclaim_slot(&self, id: Uuid) -> Result<ClaimOutcome>;
}

/// Everything the booking desk needs
pub trait BookingBackend: Catalog + AppointmentRepository {}

// Blanket implementation: any catalog that is also an appointment store
impl<T> BookingBackend for T where T: Catalog + AppointmentRepository {}
