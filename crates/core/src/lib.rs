//! Salon Core Library
//!
//! Schedules, slot generation, availability and the booking desk for a
//! barbershop or salon, on top of a SQLite store or a local-only snapshot.

pub mod auth;
pub mod availability;
pub mod booking;
pub mod draft;
pub mod error;
pub mod invariants;
pub mod models;
pub mod schedule;
pub mod slots;
pub mod stats;
pub mod storage;

pub use availability::{is_available, mark_slots, BusySlotIndex, SlotAvailability};
pub use booking::{Actor, BookingDesk, BookingPolicy, BookingRequest};
pub use draft::{BookingDraft, DraftStep};
pub use error::{BookingError, Error, Result};
pub use models::*;
pub use schedule::{normalize, normalize_json, DaySchedule, RawSchedule, WeeklySchedule};
pub use slots::{fits_service, generate_slots, slots_for_service};
pub use stats::DashboardStats;
pub use storage::{
    AppointmentFilter, AppointmentRepository, BookingBackend, Catalog, ClaimOutcome, Database,
    Durability, LocalStore, ServiceRepository, StaffRepository,
};
