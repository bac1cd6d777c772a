//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use std::collections::HashSet;

use uuid::Uuid;

use crate::availability::BusySlotIndex;
use crate::models::Appointment;
use crate::schedule::{WeeklySchedule, WEEK};

/// Every enabled day must open before it closes
pub fn assert_schedule_invariants(schedule: &WeeklySchedule) {
    for weekday in WEEK {
        let day = schedule.day(weekday);
        debug_assert!(
            !day.enabled || day.start < day.end,
            "{:?} is enabled with window {} - {}",
            weekday,
            day.start,
            day.end
        );
    }
}

/// Validate a freshly built or loaded appointment
pub fn assert_appointment_invariants(appointment: &Appointment) {
    debug_assert!(
        appointment.staff_id != Uuid::nil() && appointment.service_id != Uuid::nil(),
        "Appointment {} has a nil reference",
        appointment.id
    );

    // Discounts only ever lower the price
    debug_assert!(
        0 <= appointment.price && appointment.price <= appointment.original_price,
        "Appointment {} price {} outside 0..={}",
        appointment.id,
        appointment.price,
        appointment.original_price
    );

    debug_assert!(
        !appointment.client_name.trim().is_empty(),
        "Appointment {} has empty client name",
        appointment.id
    );
}

/// At most one active appointment per (staff, date, time)
pub fn assert_no_double_booking(appointments: &[Appointment]) {
    let mut held = HashSet::new();
    for appointment in appointments.iter().filter(|a| a.status.occupies_slot()) {
        debug_assert!(
            held.insert((appointment.staff_id, appointment.date, appointment.time)),
            "Slot {} {} for staff {} is double booked",
            appointment.date,
            appointment.time,
            appointment.staff_id
        );
    }
}

/// The busy index must be derivable from the appointments
pub fn assert_index_consistent(index: &BusySlotIndex, appointments: &[Appointment]) {
    debug_assert!(
        index.is_consistent_with(appointments),
        "Busy index for staff {} on {} disagrees with appointments",
        index.staff_id,
        index.date
    );
}
