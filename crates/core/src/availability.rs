//! Availability checks
//!
//! The appointment collection is the source of truth. [`BusySlotIndex`] is a
//! per staff-day cache of it and can always be rebuilt from appointments.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

use crate::models::Appointment;

/// True unless a non-cancelled appointment holds `(staff_id, date, time)`
pub fn is_available(
    staff_id: Uuid,
    date: NaiveDate,
    time: NaiveTime,
    appointments: &[Appointment],
) -> bool {
    !appointments.iter().any(|a| a.holds(staff_id, date, time))
}

/// A candidate slot with its current occupancy, as shown to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    pub time: NaiveTime,
    pub free: bool,
}

/// Mark each candidate slot free or taken
pub fn mark_slots(
    staff_id: Uuid,
    date: NaiveDate,
    slots: &[NaiveTime],
    appointments: &[Appointment],
) -> Vec<SlotAvailability> {
    let index = BusySlotIndex::from_appointments(staff_id, date, appointments);
    slots
        .iter()
        .map(|&time| SlotAvailability {
            time,
            free: index.is_free(time),
        })
        .collect()
}

/// Occupied times for one staff member on one date
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusySlotIndex {
    pub staff_id: Uuid,
    pub date: NaiveDate,
    slots: BTreeMap<NaiveTime, Uuid>,
}

impl BusySlotIndex {
    pub fn new(staff_id: Uuid, date: NaiveDate) -> Self {
        Self {
            staff_id,
            date,
            slots: BTreeMap::new(),
        }
    }

    /// Build from the authoritative appointment list
    pub fn from_appointments(staff_id: Uuid, date: NaiveDate, appointments: &[Appointment]) -> Self {
        let mut index = Self::new(staff_id, date);
        for appointment in appointments {
            if appointment.staff_id == staff_id
                && appointment.date == date
                && appointment.status.occupies_slot()
            {
                index.slots.insert(appointment.time, appointment.id);
            }
        }
        index
    }

    pub fn is_free(&self, time: NaiveTime) -> bool {
        !self.slots.contains_key(&time)
    }

    /// Appointment holding `time`, if any
    pub fn holder(&self, time: NaiveTime) -> Option<Uuid> {
        self.slots.get(&time).copied()
    }

    /// Claim `time` for `appointment_id`. Fails if another appointment holds it.
    pub fn occupy(&mut self, time: NaiveTime, appointment_id: Uuid) -> bool {
        match self.slots.get(&time) {
            Some(holder) => *holder == appointment_id,
            None => {
                self.slots.insert(time, appointment_id);
                true
            }
        }
    }

    /// Free `time` if `appointment_id` holds it
    pub fn release(&mut self, time: NaiveTime, appointment_id: Uuid) -> bool {
        if self.slots.get(&time) == Some(&appointment_id) {
            self.slots.remove(&time);
            true
        } else {
            false
        }
    }

    pub fn taken(&self) -> impl Iterator<Item = (NaiveTime, Uuid)> + '_ {
        self.slots.iter().map(|(t, id)| (*t, *id))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether this index agrees with the appointment list
    pub fn is_consistent_with(&self, appointments: &[Appointment]) -> bool {
        *self == Self::from_appointments(self.staff_id, self.date, appointments)
    }
}
