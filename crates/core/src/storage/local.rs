//! Local-only store
//!
//! Keeps the whole catalog and appointment list in memory behind a mutex and
//! mirrors it to a JSON file after every write. Writes from threads in this
//! process are serialized, but nothing protects against bookings made on
//! another device, so the store reports [`Durability::Local`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::traits::{
    AppointmentFilter, AppointmentRepository, Catalog, ClaimOutcome, Durability,
    ServiceRepository, StaffRepository,
};
use super::Database;
use crate::error::{Error, Result};
use crate::invariants::assert_no_double_booking;
use crate::models::{Appointment, AppointmentStatus, Service, Staff};
use crate::schedule::WeeklySchedule;

/// Everything the local store persists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalSnapshot {
    #[serde(default)]
    pub staff: Vec<Staff>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
}

pub struct LocalStore {
    path: Option<PathBuf>,
    state: Mutex<LocalSnapshot>,
}

impl LocalStore {
    /// Load the snapshot at `path`, or start empty if it does not exist
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            LocalSnapshot::default()
        };
        assert_no_double_booking(&snapshot.appointments);
        debug!(
            appointments = snapshot.appointments.len(),
            "Loaded local snapshot"
        );
        Ok(Self {
            path: Some(path),
            state: Mutex::new(snapshot),
        })
    }

    /// Store with no backing file (for testing)
    pub fn in_memory() -> Self {
        Self::from_snapshot(LocalSnapshot::default())
    }

    pub fn from_snapshot(snapshot: LocalSnapshot) -> Self {
        Self {
            path: None,
            state: Mutex::new(snapshot),
        }
    }

    /// Copy the durable store's contents into a new local snapshot at `path`
    #[instrument(skip(db, path), fields(path = %path.as_ref().display()))]
    pub fn snapshot_from<P: AsRef<Path>>(db: &Database, path: P) -> Result<Self> {
        let snapshot = LocalSnapshot {
            staff: db.list_staff()?,
            services: db.list_services()?,
            appointments: db.list_appointments(&AppointmentFilter::default())?,
        };
        let path = path.as_ref().to_path_buf();
        persist(&path, &snapshot)?;
        info!(
            staff = snapshot.staff.len(),
            services = snapshot.services.len(),
            appointments = snapshot.appointments.len(),
            "Wrote local snapshot"
        );
        Ok(Self {
            path: Some(path),
            state: Mutex::new(snapshot),
        })
    }

    /// Current contents
    pub fn snapshot(&self) -> LocalSnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, LocalSnapshot> {
        // A panic mid-write never reaches the swap in `write`, so the data is intact
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to a copy, persist it, then publish it
    fn write<T>(&self, f: impl FnOnce(&mut LocalSnapshot) -> Result<T>) -> Result<T> {
        let mut state = self.lock();
        let mut next = state.clone();
        let out = f(&mut next)?;
        if let Some(path) = &self.path {
            persist(path, &next)?;
        }
        *state = next;
        Ok(out)
    }
}

fn persist(path: &Path, snapshot: &LocalSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(snapshot)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn slot_is_held(snapshot: &LocalSnapshot, appointment: &Appointment) -> bool {
    snapshot.appointments.iter().any(|a| {
        a.id != appointment.id && a.holds(appointment.staff_id, appointment.date, appointment.time)
    })
}

impl Catalog for LocalStore {
    fn find_staff(&self, id: Uuid) -> Result<Option<Staff>> {
        Ok(self.lock().staff.iter().find(|s| s.id == id).cloned())
    }

    fn find_service(&self, id: Uuid) -> Result<Option<Service>> {
        Ok(self.lock().services.iter().find(|s| s.id == id).cloned())
    }
}

impl StaffRepository for LocalStore {
    fn create_staff(&self, staff: &Staff) -> Result<()> {
        self.write(|s| {
            if s.staff.iter().any(|existing| existing.id == staff.id) {
                return Err(Error::InvalidOperation(format!("staff {} exists", staff.id)));
            }
            s.staff.push(staff.clone());
            Ok(())
        })
    }

    fn list_staff(&self) -> Result<Vec<Staff>> {
        let mut staff = self.lock().staff.clone();
        staff.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(staff)
    }

    fn update_schedule(&self, staff_id: Uuid, schedule: &WeeklySchedule) -> Result<()> {
        self.write(|s| {
            let staff = s
                .staff
                .iter_mut()
                .find(|m| m.id == staff_id)
                .ok_or_else(|| Error::NotFound(format!("staff {staff_id}")))?;
            staff.schedule = schedule.clone();
            Ok(())
        })
    }

    fn set_pin_hash(&self, staff_id: Uuid, pin_hash: Option<&str>) -> Result<()> {
        self.write(|s| {
            let staff = s
                .staff
                .iter_mut()
                .find(|m| m.id == staff_id)
                .ok_or_else(|| Error::NotFound(format!("staff {staff_id}")))?;
            staff.pin_hash = pin_hash.map(str::to_string);
            Ok(())
        })
    }
}

impl ServiceRepository for LocalStore {
    fn create_service(&self, service: &Service) -> Result<()> {
        if service.price < 0 {
            return Err(Error::InvalidOperation(format!(
                "price must not be negative, got {}",
                service.price
            )));
        }
        self.write(|s| {
            if s.services.iter().any(|existing| existing.id == service.id) {
                return Err(Error::InvalidOperation(format!(
                    "service {} exists",
                    service.id
                )));
            }
            s.services.push(service.clone());
            Ok(())
        })
    }

    fn list_services(&self) -> Result<Vec<Service>> {
        let mut services = self.lock().services.clone();
        services.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(services)
    }

    fn update_price(&self, service_id: Uuid, price: i64) -> Result<()> {
        if price < 0 {
            return Err(Error::InvalidOperation(format!(
                "price must not be negative, got {price}"
            )));
        }
        self.write(|s| {
            let service = s
                .services
                .iter_mut()
                .find(|m| m.id == service_id)
                .ok_or_else(|| Error::NotFound(format!("service {service_id}")))?;
            service.price = price;
            Ok(())
        })
    }
}

impl AppointmentRepository for LocalStore {
    fn durability(&self) -> Durability {
        Durability::Local
    }

    fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        Ok(self.lock().appointments.iter().find(|a| a.id == id).cloned())
    }

    fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let mut appointments: Vec<Appointment> = self
            .lock()
            .appointments
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        appointments.sort_by_key(|a| (a.date, a.time, a.created_at));
        Ok(appointments)
    }

    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    fn claim_slot(&self, appointment: &Appointment) -> Result<ClaimOutcome> {
        self.write(|s| {
            if s.appointments.iter().any(|a| a.id == appointment.id) {
                return Err(Error::InvalidOperation(format!(
                    "appointment {} exists",
                    appointment.id
                )));
            }
            if slot_is_held(s, appointment) {
                debug!("Slot already held");
                return Ok(ClaimOutcome::Taken);
            }
            s.appointments.push(appointment.clone());
            Ok(ClaimOutcome::Claimed)
        })
    }

    #[instrument(skip(self))]
    fn transition(&self, id: Uuid, from: AppointmentStatus, to: AppointmentStatus) -> Result<bool> {
        if to.occupies_slot() && !from.occupies_slot() {
            return Err(Error::InvalidOperation(
                "re-occupying a slot requires reclaim".to_string(),
            ));
        }
        self.write(|s| {
            match s.appointments.iter_mut().find(|a| a.id == id) {
                Some(appointment) if appointment.status == from => {
                    appointment.status = to;
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    #[instrument(skip(self))]
    fn reclaim_slot(&self, id: Uuid) -> Result<ClaimOutcome> {
        self.write(|s| {
            let appointment = s
                .appointments
                .iter()
                .find(|a| a.id == id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("appointment {id}")))?;
            if appointment.status != AppointmentStatus::Cancelled {
                return Err(Error::InvalidOperation(format!(
                    "appointment {id} is {}, not cancelled",
                    appointment.status
                )));
            }
            if slot_is_held(s, &appointment) {
                return Ok(ClaimOutcome::Taken);
            }
            if let Some(stored) = s.appointments.iter_mut().find(|a| a.id == id) {
                stored.status = AppointmentStatus::Confirmed;
            }
            Ok(ClaimOutcome::Claimed)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::{NaiveDate, NaiveTime};

    use super::*;
    use crate::models::PaymentMethod;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
    }

    fn appointment(staff: &Staff, service: &Service, time: NaiveTime, client: &str) -> Appointment {
        Appointment::new(
            service,
            staff,
            monday(),
            time,
            client.into(),
            "555".into(),
            PaymentMethod::Cash,
            service.price,
        )
    }

    fn seeded() -> (LocalStore, Staff, Service) {
        let store = LocalStore::in_memory();
        let staff = Staff::new("Lucas".into(), "Barbero".into());
        let service = Service::new("Corte".into(), 1000, 30);
        store.create_staff(&staff).unwrap();
        store.create_service(&service).unwrap();
        (store, staff, service)
    }

    #[test]
    fn reports_local_durability() {
        assert_eq!(LocalStore::in_memory().durability(), Durability::Local);
    }

    #[test]
    fn second_claim_is_taken_until_cancelled() {
        let (store, staff, service) = seeded();
        let first = appointment(&staff, &service, t(9, 0), "Ana");
        let second = appointment(&staff, &service, t(9, 0), "Bea");

        assert_eq!(store.claim_slot(&first).unwrap(), ClaimOutcome::Claimed);
        assert_eq!(store.claim_slot(&second).unwrap(), ClaimOutcome::Taken);

        assert!(store
            .transition(first.id, AppointmentStatus::Confirmed, AppointmentStatus::Cancelled)
            .unwrap());
        assert_eq!(store.claim_slot(&second).unwrap(), ClaimOutcome::Claimed);

        // the cancelled booking cannot come back while the slot is held
        assert_eq!(store.reclaim_slot(first.id).unwrap(), ClaimOutcome::Taken);
    }

    #[test]
    fn stale_transition_is_refused() {
        let (store, staff, service) = seeded();
        let booked = appointment(&staff, &service, t(9, 0), "Ana");
        store.claim_slot(&booked).unwrap();

        assert!(store
            .transition(booked.id, AppointmentStatus::Confirmed, AppointmentStatus::Attended)
            .unwrap());
        assert!(!store
            .transition(booked.id, AppointmentStatus::Confirmed, AppointmentStatus::Cancelled)
            .unwrap());
        assert!(store
            .transition(Uuid::new_v4(), AppointmentStatus::Confirmed, AppointmentStatus::Cancelled)
            .is_ok_and(|changed| !changed));
    }

    #[test]
    fn concurrent_claims_admit_one() {
        let (store, staff, service) = seeded();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let candidate = appointment(&staff, &service, t(10, 0), &format!("Client {i}"));
                thread::spawn(move || store.claim_slot(&candidate).unwrap())
            })
            .collect();

        let claimed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|outcome| *outcome == ClaimOutcome::Claimed)
            .count();
        assert_eq!(claimed, 1);

        let index = store.busy_index(staff.id, monday()).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn snapshot_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.json");

        let staff = Staff::new("Lucas".into(), "Barbero".into());
        let service = Service::new("Corte".into(), 1000, 30);
        let booked = appointment(&staff, &service, t(9, 0), "Ana");
        {
            let store = LocalStore::open(&path).unwrap();
            store.create_staff(&staff).unwrap();
            store.create_service(&service).unwrap();
            store.claim_slot(&booked).unwrap();
        }

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.find_appointment(booked.id).unwrap(), Some(booked));
        assert_eq!(reopened.list_staff().unwrap().len(), 1);
    }

    #[test]
    fn snapshot_from_copies_durable_store() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let staff = Staff::new("Lucas".into(), "Barbero".into());
        let service = Service::new("Corte".into(), 1000, 30);
        db.create_staff(&staff).unwrap();
        db.create_service(&service).unwrap();
        let booked = appointment(&staff, &service, t(9, 0), "Ana");
        db.claim_slot(&booked).unwrap();

        let local = LocalStore::snapshot_from(&db, dir.path().join("local.json")).unwrap();
        assert_eq!(local.find_staff(staff.id).unwrap().map(|s| s.name), Some("Lucas".into()));
        assert_eq!(
            local.claim_slot(&appointment(&staff, &service, t(9, 0), "Bea")).unwrap(),
            ClaimOutcome::Taken
        );
    }
}
