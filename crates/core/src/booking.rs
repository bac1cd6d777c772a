//! Booking desk - the only writer of the appointment collection
//!
//! Every write goes through one atomic store primitive: `claim_slot` for new
//! bookings, `reclaim_slot` for reactivation and a compare-and-set
//! `transition` for the other status moves. Checks made before those calls
//! only produce friendlier errors; the store has the final word.

use chrono::{Duration, Local, NaiveDate, NaiveTime};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::availability::SlotAvailability;
use crate::error::{BookingError, Error};
use crate::invariants::{assert_appointment_invariants, assert_schedule_invariants};
use crate::models::{Appointment, AppointmentStatus, PaymentMethod, Service, Staff};
use crate::slots::slots_for_service;
use crate::storage::{BookingBackend, ClaimOutcome, Durability};

pub const DEFAULT_SLOT_MINUTES: u32 = 30;
pub const DEFAULT_ONLINE_DISCOUNT_PERCENT: u32 = 5;

/// Status changes re-read this many times when the status moves underneath
const STATUS_ATTEMPTS: usize = 3;

/// Business rules applied at booking time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingPolicy {
    pub slot_minutes: u32,
    pub online_discount_percent: u32,
    /// Days ahead that can be booked, starting today. `None` means unlimited.
    pub window_days: Option<u32>,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            slot_minutes: DEFAULT_SLOT_MINUTES,
            online_discount_percent: DEFAULT_ONLINE_DISCOUNT_PERCENT,
            window_days: None,
        }
    }
}

impl BookingPolicy {
    /// Price the client pays, rounded half up to the minor unit
    pub fn final_price(&self, price: i64, method: PaymentMethod) -> i64 {
        match method {
            PaymentMethod::Cash => price,
            PaymentMethod::Online => {
                let kept = 100 - i64::from(self.online_discount_percent.min(100));
                price.saturating_mul(kept).saturating_add(50).div_euclid(100)
            }
        }
    }

    /// Whether `date` falls in `[today, today + window_days)`
    pub fn in_window(&self, today: NaiveDate, date: NaiveDate) -> bool {
        match self.window_days {
            None => true,
            Some(days) => {
                date >= today
                    && today
                        .checked_add_signed(Duration::days(i64::from(days)))
                        .map_or(true, |end| date < end)
            }
        }
    }

    /// Bookable dates starting at `today`, if a window is configured
    pub fn bookable_dates(&self, today: NaiveDate) -> Option<Vec<NaiveDate>> {
        self.window_days
            .map(|days| today.iter_days().take(days as usize).collect())
    }
}

/// A fully specified booking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub service_id: Uuid,
    pub staff_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub client_name: String,
    pub client_phone: String,
    pub payment_method: PaymentMethod,
}

/// Who is asking for a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// Shop owner, may act on every appointment
    Owner,
    /// A staff member, may act only on their own appointments
    Staff(Uuid),
}

impl Actor {
    fn authorize(&self, appointment: &Appointment) -> Result<(), BookingError> {
        match self {
            Actor::Owner => Ok(()),
            Actor::Staff(id) if *id == appointment.staff_id => Ok(()),
            Actor::Staff(id) => Err(BookingError::PermissionDenied(format!(
                "staff {id} cannot change appointment {}",
                appointment.id
            ))),
        }
    }
}

pub struct BookingDesk<'a, B: BookingBackend + ?Sized> {
    backend: &'a B,
    policy: BookingPolicy,
    today: NaiveDate,
}

impl<'a, B: BookingBackend + ?Sized> BookingDesk<'a, B> {
    pub fn new(backend: &'a B, policy: BookingPolicy) -> Self {
        Self {
            backend,
            policy,
            today: Local::now().date_naive(),
        }
    }

    /// Fix the date the booking window counts from
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    pub fn durability(&self) -> Durability {
        self.backend.durability()
    }

    /// Candidate slots for a staff-day, each marked free or taken.
    ///
    /// With a service, slots that would run past closing are dropped. Dates
    /// outside the booking window have no slots.
    #[instrument(skip(self))]
    pub fn available_slots(
        &self,
        staff_id: Uuid,
        date: NaiveDate,
        service_id: Option<Uuid>,
    ) -> Result<Vec<SlotAvailability>, BookingError> {
        let staff = self.load_staff(staff_id)?;
        let duration = match service_id {
            Some(id) => self.load_service(id)?.effective_duration(),
            None => self.policy.slot_minutes,
        };
        if !self.policy.in_window(self.today, date) {
            return Ok(Vec::new());
        }
        assert_schedule_invariants(&staff.schedule);

        let index = self
            .backend
            .busy_index(staff_id, date)
            .map_err(store_failure)?;
        let slots = slots_for_service(&staff.schedule, date, self.policy.slot_minutes, duration)
            .into_iter()
            .map(|time| SlotAvailability {
                time,
                free: index.is_free(time),
            })
            .collect::<Vec<_>>();

        debug!(
            slots = slots.len(),
            taken = index.len(),
            "Computed availability"
        );
        Ok(slots)
    }

    /// Whether no active appointment holds the slot right now
    #[instrument(skip(self))]
    pub fn is_available(
        &self,
        staff_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<bool, BookingError> {
        let index = self
            .backend
            .busy_index(staff_id, date)
            .map_err(store_failure)?;
        Ok(index.is_free(time))
    }

    /// Validate the request and claim its slot atomically
    #[instrument(skip(self, request), fields(
        staff_id = %request.staff_id,
        date = %request.date,
        time = %request.time,
    ))]
    pub fn book(&self, request: &BookingRequest) -> Result<Appointment, BookingError> {
        let client_name = request.client_name.trim();
        let client_phone = request.client_phone.trim();
        if client_name.is_empty() || client_phone.is_empty() {
            return Err(BookingError::InvalidRequest(
                "client name and phone are required".to_string(),
            ));
        }

        let service = self.load_service(request.service_id)?;
        let staff = self.load_staff(request.staff_id)?;

        self.check_slot(&staff, &service, request.date, request.time)?;

        let slot_taken = || BookingError::SlotTaken {
            staff_id: staff.id,
            date: request.date,
            time: request.time,
        };

        if !self.is_available(staff.id, request.date, request.time)? {
            debug!("Slot taken before claim");
            return Err(slot_taken());
        }

        let price = self
            .policy
            .final_price(service.price, request.payment_method);
        let appointment = Appointment::new(
            &service,
            &staff,
            request.date,
            request.time,
            client_name.to_string(),
            client_phone.to_string(),
            request.payment_method,
            price,
        );
        assert_appointment_invariants(&appointment);

        match self
            .backend
            .claim_slot(&appointment)
            .map_err(store_failure)?
        {
            ClaimOutcome::Claimed => {
                info!(
                    appointment_id = %appointment.id,
                    price,
                    durability = %self.durability(),
                    "Booked"
                );
                Ok(appointment)
            }
            ClaimOutcome::Taken => {
                warn!("Slot taken at claim");
                Err(slot_taken())
            }
        }
    }

    /// Cancel and free the slot. Cancelling twice is a no-op.
    pub fn cancel(&self, actor: Actor, id: Uuid) -> Result<Appointment, BookingError> {
        self.change_status(actor, id, AppointmentStatus::Cancelled)
    }

    /// Record that the appointment happened. The slot stays taken.
    pub fn mark_attended(&self, actor: Actor, id: Uuid) -> Result<Appointment, BookingError> {
        self.change_status(actor, id, AppointmentStatus::Attended)
    }

    /// Bring a cancelled appointment back, if its slot is still free
    pub fn reactivate(&self, actor: Actor, id: Uuid) -> Result<Appointment, BookingError> {
        self.change_status(actor, id, AppointmentStatus::Confirmed)
    }

    #[instrument(skip(self))]
    fn change_status(
        &self,
        actor: Actor,
        id: Uuid,
        target: AppointmentStatus,
    ) -> Result<Appointment, BookingError> {
        for _ in 0..STATUS_ATTEMPTS {
            let current = self.load_appointment(id)?;
            actor.authorize(&current)?;

            if current.status == target {
                return Ok(current);
            }
            if !current.status.can_transition_to(target) {
                return Err(BookingError::InvalidTransition {
                    from: current.status,
                    to: target,
                });
            }

            let changed = if target.occupies_slot() && !current.status.occupies_slot() {
                let staff = self.load_staff(current.staff_id)?;
                let service = self.load_service(current.service_id)?;
                self.check_slot(&staff, &service, current.date, current.time)?;

                match self.backend.reclaim_slot(id) {
                    Ok(ClaimOutcome::Claimed) => true,
                    Ok(ClaimOutcome::Taken) => {
                        warn!("Slot was rebooked while cancelled");
                        return Err(BookingError::SlotTaken {
                            staff_id: current.staff_id,
                            date: current.date,
                            time: current.time,
                        });
                    }
                    // status moved away from cancelled since we read it
                    Err(Error::InvalidOperation(_)) => false,
                    Err(e) => return Err(store_failure(e)),
                }
            } else {
                self.backend
                    .transition(id, current.status, target)
                    .map_err(store_failure)?
            };

            if changed {
                info!(from = %current.status, to = %target, "Status changed");
                return Ok(Appointment {
                    status: target,
                    ..current
                });
            }
            debug!("Status changed concurrently, re-reading");
        }

        Err(BookingError::StoreUnavailable(format!(
            "appointment {id} kept changing status"
        )))
    }

    /// The date must be in the window and the time a slot the current
    /// schedule still generates for the service
    fn check_slot(
        &self,
        staff: &Staff,
        service: &Service,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<(), BookingError> {
        if !self.policy.in_window(self.today, date) {
            return Err(BookingError::InvalidSlot(format!(
                "{date} is outside the booking window"
            )));
        }

        let slots = slots_for_service(
            &staff.schedule,
            date,
            self.policy.slot_minutes,
            service.effective_duration(),
        );
        if !slots.contains(&time) {
            return Err(BookingError::InvalidSlot(format!(
                "{date} {} is not a bookable slot for {}",
                time.format("%H:%M"),
                staff.name
            )));
        }
        Ok(())
    }

    fn load_staff(&self, id: Uuid) -> Result<Staff, BookingError> {
        self.backend
            .find_staff(id)
            .map_err(store_failure)?
            .ok_or_else(|| BookingError::NotFound(format!("staff {id}")))
    }

    fn load_service(&self, id: Uuid) -> Result<Service, BookingError> {
        self.backend
            .find_service(id)
            .map_err(store_failure)?
            .ok_or_else(|| BookingError::NotFound(format!("service {id}")))
    }

    fn load_appointment(&self, id: Uuid) -> Result<Appointment, BookingError> {
        self.backend
            .find_appointment(id)
            .map_err(store_failure)?
            .ok_or_else(|| BookingError::NotFound(format!("appointment {id}")))
    }
}

fn store_failure(err: Error) -> BookingError {
    let err = BookingError::from(err);
    if err.is_retryable() {
        warn!(error = %err, "Store failure");
    }
    err
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use chrono::Weekday;

    use super::*;
    use crate::schedule::{DaySchedule, WeeklySchedule};
    use crate::storage::{
        AppointmentRepository, Database, LocalStore, ServiceRepository, StaffRepository,
    };

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
    }

    fn weekdays_9_to_18() -> WeeklySchedule {
        WeeklySchedule::uniform(
            t(9, 0),
            t(18, 0),
            &[
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
            ],
        )
    }

    fn seed<S: StaffRepository + ServiceRepository>(store: &S) -> (Staff, Service) {
        let staff = Staff::new("Lucas".into(), "Barbero".into()).with_schedule(weekdays_9_to_18());
        let service = Service::new("Haircut".into(), 1000, 30);
        store.create_staff(&staff).unwrap();
        store.create_service(&service).unwrap();
        (staff, service)
    }

    fn request(staff: &Staff, service: &Service, time: NaiveTime, client: &str) -> BookingRequest {
        BookingRequest {
            service_id: service.id,
            staff_id: staff.id,
            date: monday(),
            time,
            client_name: client.into(),
            client_phone: "555-0100".into(),
            payment_method: PaymentMethod::Cash,
        }
    }

    #[test]
    fn online_discount_rounds_half_up() {
        let policy = BookingPolicy::default();
        assert_eq!(policy.final_price(1000, PaymentMethod::Online), 950);
        assert_eq!(policy.final_price(1000, PaymentMethod::Cash), 1000);
        // 1010 * 0.95 = 959.5
        assert_eq!(policy.final_price(1010, PaymentMethod::Online), 960);
        assert_eq!(policy.final_price(0, PaymentMethod::Online), 0);
    }

    #[test]
    fn window_counts_from_today() {
        let policy = BookingPolicy {
            window_days: Some(7),
            ..BookingPolicy::default()
        };
        let today = monday();
        assert!(policy.in_window(today, today));
        assert!(policy.in_window(today, today + Duration::days(6)));
        assert!(!policy.in_window(today, today + Duration::days(7)));
        assert!(!policy.in_window(today, today - Duration::days(1)));
        assert_eq!(policy.bookable_dates(today).map(|d| d.len()), Some(7));
    }

    #[test]
    fn huge_window_is_unbounded_instead_of_overflowing() {
        let policy = BookingPolicy {
            window_days: Some(200_000_000),
            ..BookingPolicy::default()
        };
        assert!(policy.in_window(monday(), monday()));
        assert!(policy.in_window(monday(), NaiveDate::MAX));
        assert!(!policy.in_window(monday(), monday() - Duration::days(1)));
    }

    #[test]
    fn second_booking_of_same_slot_is_taken() {
        let db = Database::open_in_memory().unwrap();
        let (staff, service) = seed(&db);
        let desk = BookingDesk::new(&db, BookingPolicy::default());

        let first = desk.book(&request(&staff, &service, t(9, 0), "Ana")).unwrap();
        assert_eq!(first.price, 1000);
        assert_eq!(first.status, AppointmentStatus::Confirmed);

        let second = desk.book(&request(&staff, &service, t(9, 0), "Bea"));
        assert_eq!(
            second,
            Err(BookingError::SlotTaken {
                staff_id: staff.id,
                date: monday(),
                time: t(9, 0),
            })
        );
    }

    #[test]
    fn concurrent_bookings_admit_exactly_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("salon.db");
        let (staff, service) = seed(&Database::open(&path).unwrap());

        let threads = 6;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let db = Database::open(&path).unwrap();
                let barrier = Arc::clone(&barrier);
                let req = request(&staff, &service, t(11, 0), &format!("Client {i}"));
                thread::spawn(move || {
                    let desk = BookingDesk::new(&db, BookingPolicy::default());
                    barrier.wait();
                    desk.book(&req)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let booked = results.iter().filter(|r| r.is_ok()).count();
        let taken = results
            .iter()
            .filter(|r| matches!(r, Err(BookingError::SlotTaken { .. })))
            .count();
        assert_eq!(booked, 1);
        assert_eq!(taken, threads - 1);

        let db = Database::open(&path).unwrap();
        assert_eq!(db.busy_index(staff.id, monday()).unwrap().len(), 1);
    }

    #[test]
    fn cancel_frees_the_slot_and_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let (staff, service) = seed(&db);
        let desk = BookingDesk::new(&db, BookingPolicy::default());

        let booked = desk.book(&request(&staff, &service, t(9, 0), "Ana")).unwrap();
        let cancelled = desk.cancel(Actor::Owner, booked.id).unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert!(desk.is_available(staff.id, monday(), t(9, 0)).unwrap());

        let again = desk.cancel(Actor::Owner, booked.id).unwrap();
        assert_eq!(again.status, AppointmentStatus::Cancelled);

        assert!(desk.book(&request(&staff, &service, t(9, 0), "Bea")).is_ok());
    }

    #[test]
    fn price_is_snapshotted() {
        let db = Database::open_in_memory().unwrap();
        let (staff, service) = seed(&db);
        let desk = BookingDesk::new(&db, BookingPolicy::default());

        let mut req = request(&staff, &service, t(10, 0), "Ana");
        req.payment_method = PaymentMethod::Online;
        let booked = desk.book(&req).unwrap();
        assert_eq!(booked.price, 950);
        assert_eq!(booked.original_price, 1000);

        db.update_price(service.id, 2000).unwrap();
        let stored = db.find_appointment(booked.id).unwrap().unwrap();
        assert_eq!(stored.price, 950);
        assert_eq!(stored.original_price, 1000);
    }

    #[test]
    fn reactivate_fails_when_slot_was_rebooked() {
        let db = Database::open_in_memory().unwrap();
        let (staff, service) = seed(&db);
        let desk = BookingDesk::new(&db, BookingPolicy::default());

        let a = desk.book(&request(&staff, &service, t(9, 0), "Ana")).unwrap();
        desk.cancel(Actor::Owner, a.id).unwrap();
        let b = desk.book(&request(&staff, &service, t(9, 0), "Bea")).unwrap();

        assert!(matches!(
            desk.reactivate(Actor::Owner, a.id),
            Err(BookingError::SlotTaken { .. })
        ));
        let stored = db.find_appointment(a.id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Cancelled);

        desk.cancel(Actor::Owner, b.id).unwrap();
        let back = desk.reactivate(Actor::Owner, a.id).unwrap();
        assert_eq!(back.status, AppointmentStatus::Confirmed);
        assert!(!desk.is_available(staff.id, monday(), t(9, 0)).unwrap());
    }

    #[test]
    fn reactivate_rechecks_schedule_and_window() {
        let db = Database::open_in_memory().unwrap();
        let (staff, service) = seed(&db);
        let desk = BookingDesk::new(&db, BookingPolicy::default());

        let a = desk.book(&request(&staff, &service, t(9, 0), "Ana")).unwrap();
        desk.cancel(Actor::Owner, a.id).unwrap();
        db.update_schedule(
            staff.id,
            &weekdays_9_to_18().with_day(Weekday::Mon, DaySchedule::off()),
        )
        .unwrap();

        assert!(matches!(
            desk.book(&request(&staff, &service, t(9, 0), "Bea")),
            Err(BookingError::InvalidSlot(_))
        ));
        assert!(matches!(
            desk.reactivate(Actor::Owner, a.id),
            Err(BookingError::InvalidSlot(_))
        ));
        let stored = db.find_appointment(a.id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Cancelled);

        db.update_schedule(staff.id, &weekdays_9_to_18()).unwrap();
        let windowed = BookingDesk::new(
            &db,
            BookingPolicy {
                window_days: Some(7),
                ..BookingPolicy::default()
            },
        )
        .with_today(monday() + Duration::days(1));
        assert!(matches!(
            windowed.reactivate(Actor::Owner, a.id),
            Err(BookingError::InvalidSlot(_))
        ));

        let back = desk.reactivate(Actor::Owner, a.id).unwrap();
        assert_eq!(back.status, AppointmentStatus::Confirmed);
    }

    #[test]
    fn attended_is_final_and_keeps_the_slot() {
        let db = Database::open_in_memory().unwrap();
        let (staff, service) = seed(&db);
        let desk = BookingDesk::new(&db, BookingPolicy::default());

        let booked = desk.book(&request(&staff, &service, t(9, 0), "Ana")).unwrap();
        desk.mark_attended(Actor::Owner, booked.id).unwrap();
        assert!(!desk.is_available(staff.id, monday(), t(9, 0)).unwrap());

        assert_eq!(
            desk.cancel(Actor::Owner, booked.id),
            Err(BookingError::InvalidTransition {
                from: AppointmentStatus::Attended,
                to: AppointmentStatus::Cancelled,
            })
        );
    }

    #[test]
    fn staff_may_only_touch_their_own_appointments() {
        let db = Database::open_in_memory().unwrap();
        let (staff, service) = seed(&db);
        let desk = BookingDesk::new(&db, BookingPolicy::default());
        let booked = desk.book(&request(&staff, &service, t(9, 0), "Ana")).unwrap();

        assert!(matches!(
            desk.cancel(Actor::Staff(Uuid::new_v4()), booked.id),
            Err(BookingError::PermissionDenied(_))
        ));
        assert!(desk.mark_attended(Actor::Staff(staff.id), booked.id).is_ok());
    }

    #[test]
    fn stale_or_unschedulable_slots_are_invalid() {
        let db = Database::open_in_memory().unwrap();
        let (staff, service) = seed(&db);
        let long = Service::new("Color".into(), 3000, 45);
        db.create_service(&long).unwrap();
        let desk = BookingDesk::new(&db, BookingPolicy::default());

        // not on the 30 minute grid
        assert!(matches!(
            desk.book(&request(&staff, &service, t(9, 15), "Ana")),
            Err(BookingError::InvalidSlot(_))
        ));
        // 17:30 + 45 runs past 18:00
        assert!(matches!(
            desk.book(&request(&staff, &long, t(17, 30), "Ana")),
            Err(BookingError::InvalidSlot(_))
        ));
        // Sunday is off
        let mut sunday = request(&staff, &service, t(10, 0), "Ana");
        sunday.date = NaiveDate::from_ymd_opt(2030, 1, 6).unwrap();
        assert!(matches!(desk.book(&sunday), Err(BookingError::InvalidSlot(_))));
    }

    #[test]
    fn dates_outside_window_are_rejected() {
        let db = Database::open_in_memory().unwrap();
        let (staff, service) = seed(&db);
        let policy = BookingPolicy {
            window_days: Some(7),
            ..BookingPolicy::default()
        };
        let desk = BookingDesk::new(&db, policy).with_today(monday() - Duration::days(10));

        assert!(matches!(
            desk.book(&request(&staff, &service, t(9, 0), "Ana")),
            Err(BookingError::InvalidSlot(_))
        ));
        assert!(desk
            .available_slots(staff.id, monday(), None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn blank_client_details_are_rejected() {
        let db = Database::open_in_memory().unwrap();
        let (staff, service) = seed(&db);
        let desk = BookingDesk::new(&db, BookingPolicy::default());

        assert!(matches!(
            desk.book(&request(&staff, &service, t(9, 0), "  ")),
            Err(BookingError::InvalidRequest(_))
        ));
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let db = Database::open_in_memory().unwrap();
        let (staff, service) = seed(&db);
        let desk = BookingDesk::new(&db, BookingPolicy::default());

        let mut req = request(&staff, &service, t(9, 0), "Ana");
        req.service_id = Uuid::new_v4();
        assert!(matches!(desk.book(&req), Err(BookingError::NotFound(_))));
        assert!(matches!(
            desk.cancel(Actor::Owner, Uuid::new_v4()),
            Err(BookingError::NotFound(_))
        ));
    }

    #[test]
    fn available_slots_mark_taken_times() {
        let db = Database::open_in_memory().unwrap();
        let (staff, service) = seed(&db);
        let desk = BookingDesk::new(&db, BookingPolicy::default());
        desk.book(&request(&staff, &service, t(9, 30), "Ana")).unwrap();

        let slots = desk
            .available_slots(staff.id, monday(), Some(service.id))
            .unwrap();
        assert_eq!(slots.len(), 18);
        assert_eq!(slots[0], SlotAvailability { time: t(9, 0), free: true });
        assert_eq!(slots[1], SlotAvailability { time: t(9, 30), free: false });
        assert_eq!(
            slots,
            desk.available_slots(staff.id, monday(), Some(service.id))
                .unwrap()
        );
    }

    #[test]
    fn local_store_books_with_reduced_durability() {
        let store = LocalStore::in_memory();
        let (staff, service) = seed(&store);
        let desk = BookingDesk::new(&store, BookingPolicy::default());
        assert_eq!(desk.durability(), Durability::Local);

        desk.book(&request(&staff, &service, t(9, 0), "Ana")).unwrap();
        assert!(matches!(
            desk.book(&request(&staff, &service, t(9, 0), "Bea")),
            Err(BookingError::SlotTaken { .. })
        ));
    }

    #[test]
    fn day_off_schedule_change_hides_slots() {
        let db = Database::open_in_memory().unwrap();
        let (staff, _) = seed(&db);
        db.update_schedule(
            staff.id,
            &weekdays_9_to_18().with_day(Weekday::Mon, DaySchedule::off()),
        )
        .unwrap();
        let desk = BookingDesk::new(&db, BookingPolicy::default());
        assert!(desk
            .available_slots(staff.id, monday(), None)
            .unwrap()
            .is_empty());
    }
}
