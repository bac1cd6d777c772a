//! Dashboard statistics
//!
//! Computed from the appointment list as of a reference instant. Cancelled
//! appointments never count. Weeks start on Sunday; the week and month
//! figures run from the start of the period up to and including today.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, Staff};

const TOP_SERVICES: usize = 5;

/// Count and revenue over one period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PeriodTotals {
    pub appointments: usize,
    pub revenue: i64,
}

impl PeriodTotals {
    fn add(&mut self, appointment: &Appointment) {
        self.appointments += 1;
        self.revenue += appointment.price;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffPerformance {
    pub staff_id: Uuid,
    pub name: String,
    pub appointments: usize,
    pub revenue: i64,
    pub today: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceCount {
    pub title: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total: PeriodTotals,
    pub today: PeriodTotals,
    pub week: PeriodTotals,
    pub month: PeriodTotals,
    /// Busiest first
    pub staff: Vec<StaffPerformance>,
    pub top_services: Vec<ServiceCount>,
    /// Appointment count per starting hour, by hour
    pub busy_hours: BTreeMap<u32, usize>,
    pub next_appointment: Option<Appointment>,
}

impl DashboardStats {
    pub fn compute(appointments: &[Appointment], staff: &[Staff], now: NaiveDateTime) -> Self {
        let today = now.date();
        let week_start = start_of_week(today);
        let month_start = today.with_day(1).unwrap_or(today);

        let mut total = PeriodTotals::default();
        let mut today_totals = PeriodTotals::default();
        let mut week = PeriodTotals::default();
        let mut month = PeriodTotals::default();
        let mut per_staff: HashMap<Uuid, StaffPerformance> = staff
            .iter()
            .map(|s| {
                (
                    s.id,
                    StaffPerformance {
                        staff_id: s.id,
                        name: s.name.clone(),
                        appointments: 0,
                        revenue: 0,
                        today: 0,
                    },
                )
            })
            .collect();
        let mut services: HashMap<&str, usize> = HashMap::new();
        let mut busy_hours = BTreeMap::new();
        let mut next_appointment: Option<&Appointment> = None;

        let active = appointments
            .iter()
            .filter(|a| a.status != AppointmentStatus::Cancelled);
        for appointment in active {
            total.add(appointment);
            if appointment.date == today {
                today_totals.add(appointment);
            }
            if appointment.date >= week_start && appointment.date <= today {
                week.add(appointment);
            }
            if appointment.date >= month_start && appointment.date <= today {
                month.add(appointment);
            }

            // Appointments of removed staff still show up under their snapshot name
            let entry = per_staff
                .entry(appointment.staff_id)
                .or_insert_with(|| StaffPerformance {
                    staff_id: appointment.staff_id,
                    name: appointment.staff_name.clone(),
                    appointments: 0,
                    revenue: 0,
                    today: 0,
                });
            entry.appointments += 1;
            entry.revenue += appointment.price;
            if appointment.date == today {
                entry.today += 1;
            }

            *services.entry(appointment.service_title.as_str()).or_default() += 1;
            *busy_hours.entry(appointment.time.hour()).or_default() += 1;

            let starts = appointment.date.and_time(appointment.time);
            if starts > now
                && appointment.status == AppointmentStatus::Confirmed
                && next_appointment.map_or(true, |n| starts < n.date.and_time(n.time))
            {
                next_appointment = Some(appointment);
            }
        }

        let mut staff: Vec<StaffPerformance> = per_staff.into_values().collect();
        staff.sort_by(|a, b| {
            b.appointments
                .cmp(&a.appointments)
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut top_services: Vec<ServiceCount> = services
            .into_iter()
            .map(|(title, count)| ServiceCount {
                title: title.to_string(),
                count,
            })
            .collect();
        top_services.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.title.cmp(&b.title)));
        top_services.truncate(TOP_SERVICES);

        Self {
            total,
            today: today_totals,
            week,
            month,
            staff,
            top_services,
            busy_hours,
            next_appointment: next_appointment.cloned(),
        }
    }
}

fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}
