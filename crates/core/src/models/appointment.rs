//! Appointment model - the booking record

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Service, Staff};

/// Appointment lifecycle.
///
/// `Confirmed` is initial. Allowed moves are `Confirmed -> Cancelled`,
/// `Confirmed -> Attended` and `Cancelled -> Confirmed` (reactivation).
/// Attendance is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
    Attended,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Attended => "attended",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "confirmed" | "confirmado" => Some(AppointmentStatus::Confirmed),
            "cancelled" | "canceled" | "cancelado" => Some(AppointmentStatus::Cancelled),
            "attended" | "asistio" | "asistió" => Some(AppointmentStatus::Attended),
            _ => None,
        }
    }

    /// Whether an appointment in this state holds its slot
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (AppointmentStatus::Confirmed, AppointmentStatus::Cancelled)
                | (AppointmentStatus::Confirmed, AppointmentStatus::Attended)
                | (AppointmentStatus::Cancelled, AppointmentStatus::Confirmed)
        )
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the client intends to pay. Only changes the displayed price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    /// Card / wallet paid up front, eligible for the online discount
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Online => "online",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "cash" | "efectivo" => Some(PaymentMethod::Cash),
            "online" | "mp" | "card" => Some(PaymentMethod::Online),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A booked appointment.
///
/// Service and staff details are snapshotted at booking time; later edits to
/// the service or staff record never touch existing appointments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub service_id: Uuid,
    pub service_title: String,
    pub service_duration: u32,
    pub staff_id: Uuid,
    pub staff_name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub client_name: String,
    pub client_phone: String,
    pub payment_method: PaymentMethod,
    /// Price charged, after any discount
    pub price: i64,
    /// List price of the service when booked
    pub original_price: i64,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        service: &Service,
        staff: &Staff,
        date: NaiveDate,
        time: NaiveTime,
        client_name: String,
        client_phone: String,
        payment_method: PaymentMethod,
        price: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            service_id: service.id,
            service_title: service.title.clone(),
            service_duration: service.effective_duration(),
            staff_id: staff.id,
            staff_name: staff.name.clone(),
            date,
            time,
            client_name,
            client_phone,
            payment_method,
            price,
            original_price: service.price,
            status: AppointmentStatus::Confirmed,
            created_at: Utc::now(),
        }
    }

    /// Whether this appointment holds the given slot
    pub fn holds(&self, staff_id: Uuid, date: NaiveDate, time: NaiveTime) -> bool {
        self.staff_id == staff_id
            && self.date == date
            && self.time == time
            && self.status.occupies_slot()
    }

    /// Text the client sends to the shop to confirm the booking
    pub fn confirmation_message(&self) -> String {
        format!(
            "Hi! I'm {}. I'd like to confirm my appointment for {} with {} on {} at {}. Price: ${}.",
            self.client_name,
            self.service_title,
            self.staff_name,
            self.date.format("%Y-%m-%d"),
            self.time.format("%H:%M"),
            self.price
        )
    }
}
