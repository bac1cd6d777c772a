//! Booking draft carried through the wizard steps

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::BookingRequest;
use crate::error::BookingError;
use crate::models::PaymentMethod;

/// Next thing the wizard has to ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStep {
    Service,
    Staff,
    Date,
    Time,
    Client,
    Review,
}

/// Selections collected so far. Nothing is reserved until submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub service_id: Option<Uuid>,
    pub staff_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub client_name: String,
    pub client_phone: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl BookingDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picking a service restarts the choices that depend on it
    pub fn select_service(&mut self, service_id: Uuid) {
        if self.service_id != Some(service_id) {
            self.time = None;
        }
        self.service_id = Some(service_id);
    }

    pub fn select_staff(&mut self, staff_id: Uuid) {
        if self.staff_id != Some(staff_id) {
            self.time = None;
        }
        self.staff_id = Some(staff_id);
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        if self.date != Some(date) {
            self.time = None;
        }
        self.date = Some(date);
    }

    pub fn select_time(&mut self, time: NaiveTime) {
        self.time = Some(time);
    }

    pub fn set_client(&mut self, name: impl Into<String>, phone: impl Into<String>) {
        self.client_name = name.into();
        self.client_phone = phone.into();
    }

    pub fn set_payment(&mut self, method: PaymentMethod) {
        self.payment_method = method;
    }

    pub fn step(&self) -> DraftStep {
        if self.service_id.is_none() {
            DraftStep::Service
        } else if self.staff_id.is_none() {
            DraftStep::Staff
        } else if self.date.is_none() {
            DraftStep::Date
        } else if self.time.is_none() {
            DraftStep::Time
        } else if self.client_name.trim().is_empty() || self.client_phone.trim().is_empty() {
            DraftStep::Client
        } else {
            DraftStep::Review
        }
    }

    /// Finish the draft; fails naming the first missing step
    pub fn into_request(self) -> Result<BookingRequest, BookingError> {
        let missing = |step: DraftStep| {
            BookingError::InvalidRequest(format!("booking is missing its {step:?} step"))
        };

        let service_id = self.service_id.ok_or_else(|| missing(DraftStep::Service))?;
        let staff_id = self.staff_id.ok_or_else(|| missing(DraftStep::Staff))?;
        let date = self.date.ok_or_else(|| missing(DraftStep::Date))?;
        let time = self.time.ok_or_else(|| missing(DraftStep::Time))?;

        let client_name = self.client_name.trim().to_string();
        let client_phone = self.client_phone.trim().to_string();
        if client_name.is_empty() || client_phone.is_empty() {
            return Err(missing(DraftStep::Client));
        }

        Ok(BookingRequest {
            service_id,
            staff_id,
            date,
            time,
            client_name,
            client_phone,
            payment_method: self.payment_method,
        })
    }
}
