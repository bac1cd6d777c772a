//! Async booking service
//!
//! Store calls block, so each attempt runs on the blocking pool. Store
//! failures are retried with linear backoff; every other booking error goes
//! straight back to the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use salon_core::{
    Actor, Appointment, BookingBackend, BookingDesk, BookingError, BookingPolicy, BookingRequest,
    Durability, SlotAvailability,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::state::Backend;

#[derive(Clone)]
pub struct BookingService {
    backend: Backend,
    policy: BookingPolicy,
    retries: u32,
    backoff: Duration,
}

impl BookingService {
    pub fn new(backend: Backend, policy: BookingPolicy, retries: u32, backoff: Duration) -> Self {
        Self {
            backend,
            policy,
            retries,
            backoff,
        }
    }

    pub fn durability(&self) -> Durability {
        self.backend.durability()
    }

    pub async fn available_slots(
        &self,
        staff_id: Uuid,
        date: NaiveDate,
        service_id: Option<Uuid>,
    ) -> Result<Vec<SlotAvailability>, BookingError> {
        self.run(move |desk| desk.available_slots(staff_id, date, service_id))
            .await
    }

    pub async fn is_available(
        &self,
        staff_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<bool, BookingError> {
        self.run(move |desk| desk.is_available(staff_id, date, time))
            .await
    }

    pub async fn book(&self, request: BookingRequest) -> Result<Appointment, BookingError> {
        self.run(move |desk| desk.book(&request)).await
    }

    pub async fn cancel(&self, actor: Actor, id: Uuid) -> Result<Appointment, BookingError> {
        self.run(move |desk| desk.cancel(actor, id)).await
    }

    pub async fn mark_attended(&self, actor: Actor, id: Uuid) -> Result<Appointment, BookingError> {
        self.run(move |desk| desk.mark_attended(actor, id)).await
    }

    pub async fn reactivate(&self, actor: Actor, id: Uuid) -> Result<Appointment, BookingError> {
        self.run(move |desk| desk.reactivate(actor, id)).await
    }

    #[instrument(skip(self, op), fields(durability = %self.durability()))]
    async fn run<T, F>(&self, op: F) -> Result<T, BookingError>
    where
        T: Send + 'static,
        F: Fn(&BookingDesk<'_, dyn BookingBackend>) -> Result<T, BookingError>
            + Send
            + Sync
            + 'static,
    {
        let op = Arc::new(op);
        let mut attempt = 0;

        loop {
            let backend = self.backend.clone();
            let policy = self.policy;
            let task_op = Arc::clone(&op);

            let result = tokio::task::spawn_blocking(move || {
                backend.with_desk(policy, |desk| task_op(desk))
            })
            .await
            .map_err(|e| BookingError::StoreUnavailable(format!("booking task failed: {e}")))?;

            match result {
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "Store unavailable, retrying");
                    tokio::time::sleep(self.backoff.saturating_mul(attempt)).await;
                }
                other => return other,
            }
        }
    }
}
