//! Appointment storage operations
//!
//! Every write runs in a `BEGIN IMMEDIATE` transaction so the availability
//! check and the write are serialized against other connections. The partial
//! unique index on active `(staff_id, date, time)` rows backs this up at the
//! database level, and `busy_slots` is updated inside the same transaction.

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row, ToSql, Transaction, TransactionBehavior};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::parse::{
    format_date, format_time, parse_date, parse_datetime, parse_payment, parse_status,
    parse_time, parse_uuid, OptionalExt,
};
use super::traits::{AppointmentFilter, ClaimOutcome};
use crate::availability::BusySlotIndex;
use crate::error::{Error, Result};
use crate::models::{Appointment, AppointmentStatus};

const APPOINTMENT_COLUMNS: &str = "id, service_id, service_title, service_duration, staff_id, \
     staff_name, date, time, client_name, client_phone, payment_method, price, original_price, \
     status, created_at";

/// Slot key and status of a stored appointment
struct SlotRow {
    staff_id: String,
    date: String,
    time: String,
    status: AppointmentStatus,
}

pub struct AppointmentStore<'a> {
    conn: &'a Connection,
}

impl<'a> AppointmentStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn begin(&self) -> Result<Transaction<'a>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    /// Insert the appointment if its slot is free
    #[instrument(skip(self, appointment), fields(
        appointment_id = %appointment.id,
        staff_id = %appointment.staff_id,
        date = %appointment.date,
        time = %appointment.time,
    ))]
    pub fn claim(&self, appointment: &Appointment) -> Result<ClaimOutcome> {
        let tx = self.begin()?;
        let date = format_date(appointment.date);
        let time = format_time(appointment.time);
        let staff_id = appointment.staff_id.to_string();

        if slot_holder(&tx, &staff_id, &date, &time)?.is_some() {
            debug!("Slot already held");
            return Ok(ClaimOutcome::Taken);
        }

        if let Err(e) = insert_appointment(&tx, appointment) {
            let e = Error::from(e);
            if e.is_constraint_violation() {
                warn!("Active slot index rejected insert");
                return Ok(ClaimOutcome::Taken);
            }
            return Err(e);
        }

        tx.execute(
            "INSERT INTO busy_slots (staff_id, date, time, appointment_id) VALUES (?1, ?2, ?3, ?4)",
            params![staff_id, date, time, appointment.id.to_string()],
        )?;

        tx.commit()?;
        Ok(ClaimOutcome::Claimed)
    }

    /// Compare-and-set the status
    #[instrument(skip(self))]
    pub fn transition(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<bool> {
        if to.occupies_slot() && !from.occupies_slot() {
            return Err(Error::InvalidOperation(
                "re-occupying a slot requires reclaim".to_string(),
            ));
        }

        let tx = self.begin()?;
        let Some(row) = slot_row(&tx, id)? else {
            return Ok(false);
        };
        if row.status != from {
            debug!(current = %row.status, "Status changed underneath");
            return Ok(false);
        }

        if !to.occupies_slot() {
            tx.execute(
                "DELETE FROM busy_slots WHERE staff_id = ?1 AND date = ?2 AND time = ?3 AND appointment_id = ?4",
                params![row.staff_id, row.date, row.time, id.to_string()],
            )?;
        }

        tx.execute(
            "UPDATE appointments SET status = ?1 WHERE id = ?2 AND status = ?3",
            params![to.as_str(), id.to_string(), from.as_str()],
        )?;

        tx.commit()?;
        Ok(true)
    }

    /// Cancelled -> Confirmed, only if the slot is still free
    #[instrument(skip(self))]
    pub fn reclaim(&self, id: Uuid) -> Result<ClaimOutcome> {
        let tx = self.begin()?;
        let Some(row) = slot_row(&tx, id)? else {
            return Err(Error::NotFound(format!("appointment {id}")));
        };
        if row.status != AppointmentStatus::Cancelled {
            return Err(Error::InvalidOperation(format!(
                "appointment {id} is {}, not cancelled",
                row.status
            )));
        }

        if slot_holder(&tx, &row.staff_id, &row.date, &row.time)?.is_some() {
            debug!("Slot taken while cancelled");
            return Ok(ClaimOutcome::Taken);
        }

        if let Err(e) = tx.execute(
            "UPDATE appointments SET status = ?1 WHERE id = ?2",
            params![AppointmentStatus::Confirmed.as_str(), id.to_string()],
        ) {
            let e = Error::from(e);
            if e.is_constraint_violation() {
                return Ok(ClaimOutcome::Taken);
            }
            return Err(e);
        }

        tx.execute(
            "INSERT INTO busy_slots (staff_id, date, time, appointment_id) VALUES (?1, ?2, ?3, ?4)",
            params![row.staff_id, row.date, row.time, id.to_string()],
        )?;

        tx.commit()?;
        Ok(ClaimOutcome::Claimed)
    }

    /// Find appointment by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"
        ))?;

        let appointment = stmt
            .query_row(params![id.to_string()], row_to_appointment)
            .optional()?;

        Ok(appointment)
    }

    /// List appointments matching the filter
    #[instrument(skip(self))]
    pub fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(staff_id) = filter.staff_id {
            clauses.push("staff_id = ?");
            values.push(staff_id.to_string());
        }
        if let Some(date) = filter.date {
            clauses.push("date = ?");
            values.push(format_date(date));
        }
        if let Some(status) = filter.status {
            clauses.push("status = ?");
            values.push(status.as_str().to_string());
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments {where_clause} ORDER BY date, time, created_at"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = values.iter().map(|s| s as &dyn ToSql).collect();

        let appointments = stmt
            .query_map(param_refs.as_slice(), row_to_appointment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(appointments)
    }

    /// Read the busy slot index for one staff-day
    #[instrument(skip(self))]
    pub fn busy_index(&self, staff_id: Uuid, date: NaiveDate) -> Result<BusySlotIndex> {
        let mut stmt = self.conn.prepare(
            "SELECT time, appointment_id FROM busy_slots WHERE staff_id = ?1 AND date = ?2",
        )?;

        let entries = stmt
            .query_map(params![staff_id.to_string(), format_date(date)], |row| {
                Ok((
                    parse_time(&row.get::<_, String>(0)?)?,
                    parse_uuid(&row.get::<_, String>(1)?)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut index = BusySlotIndex::new(staff_id, date);
        for (time, appointment_id) in entries {
            index.occupy(time, appointment_id);
        }
        Ok(index)
    }

    /// Rebuild `busy_slots` from the appointments table
    #[instrument(skip(self))]
    pub fn rebuild_busy_index(&self) -> Result<usize> {
        let tx = self.begin()?;
        tx.execute("DELETE FROM busy_slots", [])?;
        let restored = tx.execute(
            "INSERT INTO busy_slots (staff_id, date, time, appointment_id)
             SELECT staff_id, date, time, id FROM appointments WHERE status <> 'cancelled'",
            [],
        )?;
        tx.commit()?;
        Ok(restored)
    }
}

fn slot_holder(conn: &Connection, staff_id: &str, date: &str, time: &str) -> Result<Option<String>> {
    let holder = conn
        .query_row(
            "SELECT appointment_id FROM busy_slots WHERE staff_id = ?1 AND date = ?2 AND time = ?3",
            params![staff_id, date, time],
            |row| row.get(0),
        )
        .optional()?;
    Ok(holder)
}

fn slot_row(conn: &Connection, id: Uuid) -> Result<Option<SlotRow>> {
    let row = conn
        .query_row(
            "SELECT staff_id, date, time, status FROM appointments WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok(SlotRow {
                    staff_id: row.get(0)?,
                    date: row.get(1)?,
                    time: row.get(2)?,
                    status: parse_status(&row.get::<_, String>(3)?)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

fn insert_appointment(conn: &Connection, appointment: &Appointment) -> rusqlite::Result<usize> {
    conn.execute(
        &format!(
            "INSERT INTO appointments ({APPOINTMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        ),
        params![
            appointment.id.to_string(),
            appointment.service_id.to_string(),
            appointment.service_title,
            appointment.service_duration,
            appointment.staff_id.to_string(),
            appointment.staff_name,
            format_date(appointment.date),
            format_time(appointment.time),
            appointment.client_name,
            appointment.client_phone,
            appointment.payment_method.as_str(),
            appointment.price,
            appointment.original_price,
            appointment.status.as_str(),
            appointment.created_at.to_rfc3339(),
        ],
    )
}

fn row_to_appointment(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        service_id: parse_uuid(&row.get::<_, String>(1)?)?,
        service_title: row.get(2)?,
        service_duration: row.get(3)?,
        staff_id: parse_uuid(&row.get::<_, String>(4)?)?,
        staff_name: row.get(5)?,
        date: parse_date(&row.get::<_, String>(6)?)?,
        time: parse_time(&row.get::<_, String>(7)?)?,
        client_name: row.get(8)?,
        client_phone: row.get(9)?,
        payment_method: parse_payment(&row.get::<_, String>(10)?)?,
        price: row.get(11)?,
        original_price: row.get(12)?,
        status: parse_status(&row.get::<_, String>(13)?)?,
        created_at: parse_datetime(&row.get::<_, String>(14)?)?,
    })
}
