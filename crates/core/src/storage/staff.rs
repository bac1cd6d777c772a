//! Staff storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_uuid, OptionalExt};
use crate::error::{Error, Result};
use crate::models::Staff;
use crate::schedule::{normalize_json, WeeklySchedule};

const STAFF_COLUMNS: &str = "id, name, role, image, pin_hash, schedule_json, created_at";

pub struct StaffStore<'a> {
    conn: &'a Connection,
}

impl<'a> StaffStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a staff member
    #[instrument(skip(self, staff), fields(staff_id = %staff.id, name = %staff.name))]
    pub fn create(&self, staff: &Staff) -> Result<()> {
        self.conn.execute(
            "INSERT INTO staff (id, name, role, image, pin_hash, schedule_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                staff.id.to_string(),
                staff.name,
                staff.role,
                staff.image,
                staff.pin_hash,
                serde_json::to_string(&staff.schedule)?,
                staff.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find staff member by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Staff>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = ?1"))?;

        let staff = stmt
            .query_row(params![id.to_string()], row_to_staff)
            .optional()?;

        Ok(staff)
    }

    /// List all staff, by name
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<Staff>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {STAFF_COLUMNS} FROM staff ORDER BY name"))?;

        let staff = stmt
            .query_map([], row_to_staff)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(staff)
    }

    /// Replace the weekly schedule
    #[instrument(skip(self, schedule))]
    pub fn update_schedule(&self, staff_id: Uuid, schedule: &WeeklySchedule) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE staff SET schedule_json = ?1 WHERE id = ?2",
            params![serde_json::to_string(schedule)?, staff_id.to_string()],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("staff {staff_id}")));
        }
        Ok(())
    }

    /// Set or clear the PIN hash
    #[instrument(skip(self, pin_hash))]
    pub fn set_pin_hash(&self, staff_id: Uuid, pin_hash: Option<&str>) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE staff SET pin_hash = ?1 WHERE id = ?2",
            params![pin_hash, staff_id.to_string()],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("staff {staff_id}")));
        }
        Ok(())
    }
}

fn row_to_staff(row: &Row<'_>) -> rusqlite::Result<Staff> {
    // Legacy rows may hold no schedule or an older shape
    let schedule_json: Option<String> = row.get(5)?;
    let schedule_value = schedule_json.and_then(|s| serde_json::from_str(&s).ok());

    Ok(Staff {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        role: row.get(2)?,
        image: row.get(3)?,
        pin_hash: row.get(4)?,
        schedule: normalize_json(schedule_value.as_ref()),
        created_at: parse_datetime(&row.get::<_, String>(6)?)?,
    })
}
