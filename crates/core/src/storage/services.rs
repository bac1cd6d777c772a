//! Service storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_uuid, OptionalExt};
use crate::error::{Error, Result};
use crate::models::Service;

const SERVICE_COLUMNS: &str =
    "id, title, price, duration_minutes, categories_json, description, image";

pub struct ServiceStore<'a> {
    conn: &'a Connection,
}

impl<'a> ServiceStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a service
    #[instrument(skip(self, service), fields(service_id = %service.id, title = %service.title))]
    pub fn create(&self, service: &Service) -> Result<()> {
        if service.price < 0 {
            return Err(Error::InvalidOperation(format!(
                "price must not be negative, got {}",
                service.price
            )));
        }

        self.conn.execute(
            "INSERT INTO services (id, title, price, duration_minutes, categories_json, description, image)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                service.id.to_string(),
                service.title,
                service.price,
                service.duration_minutes,
                serde_json::to_string(&service.categories)?,
                service.description,
                service.image,
            ],
        )?;
        Ok(())
    }

    /// Find service by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Service>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1"
        ))?;

        let service = stmt
            .query_row(params![id.to_string()], row_to_service)
            .optional()?;

        Ok(service)
    }

    /// List all services, by title
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<Service>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services ORDER BY title"
        ))?;

        let services = stmt
            .query_map([], row_to_service)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(services)
    }

    /// Change the list price
    #[instrument(skip(self))]
    pub fn update_price(&self, service_id: Uuid, price: i64) -> Result<()> {
        if price < 0 {
            return Err(Error::InvalidOperation(format!(
                "price must not be negative, got {price}"
            )));
        }

        let changed = self.conn.execute(
            "UPDATE services SET price = ?1 WHERE id = ?2",
            params![price, service_id.to_string()],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("service {service_id}")));
        }
        Ok(())
    }
}

fn row_to_service(row: &Row<'_>) -> rusqlite::Result<Service> {
    let categories_json: String = row.get(4)?;

    Ok(Service {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        title: row.get(1)?,
        price: row.get(2)?,
        duration_minutes: row.get::<_, Option<u32>>(3)?.unwrap_or(0),
        categories: serde_json::from_str(&categories_json).unwrap_or_default(),
        description: row.get(5)?,
        image: row.get(6)?,
    })
}
