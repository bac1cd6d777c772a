//! Staff PIN credentials

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::Staff;
use crate::storage::Catalog;

pub const MIN_PIN_LEN: usize = 4;
pub const MAX_PIN_LEN: usize = 8;

/// Hash a 4 to 8 digit PIN for storage
pub fn hash_pin(pin: &str) -> Result<String> {
    if !(MIN_PIN_LEN..=MAX_PIN_LEN).contains(&pin.len()) || !pin.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(Error::InvalidOperation(format!(
            "PIN must be {MIN_PIN_LEN} to {MAX_PIN_LEN} digits"
        )));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| Error::InvalidOperation(format!("failed to hash PIN: {e}")))?;
    Ok(hash.to_string())
}

/// False for a wrong PIN or an unreadable stored hash
pub fn verify_pin(stored_hash: &str, pin: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(pin.as_bytes(), &parsed)
        .is_ok()
}

/// Look up a staff member and check their PIN
#[instrument(skip(catalog, pin))]
pub fn authenticate_staff<C: Catalog + ?Sized>(
    catalog: &C,
    staff_id: Uuid,
    pin: &str,
) -> Result<Staff> {
    let staff = catalog
        .find_staff(staff_id)?
        .ok_or_else(|| Error::Authentication("unknown staff member".into()))?;

    let Some(hash) = staff.pin_hash.as_deref() else {
        return Err(Error::Authentication(format!("{} has no PIN set", staff.name)));
    };
    if !verify_pin(hash, pin) {
        debug!("Wrong PIN");
        return Err(Error::Authentication("wrong PIN".into()));
    }

    Ok(staff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Database, StaffRepository};

    #[test]
    fn hash_and_verify() {
        let hash = hash_pin("4821").unwrap();
        assert!(verify_pin(&hash, "4821"));
        assert!(!verify_pin(&hash, "4822"));
        assert!(!verify_pin("not a hash", "4821"));
    }

    #[test]
    fn malformed_pins_are_rejected() {
        assert!(hash_pin("12").is_err());
        assert!(hash_pin("12ab").is_err());
        assert!(hash_pin("123456789").is_err());
    }

    #[test]
    fn authenticate_against_store() {
        let db = Database::open_in_memory().unwrap();
        let staff = Staff::new("Lucas".into(), "Barbero".into());
        db.create_staff(&staff).unwrap();

        assert!(matches!(
            authenticate_staff(&db, staff.id, "1234"),
            Err(Error::Authentication(_))
        ));

        db.set_pin_hash(staff.id, Some(&hash_pin("1234").unwrap()))
            .unwrap();
        assert_eq!(authenticate_staff(&db, staff.id, "1234").unwrap().id, staff.id);
        assert!(authenticate_staff(&db, staff.id, "9999").is_err());
        assert!(authenticate_staff(&db, Uuid::new_v4(), "1234").is_err());
    }
}
