//! Application state management

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use directories::ProjectDirs;
use salon_core::{
    AppointmentRepository, BookingBackend, BookingDesk, BookingError, BookingPolicy, Catalog,
    Database, Durability, Error, LocalStore, Result, ServiceRepository, StaffRepository,
};

use crate::config::{Config, StoreMode, CONFIG_FILE};

/// Platform directory identifiers: `app.salon.salon`
const QUALIFIER: &str = "app";
const ORGANIZATION: &str = "salon";
const APPLICATION: &str = "salon";

/// Everything the admin commands touch
pub trait AdminStore: Catalog + StaffRepository + ServiceRepository + AppointmentRepository {}

impl<T> AdminStore for T where T: Catalog + StaffRepository + ServiceRepository + AppointmentRepository {}

/// The store selected by `booking.mode`
#[derive(Clone)]
pub enum Backend {
    Durable(Arc<Mutex<Database>>),
    Local(Arc<LocalStore>),
}

impl Backend {
    pub fn durability(&self) -> Durability {
        match self {
            Backend::Durable(_) => Durability::Durable,
            Backend::Local(_) => Durability::Local,
        }
    }

    /// Run `f` against a booking desk over this store. Blocks on the store.
    pub fn with_desk<T>(
        &self,
        policy: BookingPolicy,
        f: impl FnOnce(&BookingDesk<'_, dyn BookingBackend>) -> std::result::Result<T, BookingError>,
    ) -> std::result::Result<T, BookingError> {
        match self {
            Backend::Durable(db) => {
                let db = db.lock().unwrap_or_else(PoisonError::into_inner);
                let backend: &dyn BookingBackend = &*db;
                f(&BookingDesk::new(backend, policy))
            }
            Backend::Local(store) => {
                let backend: &dyn BookingBackend = store.as_ref();
                f(&BookingDesk::new(backend, policy))
            }
        }
    }

    /// Run `f` against the store's admin surface. Blocks on the store.
    pub fn with_store<T>(&self, f: impl FnOnce(&dyn AdminStore) -> Result<T>) -> Result<T> {
        match self {
            Backend::Durable(db) => {
                let db = db.lock().unwrap_or_else(PoisonError::into_inner);
                f(&*db)
            }
            Backend::Local(store) => f(store.as_ref()),
        }
    }
}

/// Main application state
pub struct AppState {
    pub config: Config,
    pub backend: Backend,
    data_dir: PathBuf,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let data_dir = Self::data_path()?;
        Self::with_data_dir(config, data_dir)
    }

    /// Open the configured store, resolving default paths under `data_dir`
    pub fn with_data_dir(config: Config, data_dir: PathBuf) -> Result<Self> {
        let backend = match config.booking.mode {
            StoreMode::Durable => {
                let db = open_database(&config, &data_dir)?;
                Backend::Durable(Arc::new(Mutex::new(db)))
            }
            StoreMode::Local => {
                let path = local_snapshot_path(&config, &data_dir);
                tracing::warn!(
                    path = %path.display(),
                    "Local mode: bookings are not protected against other devices"
                );
                Backend::Local(Arc::new(LocalStore::open(path)?))
            }
        };

        Ok(Self {
            config,
            backend,
            data_dir,
        })
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Open the durable database regardless of mode
    pub fn open_database(&self) -> Result<Database> {
        open_database(&self.config, &self.data_dir)
    }

    pub fn local_snapshot_path(&self) -> PathBuf {
        local_snapshot_path(&self.config, &self.data_dir)
    }

    fn data_path() -> Result<PathBuf> {
        Ok(project_dirs()?.data_dir().to_path_buf())
    }
}

/// Default location of `salon.toml`
pub fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join(CONFIG_FILE))
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION).ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine data directory",
        ))
    })
}

fn open_database(config: &Config, data_dir: &std::path::Path) -> Result<Database> {
    let db_path = config
        .storage
        .database_path
        .clone()
        .unwrap_or_else(|| data_dir.join("salon.db"));

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    Database::open_with_timeout(&db_path, config.storage.busy_timeout())
}

fn local_snapshot_path(config: &Config, data_dir: &std::path::Path) -> PathBuf {
    config
        .storage
        .local_snapshot_path
        .clone()
        .unwrap_or_else(|| data_dir.join("salon-local.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durable_mode_creates_database_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::with_data_dir(Config::default(), dir.path().join("data")).unwrap();

        assert_eq!(state.backend.durability(), Durability::Durable);
        assert!(dir.path().join("data").join("salon.db").exists());
    }

    #[test]
    fn local_mode_uses_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.booking.mode = StoreMode::Local;
        let state = AppState::with_data_dir(config, dir.path().to_path_buf()).unwrap();

        assert_eq!(state.backend.durability(), Durability::Local);
        assert_eq!(
            state.local_snapshot_path(),
            dir.path().join("salon-local.json")
        );
        let staff = state.backend.with_store(|s| s.list_staff()).unwrap();
        assert!(staff.is_empty());
    }

    #[test]
    fn config_path_uses_salon_directories() {
        // no home directory in some sandboxes
        let Ok(path) = default_config_path() else {
            return;
        };
        assert!(path.ends_with(CONFIG_FILE));
        let dir = path.parent().unwrap().to_string_lossy().to_lowercase();
        assert!(dir.contains(APPLICATION));
    }
}
