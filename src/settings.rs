use log::warn;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::backend::Backend;
use crate::db::Database;
use crate::error::{is_unique_violation, AppError};
use crate::models::{LockedApp, Setting, TriggerExclusion};
use crate::validation::{validate_package_name, validate_unlock_duration};

const KEY_PROTECT_ENABLED: &str = "protect_enabled";
const KEY_BACKEND: &str = "backend_implementation";
const KEY_UNLOCK_DURATION: &str = "unlock_time_duration";
const KEY_ANTI_UNINSTALL: &str = "anti_uninstall_enabled";
const KEY_LOCK_TYPE: &str = "lock_type";
const KEY_GAME_DIFFICULTY: &str = "game_difficulty";

/// Which gate the lock overlay presents. A preference flag only; the overlay
/// itself is an external collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockType {
    #[default]
    Pin,
    TypingGame,
}

impl LockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockType::Pin => "pin",
            LockType::TypingGame => "typing_game",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pin" => Some(LockType::Pin),
            "typing_game" => Some(LockType::TypingGame),
            _ => None,
        }
    }
}

/// Word difficulty for the typing-game gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameDifficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl GameDifficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameDifficulty::Easy => "easy",
            GameDifficulty::Medium => "medium",
            GameDifficulty::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(GameDifficulty::Easy),
            "medium" => Some(GameDifficulty::Medium),
            "hard" => Some(GameDifficulty::Hard),
            _ => None,
        }
    }
}

/// Persistent user configuration: the locked-app set, trigger exclusions and
/// scalar preferences, all backed by the settings database.
pub struct SettingsRepository {
    db: Arc<Mutex<Database>>,
}

impl SettingsRepository {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    fn lock_db(&self) -> MutexGuard<'_, Database> {
        match self.db.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("SettingsRepository: database mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn locked_apps(&self) -> Result<HashSet<String>, AppError> {
        let db = self.lock_db();
        Ok(LockedApp::packages(db.connection())?)
    }

    pub fn is_app_locked(&self, package: &str) -> Result<bool, AppError> {
        let db = self.lock_db();
        Ok(LockedApp::find_by_package(db.connection(), package)?.is_some())
    }

    pub fn add_locked_app(&self, package: &str) -> Result<(), AppError> {
        let package = validate_package_name(package)?;
        let db = self.lock_db();

        match LockedApp::create(db.connection(), package, now_millis() as i64) {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(AppError::AlreadyExists {
                name: package.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Idempotent; removing a package that is not locked is not an error.
    pub fn remove_locked_app(&self, package: &str) -> Result<(), AppError> {
        let package = validate_package_name(package)?;
        let db = self.lock_db();
        LockedApp::delete_by_package(db.connection(), package)?;
        Ok(())
    }

    pub fn trigger_exclusions(&self) -> Result<HashSet<String>, AppError> {
        let db = self.lock_db();
        Ok(TriggerExclusion::packages(db.connection())?)
    }

    pub fn add_trigger_exclusion(&self, package: &str) -> Result<(), AppError> {
        let package = validate_package_name(package)?;
        let db = self.lock_db();

        match TriggerExclusion::create(db.connection(), package) {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(AppError::AlreadyExists {
                name: package.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Idempotent, like `remove_locked_app`.
    pub fn remove_trigger_exclusion(&self, package: &str) -> Result<(), AppError> {
        let package = validate_package_name(package)?;
        let db = self.lock_db();
        TriggerExclusion::delete_by_package(db.connection(), package)?;
        Ok(())
    }

    pub fn is_protect_enabled(&self) -> Result<bool, AppError> {
        self.get_bool(KEY_PROTECT_ENABLED, true)
    }

    pub fn set_protect_enabled(&self, enabled: bool) -> Result<(), AppError> {
        self.set_raw(KEY_PROTECT_ENABLED, bool_str(enabled))
    }

    /// The configured backend, falling back to accessibility when none has
    /// been recorded yet.
    pub fn backend_implementation(&self) -> Result<Backend, AppError> {
        Ok(self.configured_backend()?.unwrap_or_default())
    }

    /// Raw read that distinguishes "never configured" from an explicit choice.
    pub fn configured_backend(&self) -> Result<Option<Backend>, AppError> {
        let db = self.lock_db();
        let raw = Setting::get(db.connection(), KEY_BACKEND)?;
        Ok(raw.as_deref().and_then(Backend::from_str))
    }

    pub fn set_backend_implementation(&self, backend: Backend) -> Result<(), AppError> {
        self.set_raw(KEY_BACKEND, backend.as_str())
    }

    /// Cooldown window in minutes; 0 means "always re-lock immediately".
    pub fn unlock_time_duration(&self) -> Result<i64, AppError> {
        let db = self.lock_db();
        let raw = Setting::get(db.connection(), KEY_UNLOCK_DURATION)?;
        Ok(raw.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    pub fn set_unlock_time_duration(&self, minutes: i64) -> Result<(), AppError> {
        validate_unlock_duration(minutes)?;
        self.set_raw(KEY_UNLOCK_DURATION, &minutes.to_string())
    }

    pub fn is_anti_uninstall_enabled(&self) -> Result<bool, AppError> {
        self.get_bool(KEY_ANTI_UNINSTALL, false)
    }

    pub fn set_anti_uninstall_enabled(&self, enabled: bool) -> Result<(), AppError> {
        self.set_raw(KEY_ANTI_UNINSTALL, bool_str(enabled))
    }

    pub fn lock_type(&self) -> Result<LockType, AppError> {
        let db = self.lock_db();
        let raw = Setting::get(db.connection(), KEY_LOCK_TYPE)?;
        Ok(raw.as_deref().and_then(LockType::from_str).unwrap_or_default())
    }

    pub fn set_lock_type(&self, lock_type: LockType) -> Result<(), AppError> {
        self.set_raw(KEY_LOCK_TYPE, lock_type.as_str())
    }

    pub fn game_difficulty(&self) -> Result<GameDifficulty, AppError> {
        let db = self.lock_db();
        let raw = Setting::get(db.connection(), KEY_GAME_DIFFICULTY)?;
        Ok(raw.as_deref().and_then(GameDifficulty::from_str).unwrap_or_default())
    }

    pub fn set_game_difficulty(&self, difficulty: GameDifficulty) -> Result<(), AppError> {
        self.set_raw(KEY_GAME_DIFFICULTY, difficulty.as_str())
    }

    fn get_bool(&self, key: &str, default: bool) -> Result<bool, AppError> {
        let db = self.lock_db();
        let raw = Setting::get(db.connection(), key)?;
        Ok(raw.map(|v| v == "true").unwrap_or(default))
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), AppError> {
        let db = self.lock_db();
        Setting::set(db.connection(), key, value)?;
        Ok(())
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
