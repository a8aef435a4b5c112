use log::{debug, info};
use std::sync::Arc;

use crate::error::AppError;
use crate::session::{BiometricState, UnlockState};
use crate::settings::SettingsRepository;

/// Context handed to the overlay collaborator when a lock fires.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRequest {
    pub locked_package: String,
    pub triggering_package: Option<String>,
}

/// Decides whether a genuine app switch gets the lock overlay.
pub struct LockEngine {
    settings: Arc<SettingsRepository>,
    session: Arc<UnlockState>,
}

impl LockEngine {
    pub fn new(settings: Arc<SettingsRepository>, session: Arc<UnlockState>) -> Self {
        Self { settings, session }
    }

    /// Applies the suppression chain for one genuine switch, short-circuiting
    /// on the first blocking condition. On a lock decision the overlay-showing
    /// flag is set and the temporary unlock cleared before the request is
    /// returned; the caller owns the deferred launch.
    pub fn evaluate(
        &self,
        package: &str,
        triggering: Option<&str>,
        now: u64,
    ) -> Result<Option<LaunchRequest>, AppError> {
        if self.session.is_overlay_showing()
            || self.session.biometric_state() == BiometricState::AuthStarted
        {
            debug!("not locking {}: overlay or biometric prompt already up", package);
            return Ok(None);
        }

        if !self.settings.is_app_locked(package)? {
            debug!("not locking {}: not in the locked set", package);
            return Ok(None);
        }

        if self.session.is_temporarily_unlocked(package) {
            debug!("not locking {}: temporarily unlocked", package);
            return Ok(None);
        }

        let duration_minutes = self.settings.unlock_time_duration()?;
        if duration_minutes > 0 && self.session.within_cooldown(package, now, duration_minutes) {
            debug!("not locking {}: within the re-lock window", package);
            return Ok(None);
        }

        if let Some(trigger) = triggering {
            if self.settings.trigger_exclusions()?.contains(trigger) {
                debug!("not locking {}: triggered from excluded {}", package, trigger);
                return Ok(None);
            }
        }

        info!("locked app detected: {}, requesting overlay", package);
        self.session.set_overlay_showing(true);
        self.session.clear_temporary_unlock();

        Ok(Some(LaunchRequest {
            locked_package: package.to_string(),
            triggering_package: triggering.map(str::to_string),
        }))
    }
}
