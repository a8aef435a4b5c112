use log::warn;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Whether a system biometric prompt is currently in flight.
///
/// Must be Idle before a new lock overlay may launch, so a prompt already on
/// screen is never stacked with a second overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiometricState {
    Idle,
    AuthStarted,
}

struct Inner {
    /// The single outstanding temporarily-unlocked package, if any.
    unlocked: Option<String>,
    /// Package -> last successful unlock, epoch millis.
    unlock_times: HashMap<String, u64>,
}

/// Process-wide unlock state shared between the detector and the overlay
/// collaborator.
///
/// Event handling is serialized on one dispatch context, but the overlay
/// toggles the flags from outside it, so the flags are atomics and the rest
/// sits behind a mutex rather than ad hoc shared reads.
pub struct UnlockState {
    inner: Mutex<Inner>,
    overlay_showing: AtomicBool,
    biometric: AtomicU8,
}

impl UnlockState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                unlocked: None,
                unlock_times: HashMap::new(),
            }),
            overlay_showing: AtomicBool::new(false),
            biometric: AtomicU8::new(BIOMETRIC_IDLE),
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("UnlockState: mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// True iff pkg equals the single outstanding temporarily-unlocked package.
    pub fn is_temporarily_unlocked(&self, pkg: &str) -> bool {
        self.lock_inner().unlocked.as_deref() == Some(pkg)
    }

    pub fn temporarily_unlocked(&self) -> Option<String> {
        self.lock_inner().unlocked.clone()
    }

    /// Grants the temporary unlock to pkg, replacing any previous grant.
    pub fn set_temporarily_unlocked(&self, pkg: &str) {
        self.lock_inner().unlocked = Some(pkg.to_string());
    }

    /// Idempotent.
    pub fn clear_temporary_unlock(&self) {
        self.lock_inner().unlocked = None;
    }

    /// Stores the unlock timestamp for the cooldown window. A duration of 0
    /// means "always re-lock immediately", so nothing is stored.
    pub fn record_unlock_success(&self, pkg: &str, now: u64, duration_minutes: i64) {
        if duration_minutes > 0 {
            self.lock_inner().unlock_times.insert(pkg.to_string(), now);
        }
    }

    /// True iff an unexpired unlock timestamp exists for pkg. An expired entry
    /// is deleted as a side effect of the false result.
    pub fn within_cooldown(&self, pkg: &str, now: u64, duration_minutes: i64) -> bool {
        if duration_minutes <= 0 {
            return false;
        }

        let mut inner = self.lock_inner();
        let ts = match inner.unlock_times.get(pkg) {
            Some(&ts) => ts,
            None => return false,
        };

        let window_ms = duration_minutes as u64 * 60_000;
        if now.saturating_sub(ts) < window_ms {
            true
        } else {
            inner.unlock_times.remove(pkg);
            false
        }
    }

    /// The device going to sleep invalidates every grace window, since the
    /// user must re-authenticate to the OS itself.
    pub fn on_device_locked(&self) {
        let mut inner = self.lock_inner();
        inner.unlock_times.clear();
        inner.unlocked = None;
    }

    pub fn is_overlay_showing(&self) -> bool {
        self.overlay_showing.load(Ordering::SeqCst)
    }

    pub fn set_overlay_showing(&self, showing: bool) {
        self.overlay_showing.store(showing, Ordering::SeqCst);
    }

    pub fn biometric_state(&self) -> BiometricState {
        match self.biometric.load(Ordering::SeqCst) {
            BIOMETRIC_AUTH_STARTED => BiometricState::AuthStarted,
            _ => BiometricState::Idle,
        }
    }

    pub fn set_biometric_state(&self, state: BiometricState) {
        let raw = match state {
            BiometricState::Idle => BIOMETRIC_IDLE,
            BiometricState::AuthStarted => BIOMETRIC_AUTH_STARTED,
        };
        self.biometric.store(raw, Ordering::SeqCst);
    }
}

impl Default for UnlockState {
    fn default() -> Self {
        Self::new()
    }
}

const BIOMETRIC_IDLE: u8 = 0;
const BIOMETRIC_AUTH_STARTED: u8 = 1;
