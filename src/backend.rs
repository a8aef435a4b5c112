use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::constants::MAX_RESTART_ATTEMPTS;
use crate::platform::Platform;

/// Detection mechanism used to observe foreground-app changes.
///
/// Exactly one backend is configured at a time. Only the configured backend's
/// detection loop may trigger lock decisions; the others self-suppress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    Accessibility,
    UsageStats,
    Shizuku,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Accessibility, Backend::UsageStats, Backend::Shizuku];

    /// Backends that run their own foreground-polling service. The
    /// accessibility backend is bound by the platform, not started by us.
    pub const SERVICE_BACKENDS: [Backend; 2] = [Backend::UsageStats, Backend::Shizuku];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Accessibility => "accessibility",
            Backend::UsageStats => "usage_stats",
            Backend::Shizuku => "shizuku",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "accessibility" => Some(Backend::Accessibility),
            "usage_stats" => Some(Backend::UsageStats),
            "shizuku" => Some(Backend::Shizuku),
            _ => None,
        }
    }
}

/// Whether the accessibility detector should act on its own events.
///
/// True when it is the configured backend, or when the configured backend's
/// service has died and the detector has to take over as fallback.
pub fn accessibility_should_handle(configured: Backend, platform: &dyn Platform) -> bool {
    match configured {
        Backend::Accessibility => true,
        other => !platform.is_backend_service_running(other),
    }
}

/// Counts fallback service starts so a crash-looping backend service is not
/// restarted forever. Reset whenever the detector reconnects cleanly.
pub struct RestartTracker {
    attempts: AtomicU32,
}

impl RestartTracker {
    pub fn new() -> Self {
        Self { attempts: AtomicU32::new(0) }
    }

    pub fn reset(&self) {
        self.attempts.store(0, Ordering::SeqCst);
    }

    /// Claims one restart attempt; false once the limit is exhausted.
    pub fn try_attempt(&self) -> bool {
        self.attempts.fetch_add(1, Ordering::SeqCst) < MAX_RESTART_ATTEMPTS
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Default for RestartTracker {
    fn default() -> Self {
        Self::new()
    }
}
