use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backend::Backend;
use crate::engine::LaunchRequest;
use crate::error::AppError;
use crate::guard::UiNode;

/// System-level navigation actions the guard can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalAction {
    Back,
    Home,
    LockScreen,
}

/// Event-source queries and action sink backing the detector.
///
/// The detector itself is platform-agnostic; everything that touches the
/// device goes through this trait so the core stays testable without it.
pub trait Platform: Send + Sync {
    /// True while the device is locked or the screen is off.
    fn is_device_locked(&self) -> bool;

    /// Packages of the currently enabled keyboard IMEs.
    fn enabled_keyboard_packages(&self) -> Vec<String>;

    /// Package of the system default launcher, if one resolves.
    fn default_launcher_package(&self) -> Option<String>;

    /// Root of the active window's node tree, if one is available.
    fn active_window_root(&self) -> Option<Box<dyn UiNode>>;

    fn perform_global_action(&self, action: GlobalAction) -> Result<(), AppError>;

    fn launch_lock_overlay(&self, request: &LaunchRequest) -> Result<(), AppError>;

    fn show_toast(&self, message: &str) -> Result<(), AppError>;

    fn start_backend_service(&self, backend: Backend) -> Result<(), AppError>;

    fn stop_backend_service(&self, backend: Backend) -> Result<(), AppError>;

    /// Whether the given backend's own detection service is alive right now.
    fn is_backend_service_running(&self, backend: Backend) -> bool;

    /// Whether this app's device-admin component is still active.
    fn is_admin_active(&self) -> Result<bool, AppError>;

    /// Whether a privileged shell channel is reachable.
    fn has_privileged_shell(&self) -> bool;

    /// Ask the privileged shell to silently re-enable the accessibility service.
    fn request_accessibility_reenable(&self) -> Result<(), AppError>;

    /// Short blocking pause used only for global-action sequencing.
    fn pause(&self, duration: Duration);
}
