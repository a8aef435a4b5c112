/// Package name of the AppLatch app itself; events from it never arm a lock.
pub const OWN_PACKAGE: &str = "dev.applatch.android";

/// Label variants the tamper guard searches for in settings pages and dialogs.
pub const APP_LABEL_VARIANTS: &[&str] = &["AppLatch", "App Latch"];

/// Package of the system settings app, where deactivation attempts happen.
pub const DEVICE_ADMIN_SETTINGS_PACKAGE: &str = "com.android.settings";

/// Launcher class that reports recents/home pane transitions via event text.
pub const QUICKSTEP_LAUNCHER_CLASS: &str = "com.android.launcher3.uioverrides.QuickstepLauncher";

/// Lowercased text fragment the launcher emits when the recents pane appears.
pub const RECENTS_PANE_TEXT: &str = "recent apps";

/// Lowercased text fragment the launcher emits when the home screen returns.
pub const HOME_SCREEN_TEXT: &str = "home screen";

/// System packages whose window events never count as an app switch.
pub const EXCLUDED_PACKAGES: &[&str] = &[
    "android",
    "com.android.systemui",
    "com.android.intentresolver",
    "com.android.permissioncontroller",
    "com.google.android.permissioncontroller",
];

/// Window classes belonging to recents/overview implementations.
pub const KNOWN_RECENTS_CLASSES: &[&str] = &[
    "com.android.systemui.recents.RecentsActivity",
    "com.android.quickstep.RecentsActivity",
    "com.android.quickstep.TaskbarRecentsActivity",
];

/// Settings page class shown when drilling into a single preference screen.
pub const SUB_SETTINGS_CLASS: &str = "com.android.settings.SubSettings";

/// Generic alert dialog class used by the service-disable confirmation.
pub const ALERT_DIALOG_CLASS: &str = "android.app.AlertDialog";

/// Settings classes that host the accessibility-service toggle pages.
pub const ACCESSIBILITY_SETTINGS_CLASSES: &[&str] = &[
    "com.android.settings.Settings$AccessibilitySettingsActivity",
    "com.android.settings.accessibility.AccessibilitySettingsActivity",
    "com.samsung.android.settings.accessibility.AccessibilitySettings",
];

/// Settings classes that host device-admin deactivation pages.
pub const ADMIN_CONFIG_CLASSES: &[&str] = &[
    "com.android.settings.DeviceAdminAdd",
    "com.android.settings.applications.specialaccess.deviceadmin.DeviceAdminAdd",
    "com.android.settings.Settings$DeviceAdminSettingsActivity",
];

/// Content description marking the device-admin detail frame.
pub const DEVICE_ADMIN_CONTENT_DESC: &str = "Device admin app";

/// Window class carrying the device-admin content description.
pub const FRAME_LAYOUT_CLASS: &str = "android.widget.FrameLayout";

/// Delay before the lock overlay launch fires, in milliseconds.
///
/// Launching in the same dispatch as the window event races the window manager
/// on some vendor skins; the original shipped 50 ms and it is kept tunable here.
pub const OVERLAY_LAUNCH_DELAY_MS: u64 = 50;

/// Pause between the Home and Lock-Screen global actions in the tamper guard,
/// in milliseconds. Empirical sequencing workaround, kept tunable.
pub const TAMPER_ACTION_PAUSE_MS: u64 = 100;

/// Activity flags the shim must apply when launching the lock overlay.
pub const OVERLAY_LAUNCH_FLAGS: &[&str] = &[
    "new_task",
    "exclude_from_recents",
    "no_animation",
    "from_background",
    "reorder_to_front",
];

/// Toast shown once when a device-admin deactivation attempt is blocked.
pub const ANTI_UNINSTALL_TOAST: &str =
    "Disable anti-uninstall from AppLatch settings to remove this restriction.";

/// Maximum unlock duration in minutes (24 hours).
pub const MAX_UNLOCK_DURATION_MINUTES: i64 = 24 * 60;

/// Maximum accepted package name length (platform limit).
pub const MAX_PACKAGE_NAME_LEN: usize = 255;

/// Maximum automatic restarts of a fallback backend service before giving up.
pub const MAX_RESTART_ATTEMPTS: u32 = 3;
