use log::{error, warn};
use std::time::Duration;

use crate::constants::{
    ACCESSIBILITY_SETTINGS_CLASSES, ADMIN_CONFIG_CLASSES, ALERT_DIALOG_CLASS, ANTI_UNINSTALL_TOAST,
    APP_LABEL_VARIANTS, DEVICE_ADMIN_CONTENT_DESC, FRAME_LAYOUT_CLASS, SUB_SETTINGS_CLASS,
    TAMPER_ACTION_PAUSE_MS,
};
use crate::error::AppError;
use crate::event::ForegroundEvent;
use crate::platform::{GlobalAction, Platform};

/// Read-only view of one node in the active window's UI tree.
///
/// Nodes are owned by the platform and must not be mutated, only read.
pub trait UiNode {
    fn text(&self) -> Option<String>;
    fn children(&self) -> Vec<&dyn UiNode>;
}

/// Depth-first search for a node whose text contains the needle,
/// case-insensitive, short-circuiting on the first match.
pub fn tree_contains_text(root: &dyn UiNode, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    contains_lowered(root, &needle)
}

fn contains_lowered(node: &dyn UiNode, needle: &str) -> bool {
    if let Some(text) = node.text() {
        if text.to_lowercase().contains(needle) {
            return true;
        }
    }
    node.children().into_iter().any(|child| contains_lowered(child, needle))
}

/// Blocks navigation toward disabling the accessibility service or the
/// device-admin component.
///
/// Only consulted for events from the system settings package while
/// anti-uninstall is enabled; the detector gates both. Failures inside the
/// guard are logged and swallowed so a guard error never takes down the
/// detector with it.
pub struct TamperGuard;

impl TamperGuard {
    pub fn new() -> Self {
        Self
    }

    /// Inspects one settings event; returns true when a block was issued.
    pub fn handle_event(&self, event: &ForegroundEvent, platform: &dyn Platform) -> bool {
        let root = match platform.active_window_root() {
            Some(root) => root,
            None => return false,
        };

        let mut acted = false;

        if is_service_disable_page(event) {
            warn!("blocking accessibility service deactivation");
            if let Err(e) = self.eject_from_settings(platform) {
                error!("failed to issue ejection actions: {}", e);
            }
            acted = true;
        }

        let on_admin_page = is_admin_page(event);
        let app_visible = APP_LABEL_VARIANTS
            .iter()
            .any(|label| tree_contains_text(root.as_ref(), label));

        if !on_admin_page || !app_visible {
            return acted;
        }

        match self.block_admin_deactivation(platform) {
            Ok(blocked) => acted |= blocked,
            Err(e) => error!("error checking device admin deactivation: {}", e),
        }

        acted
    }

    fn eject_from_settings(&self, platform: &dyn Platform) -> Result<(), AppError> {
        platform.perform_global_action(GlobalAction::Back)?;
        platform.perform_global_action(GlobalAction::Home)?;
        platform.perform_global_action(GlobalAction::LockScreen)
    }

    fn block_admin_deactivation(&self, platform: &dyn Platform) -> Result<bool, AppError> {
        if !platform.is_admin_active()? {
            return Ok(false);
        }

        platform.perform_global_action(GlobalAction::Back)?;
        platform.perform_global_action(GlobalAction::Back)?;
        platform.perform_global_action(GlobalAction::Home)?;
        platform.pause(Duration::from_millis(TAMPER_ACTION_PAUSE_MS));
        platform.perform_global_action(GlobalAction::LockScreen)?;
        platform.show_toast(ANTI_UNINSTALL_TOAST)?;

        warn!("blocked device admin deactivation attempt");
        Ok(true)
    }
}

impl Default for TamperGuard {
    fn default() -> Self {
        Self::new()
    }
}

fn mentions_app_label(event: &ForegroundEvent) -> bool {
    APP_LABEL_VARIANTS.iter().any(|label| event.text_contains(label))
}

fn is_service_disable_page(event: &ForegroundEvent) -> bool {
    let class = match event.class_name.as_deref() {
        Some(c) => c,
        None => return false,
    };

    (class == SUB_SETTINGS_CLASS && mentions_app_label(event))
        || (class == ALERT_DIALOG_CLASS
            && APP_LABEL_VARIANTS.iter().any(|label| event.first_text_contains(label)))
        || (ACCESSIBILITY_SETTINGS_CLASSES.contains(&class) && mentions_app_label(event))
}

fn is_admin_page(event: &ForegroundEvent) -> bool {
    let class = event.class_name.as_deref();

    let admin_frame = event
        .content_description
        .as_deref()
        .map(|d| d.contains(DEVICE_ADMIN_CONTENT_DESC))
        .unwrap_or(false)
        && class == Some(FRAME_LAYOUT_CLASS);

    admin_frame || class.map(|c| ADMIN_CONFIG_CLASSES.contains(&c)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEVICE_ADMIN_SETTINGS_PACKAGE;
    use crate::test_utils::{PlatformCall, TestNode, TestPlatform};

    fn settings_event(class_name: &str) -> ForegroundEvent {
        ForegroundEvent::window_state(DEVICE_ADMIN_SETTINGS_PACKAGE, class_name, 0)
    }

    fn admin_page_tree() -> TestNode {
        TestNode::container(vec![
            TestNode::leaf("Deactivate this device admin app?"),
            TestNode::container(vec![TestNode::leaf("AppLatch")]),
        ])
    }

    #[test]
    fn test_dfs_finds_nested_text_case_insensitively() {
        let tree = TestNode::container(vec![
            TestNode::leaf("something else"),
            TestNode::container(vec![TestNode::leaf("Open APPLATCH settings")]),
        ]);

        assert!(tree_contains_text(&tree, "AppLatch"));
        assert!(!tree_contains_text(&tree, "other app"));
    }

    #[test]
    fn test_admin_deactivation_blocked_with_exact_sequence() {
        let platform = TestPlatform::new();
        platform.set_window_root(admin_page_tree());
        platform.set_admin_active(true);

        let guard = TamperGuard::new();
        let event = settings_event("com.android.settings.DeviceAdminAdd");

        assert!(guard.handle_event(&event, &platform));
        assert_eq!(
            platform.calls(),
            vec![
                PlatformCall::Action(GlobalAction::Back),
                PlatformCall::Action(GlobalAction::Back),
                PlatformCall::Action(GlobalAction::Home),
                PlatformCall::Pause(TAMPER_ACTION_PAUSE_MS),
                PlatformCall::Action(GlobalAction::LockScreen),
                PlatformCall::Toast(ANTI_UNINSTALL_TOAST.to_string()),
            ]
        );
    }

    #[test]
    fn test_admin_frame_matched_by_content_description() {
        let platform = TestPlatform::new();
        platform.set_window_root(admin_page_tree());
        platform.set_admin_active(true);

        let guard = TamperGuard::new();
        let mut event = settings_event("android.widget.FrameLayout");
        event.content_description = Some("Device admin app details".to_string());

        assert!(guard.handle_event(&event, &platform));
    }

    #[test]
    fn test_missing_node_tree_means_no_action() {
        let platform = TestPlatform::new();
        platform.set_admin_active(true);

        let guard = TamperGuard::new();
        let event = settings_event("com.android.settings.DeviceAdminAdd");

        assert!(!guard.handle_event(&event, &platform));
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn test_admin_page_without_app_label_is_left_alone() {
        let platform = TestPlatform::new();
        platform.set_window_root(TestNode::container(vec![TestNode::leaf("Some other admin")]));
        platform.set_admin_active(true);

        let guard = TamperGuard::new();
        let event = settings_event("com.android.settings.DeviceAdminAdd");

        assert!(!guard.handle_event(&event, &platform));
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn test_inactive_admin_is_not_defended() {
        let platform = TestPlatform::new();
        platform.set_window_root(admin_page_tree());
        platform.set_admin_active(false);

        let guard = TamperGuard::new();
        let event = settings_event("com.android.settings.DeviceAdminAdd");

        assert!(!guard.handle_event(&event, &platform));
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn test_admin_lookup_error_fails_closed() {
        let platform = TestPlatform::new();
        platform.set_window_root(admin_page_tree());
        platform.fail_admin_lookup();

        let guard = TamperGuard::new();
        let event = settings_event("com.android.settings.DeviceAdminAdd");

        assert!(!guard.handle_event(&event, &platform));
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn test_service_disable_page_ejects_user() {
        let platform = TestPlatform::new();
        platform.set_window_root(TestNode::leaf("Accessibility"));

        let guard = TamperGuard::new();
        let mut event = settings_event(SUB_SETTINGS_CLASS);
        event.text = vec!["Use AppLatch".to_string()];

        assert!(guard.handle_event(&event, &platform));
        assert_eq!(
            platform.calls(),
            vec![
                PlatformCall::Action(GlobalAction::Back),
                PlatformCall::Action(GlobalAction::Home),
                PlatformCall::Action(GlobalAction::LockScreen),
            ]
        );
    }

    #[test]
    fn test_alert_dialog_matches_on_first_text_segment_only() {
        let platform = TestPlatform::new();
        platform.set_window_root(TestNode::leaf("Accessibility"));

        let guard = TamperGuard::new();
        let mut event = settings_event(ALERT_DIALOG_CLASS);
        event.text = vec!["Cancel".to_string(), "Stop AppLatch?".to_string()];

        assert!(!guard.handle_event(&event, &platform));

        event.text = vec!["Stop AppLatch?".to_string()];
        assert!(guard.handle_event(&event, &platform));
    }

    #[test]
    fn test_unrelated_settings_event_is_ignored() {
        let platform = TestPlatform::new();
        platform.set_window_root(TestNode::leaf("Network settings"));
        platform.set_admin_active(true);

        let guard = TamperGuard::new();
        let event = settings_event("com.android.settings.Settings");

        assert!(!guard.handle_event(&event, &platform));
        assert!(platform.calls().is_empty());
    }
}
