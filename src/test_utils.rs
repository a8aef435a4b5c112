//! Shared test utilities for AppLatch.
//!
//! This module provides common setup functions and platform doubles used
//! across test modules.

#![cfg(test)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::{tempdir, TempDir};

use crate::backend::Backend;
use crate::db::{migrations, Database};
use crate::engine::LaunchRequest;
use crate::error::AppError;
use crate::guard::UiNode;
use crate::platform::{GlobalAction, Platform};
use crate::settings::SettingsRepository;

/// Create a temporary test database with migrations applied.
///
/// Returns a tuple of (Database, TempDir). The TempDir must be kept alive
/// for the duration of the test to prevent the database file from being deleted.
pub fn setup_test_db() -> (Database, TempDir) {
    let dir = tempdir().expect("Failed to create temp directory for test DB");
    let db_path = dir.path().join("test.db");
    let db = Database::open(&db_path).expect("Failed to open test database");
    migrations::run(db.connection()).expect("Failed to run migrations on test DB");
    (db, dir)
}

/// Create a settings repository over a fresh temporary database.
pub fn setup_test_repository() -> (Arc<SettingsRepository>, TempDir) {
    let (db, dir) = setup_test_db();
    let repo = SettingsRepository::new(Arc::new(Mutex::new(db)));
    (Arc::new(repo), dir)
}

/// Concrete UI tree for exercising the tamper guard's node search.
#[derive(Debug, Clone)]
pub struct TestNode {
    text: Option<String>,
    children: Vec<TestNode>,
}

impl TestNode {
    pub fn leaf(text: &str) -> Self {
        Self { text: Some(text.to_string()), children: Vec::new() }
    }

    pub fn container(children: Vec<TestNode>) -> Self {
        Self { text: None, children }
    }
}

impl UiNode for TestNode {
    fn text(&self) -> Option<String> {
        self.text.clone()
    }

    fn children(&self) -> Vec<&dyn UiNode> {
        self.children.iter().map(|c| c as &dyn UiNode).collect()
    }
}

/// One observable side effect issued through the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    Action(GlobalAction),
    Pause(u64),
    Toast(String),
    LaunchOverlay(LaunchRequest),
    StartService(Backend),
    StopService(Backend),
    ReenableAccessibility,
}

struct TestPlatformState {
    device_locked: bool,
    launcher: Option<String>,
    keyboards: Vec<String>,
    window_root: Option<TestNode>,
    services_running: HashMap<Backend, bool>,
    admin_active: bool,
    admin_lookup_fails: bool,
    privileged_shell: bool,
    overlay_launch_fails: bool,
    calls: Vec<PlatformCall>,
}

/// Scriptable platform double that records every action it is asked to take.
pub struct TestPlatform {
    state: Mutex<TestPlatformState>,
}

impl TestPlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TestPlatformState {
                device_locked: false,
                launcher: Some("com.google.android.apps.nexuslauncher".to_string()),
                keyboards: vec!["com.google.android.inputmethod.latin".to_string()],
                window_root: None,
                services_running: HashMap::new(),
                admin_active: false,
                admin_lookup_fails: false,
                privileged_shell: false,
                overlay_launch_fails: false,
                calls: Vec::new(),
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, TestPlatformState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn set_device_locked(&self, locked: bool) {
        self.state().device_locked = locked;
    }

    pub fn set_launcher(&self, launcher: Option<&str>) {
        self.state().launcher = launcher.map(str::to_string);
    }

    pub fn set_window_root(&self, root: TestNode) {
        self.state().window_root = Some(root);
    }

    pub fn clear_window_root(&self) {
        self.state().window_root = None;
    }

    pub fn set_service_running(&self, backend: Backend, running: bool) {
        self.state().services_running.insert(backend, running);
    }

    pub fn set_admin_active(&self, active: bool) {
        self.state().admin_active = active;
    }

    pub fn fail_admin_lookup(&self) {
        self.state().admin_lookup_fails = true;
    }

    pub fn set_privileged_shell(&self, available: bool) {
        self.state().privileged_shell = available;
    }

    pub fn fail_overlay_launches(&self, fails: bool) {
        self.state().overlay_launch_fails = fails;
    }
}

impl Platform for TestPlatform {
    fn is_device_locked(&self) -> bool {
        self.state().device_locked
    }

    fn enabled_keyboard_packages(&self) -> Vec<String> {
        self.state().keyboards.clone()
    }

    fn default_launcher_package(&self) -> Option<String> {
        self.state().launcher.clone()
    }

    fn active_window_root(&self) -> Option<Box<dyn UiNode>> {
        self.state()
            .window_root
            .clone()
            .map(|root| Box::new(root) as Box<dyn UiNode>)
    }

    fn perform_global_action(&self, action: GlobalAction) -> Result<(), AppError> {
        self.state().calls.push(PlatformCall::Action(action));
        Ok(())
    }

    fn launch_lock_overlay(&self, request: &LaunchRequest) -> Result<(), AppError> {
        let mut state = self.state();
        if state.overlay_launch_fails {
            return Err(AppError::OverlayLaunch("scripted launch failure".to_string()));
        }
        state.calls.push(PlatformCall::LaunchOverlay(request.clone()));
        Ok(())
    }

    fn show_toast(&self, message: &str) -> Result<(), AppError> {
        self.state().calls.push(PlatformCall::Toast(message.to_string()));
        Ok(())
    }

    fn start_backend_service(&self, backend: Backend) -> Result<(), AppError> {
        self.state().calls.push(PlatformCall::StartService(backend));
        Ok(())
    }

    fn stop_backend_service(&self, backend: Backend) -> Result<(), AppError> {
        self.state().calls.push(PlatformCall::StopService(backend));
        Ok(())
    }

    fn is_backend_service_running(&self, backend: Backend) -> bool {
        self.state().services_running.get(&backend).copied().unwrap_or(false)
    }

    fn is_admin_active(&self) -> Result<bool, AppError> {
        let state = self.state();
        if state.admin_lookup_fails {
            return Err(AppError::SystemService("scripted admin lookup failure".to_string()));
        }
        Ok(state.admin_active)
    }

    fn has_privileged_shell(&self) -> bool {
        self.state().privileged_shell
    }

    fn request_accessibility_reenable(&self) -> Result<(), AppError> {
        self.state().calls.push(PlatformCall::ReenableAccessibility);
        Ok(())
    }

    fn pause(&self, duration: Duration) {
        self.state().calls.push(PlatformCall::Pause(duration.as_millis() as u64));
    }
}
