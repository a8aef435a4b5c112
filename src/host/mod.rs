use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::backend::Backend;
use crate::constants::OVERLAY_LAUNCH_FLAGS;
use crate::detector::Detector;
use crate::engine::LaunchRequest;
use crate::error::AppError;
use crate::event::ForegroundEvent;
use crate::guard::UiNode;
use crate::platform::{GlobalAction, Platform};

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum IncomingMessage {
    #[serde(rename = "hello")]
    Hello {
        #[serde(default)]
        launcher: Option<String>,
        #[serde(default)]
        keyboards: Vec<String>,
        #[serde(rename = "deviceLocked", default)]
        device_locked: bool,
        #[serde(rename = "adminActive", default)]
        admin_active: bool,
        #[serde(rename = "privilegedShell", default)]
        privileged_shell: bool,
    },
    #[serde(rename = "event")]
    Event {
        #[serde(flatten)]
        event: ForegroundEvent,
        #[serde(rename = "windowRoot", default)]
        window_root: Option<WireNode>,
    },
    #[serde(rename = "device_locked")]
    DeviceLocked { locked: bool },
    #[serde(rename = "admin_state")]
    AdminState { active: bool },
    #[serde(rename = "service_state")]
    ServiceState { backend: Backend, running: bool },
    #[serde(rename = "unlock_success")]
    UnlockSuccess { package: String },
    #[serde(rename = "overlay_closed")]
    OverlayClosed,
    #[serde(rename = "biometric")]
    Biometric { started: bool },
    #[serde(rename = "disconnected")]
    Disconnected,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum OutgoingMessage {
    #[serde(rename = "global_action")]
    GlobalAction { action: GlobalAction },
    #[serde(rename = "launch_overlay")]
    LaunchOverlay {
        package: String,
        #[serde(rename = "triggeringPackage", skip_serializing_if = "Option::is_none")]
        triggering_package: Option<String>,
        flags: Vec<String>,
    },
    #[serde(rename = "toast")]
    Toast { text: String },
    #[serde(rename = "start_service")]
    StartService { backend: Backend },
    #[serde(rename = "stop_service")]
    StopService { backend: Backend },
    #[serde(rename = "reenable_accessibility")]
    ReenableAccessibility,
}

/// A serialized slice of the active window's node tree, shipped with events
/// from the settings package so the tamper guard can inspect it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireNode {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub children: Vec<WireNode>,
}

impl UiNode for WireNode {
    fn text(&self) -> Option<String> {
        self.text.clone()
    }

    fn children(&self) -> Vec<&dyn UiNode> {
        self.children.iter().map(|c| c as &dyn UiNode).collect()
    }
}

pub fn read_message<R: Read>(reader: &mut R) -> io::Result<IncomingMessage> {
    // The shim protocol specifies little-endian byte order
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    // Messages are capped at 1MB (1024 * 1024 bytes)
    const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Message too large: {} bytes (max: {} bytes)", len, MAX_MESSAGE_SIZE),
        ));
    }

    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer)?;

    serde_json::from_slice(&buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub fn write_message<W: Write>(writer: &mut W, message: &OutgoingMessage) -> io::Result<()> {
    let json = serde_json::to_vec(message)?;
    let len = json.len() as u32;

    // The shim protocol specifies little-endian byte order
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&json)?;
    writer.flush()?;

    Ok(())
}

struct HostState {
    device_locked: bool,
    admin_active: bool,
    privileged_shell: bool,
    launcher: Option<String>,
    keyboards: Vec<String>,
    services_running: HashMap<Backend, bool>,
    window_root: Option<WireNode>,
}

/// `Platform` implementation over the shim channel.
///
/// Queries answer from the last state the shim pushed; actions serialize an
/// outgoing message. The shim never gets queried synchronously, so a query is
/// only as fresh as the latest push.
pub struct HostPlatform {
    state: Mutex<HostState>,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl HostPlatform {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            state: Mutex::new(HostState {
                device_locked: false,
                admin_active: false,
                privileged_shell: false,
                launcher: None,
                keyboards: Vec::new(),
                services_running: HashMap::new(),
                window_root: None,
            }),
            writer: Mutex::new(writer),
        }
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("HostPlatform: state mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn send(&self, message: &OutgoingMessage) -> Result<(), AppError> {
        let mut writer = match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("HostPlatform: writer mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        write_message(&mut *writer, message)?;
        Ok(())
    }

    fn apply_hello(
        &self,
        launcher: Option<String>,
        keyboards: Vec<String>,
        device_locked: bool,
        admin_active: bool,
        privileged_shell: bool,
    ) {
        let mut state = self.state();
        state.launcher = launcher;
        state.keyboards = keyboards;
        state.device_locked = device_locked;
        state.admin_active = admin_active;
        state.privileged_shell = privileged_shell;
    }

    fn set_device_locked(&self, locked: bool) {
        self.state().device_locked = locked;
    }

    fn set_admin_active(&self, active: bool) {
        self.state().admin_active = active;
    }

    fn set_service_state(&self, backend: Backend, running: bool) {
        self.state().services_running.insert(backend, running);
    }

    /// Each event message replaces the cached tree with its own payload, so a
    /// stale tree never answers for a later event.
    fn set_window_root(&self, root: Option<WireNode>) {
        self.state().window_root = root;
    }
}

impl Platform for HostPlatform {
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
        self.send(&OutgoingMessage::GlobalAction { action })
    }

    fn launch_lock_overlay(&self, request: &LaunchRequest) -> Result<(), AppError> {
        self.send(&OutgoingMessage::LaunchOverlay {
            package: request.locked_package.clone(),
            triggering_package: request.triggering_package.clone(),
            flags: OVERLAY_LAUNCH_FLAGS.iter().map(|f| f.to_string()).collect(),
        })
    }

    fn show_toast(&self, message: &str) -> Result<(), AppError> {
        self.send(&OutgoingMessage::Toast {
            text: message.to_string(),
        })
    }

    fn start_backend_service(&self, backend: Backend) -> Result<(), AppError> {
        self.send(&OutgoingMessage::StartService { backend })
    }

    fn stop_backend_service(&self, backend: Backend) -> Result<(), AppError> {
        self.send(&OutgoingMessage::StopService { backend })
    }

    fn is_backend_service_running(&self, backend: Backend) -> bool {
        self.state()
            .services_running
            .get(&backend)
            .copied()
            .unwrap_or(false)
    }

    fn is_admin_active(&self) -> Result<bool, AppError> {
        Ok(self.state().admin_active)
    }

    fn has_privileged_shell(&self) -> bool {
        self.state().privileged_shell
    }

    fn request_accessibility_reenable(&self) -> Result<(), AppError> {
        self.send(&OutgoingMessage::ReenableAccessibility)
    }

    fn pause(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Stdio event loop between the on-device shim and the detector.
///
/// A reader thread feeds parsed messages into a channel; the loop blocks on it
/// with a timeout bounded by the next deferred overlay launch, so a pending
/// launch fires on schedule even when the stream goes quiet.
pub struct ShimHost {
    detector: Detector,
    platform: Arc<HostPlatform>,
}

impl ShimHost {
    pub fn new(detector: Detector, platform: Arc<HostPlatform>) -> Self {
        Self { detector, platform }
    }

    pub fn run(&mut self) -> io::Result<()> {
        let (tx, rx) = mpsc::channel();

        let reader = thread::spawn(move || {
            let mut stdin = io::stdin().lock();
            loop {
                match read_message(&mut stdin) {
                    Ok(message) => {
                        if tx.send(message).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                    Err(e) => {
                        error!("failed to read shim message: {}", e);
                        break;
                    }
                }
            }
        });

        loop {
            let received = match self.detector.next_deferred_due() {
                Some(due) => {
                    let wait = Duration::from_millis(due.saturating_sub(now_millis()));
                    match rx.recv_timeout(wait) {
                        Ok(message) => Some(message),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match rx.recv() {
                    Ok(message) => Some(message),
                    Err(_) => break,
                },
            };

            if let Some(message) = received {
                self.handle_message(message);
            }
            self.detector.poll_deferred(now_millis());
        }

        info!("shim stream closed, shutting down");
        let _ = reader.join();
        Ok(())
    }

    fn handle_message(&mut self, message: IncomingMessage) {
        match message {
            IncomingMessage::Hello {
                launcher,
                keyboards,
                device_locked,
                admin_active,
                privileged_shell,
            } => {
                self.platform.apply_hello(
                    launcher,
                    keyboards,
                    device_locked,
                    admin_active,
                    privileged_shell,
                );
                if let Err(e) = self.detector.on_connected() {
                    error!("connect handling failed: {}", e);
                }
            }
            IncomingMessage::Event { event, window_root } => {
                self.platform.set_window_root(window_root);
                if let Err(e) = self.detector.on_event(&event, now_millis()) {
                    error!("event handling failed: {}", e);
                }
            }
            IncomingMessage::DeviceLocked { locked } => {
                debug!("device locked: {}", locked);
                self.platform.set_device_locked(locked);
                if locked {
                    self.detector.on_device_locked();
                }
            }
            IncomingMessage::AdminState { active } => {
                debug!("device admin active: {}", active);
                self.platform.set_admin_active(active);
            }
            IncomingMessage::ServiceState { backend, running } => {
                debug!("{:?} service running: {}", backend, running);
                self.platform.set_service_state(backend, running);
            }
            IncomingMessage::UnlockSuccess { package } => {
                if let Err(e) = self.detector.on_unlock_succeeded(&package, now_millis()) {
                    error!("unlock handling failed: {}", e);
                }
            }
            IncomingMessage::OverlayClosed => {
                self.detector.on_overlay_closed();
            }
            IncomingMessage::Biometric { started } => {
                if started {
                    self.detector.on_biometric_started();
                } else {
                    self.detector.on_biometric_finished();
                }
            }
            IncomingMessage::Disconnected => {
                if let Err(e) = self.detector.on_disconnected() {
                    error!("disconnect handling failed: {}", e);
                }
            }
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
