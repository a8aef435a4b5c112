use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::{accessibility_should_handle, Backend, RestartTracker};
use crate::classifier::{Classification, Classifier};
use crate::constants::{DEVICE_ADMIN_SETTINGS_PACKAGE, OVERLAY_LAUNCH_DELAY_MS};
use crate::engine::{LaunchRequest, LockEngine};
use crate::error::AppError;
use crate::event::ForegroundEvent;
use crate::guard::TamperGuard;
use crate::platform::Platform;
use crate::session::{BiometricState, UnlockState};
use crate::settings::SettingsRepository;

struct PendingLaunch {
    due_at_ms: u64,
    request: LaunchRequest,
}

/// The detection service: consumes the foreground event stream and enforces
/// locks through the platform.
///
/// All event handling is serialized on one dispatch context. The deferred
/// overlay launch sits on the same context's queue, so a later event can
/// never be classified before an earlier launch fires.
pub struct Detector {
    settings: Arc<SettingsRepository>,
    session: Arc<UnlockState>,
    platform: Arc<dyn Platform>,
    engine: LockEngine,
    classifier: Classifier,
    guard: TamperGuard,
    restarts: RestartTracker,
    running: AtomicBool,
    pending: VecDeque<PendingLaunch>,
}

impl Detector {
    pub fn new(
        settings: Arc<SettingsRepository>,
        session: Arc<UnlockState>,
        platform: Arc<dyn Platform>,
    ) -> Self {
        let engine = LockEngine::new(Arc::clone(&settings), Arc::clone(&session));
        Self {
            settings,
            session,
            platform,
            engine,
            classifier: Classifier::new(None, Vec::new()),
            guard: TamperGuard::new(),
            restarts: RestartTracker::new(),
            running: AtomicBool::new(false),
            pending: VecDeque::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Service creation: mark running, reset biometric state and hand the
    /// primary detection role to the configured backend's service.
    pub fn on_created(&self) -> Result<(), AppError> {
        self.running.store(true, Ordering::SeqCst);
        self.session.set_biometric_state(BiometricState::Idle);
        self.start_primary_backend_service()
    }

    /// Connection to the event stream: resolve the launcher and keyboard
    /// packages, reset the restart counter and claim the backend slot if no
    /// backend was ever configured. A connection that arrives after a
    /// teardown is a service recreation and re-runs the creation step first.
    pub fn on_connected(&mut self) -> Result<(), AppError> {
        if !self.is_running() {
            self.on_created()?;
        }

        let launcher = self.platform.default_launcher_package();
        if launcher.is_none() {
            warn!("could not resolve a system launcher package");
        }
        let keyboards = self.platform.enabled_keyboard_packages();
        self.classifier = Classifier::new(launcher, keyboards);

        self.restarts.reset();

        if self.settings.configured_backend()?.is_none() {
            self.settings.set_backend_implementation(Backend::Accessibility)?;
        }

        info!("detector connected");
        Ok(())
    }

    /// Handles one foreground event at pipeline time `now_ms`.
    pub fn on_event(&mut self, event: &ForegroundEvent, now_ms: u64) -> Result<(), AppError> {
        debug!(
            "event received: package={:?} class={:?} kind={:?}",
            event.package, event.class_name, event.kind
        );

        if self.settings.is_anti_uninstall_enabled()?
            && event.package.as_deref() == Some(DEVICE_ADMIN_SETTINGS_PACKAGE)
        {
            self.guard.handle_event(event, self.platform.as_ref());
        }

        if !self.settings.is_protect_enabled()? || !self.is_running() {
            return Ok(());
        }

        match self.classifier.classify(event) {
            Classification::RecentsEntered => {
                debug!("entering recents");
                return Ok(());
            }
            Classification::RecentsExitedToApp(pkg) => {
                let unlocked = self.session.temporarily_unlocked();
                if unlocked.as_deref() != Some(pkg.as_str())
                    && !self.settings.trigger_exclusions()?.contains(&pkg)
                {
                    self.session.clear_temporary_unlock();
                }
                return Ok(());
            }
            Classification::ReturnedHome => {
                self.session.clear_temporary_unlock();
                return Ok(());
            }
            Classification::Ignore => {
                self.finish_event(event, now_ms, None)?;
            }
            Classification::GenuineSwitch { package, triggering } => {
                self.finish_event(event, now_ms, Some((package, triggering)))?;
            }
        }

        Ok(())
    }

    fn finish_event(
        &mut self,
        event: &ForegroundEvent,
        now_ms: u64,
        switch: Option<(String, Option<String>)>,
    ) -> Result<(), AppError> {
        if event.package.is_none() {
            return Ok(());
        }

        if self.platform.is_device_locked() {
            self.session.on_device_locked();
            return Ok(());
        }

        let configured = self.settings.backend_implementation()?;
        if !accessibility_should_handle(configured, self.platform.as_ref()) {
            debug!("{:?} backend service is handling detection", configured);
            return Ok(());
        }

        if let Some((package, triggering)) = switch {
            if let Some(request) = self.engine.evaluate(&package, triggering.as_deref(), now_ms)? {
                self.schedule_launch(request, now_ms);
            }
        }

        Ok(())
    }

    fn schedule_launch(&mut self, request: LaunchRequest, now_ms: u64) {
        self.pending.push_back(PendingLaunch {
            due_at_ms: now_ms + OVERLAY_LAUNCH_DELAY_MS,
            request,
        });
    }

    /// Fires deferred overlay launches that have come due. A failed launch
    /// resets the overlay-showing flag so a later switch can retry.
    pub fn poll_deferred(&mut self, now_ms: u64) {
        while let Some(front) = self.pending.front() {
            if front.due_at_ms > now_ms {
                break;
            }
            let pending = match self.pending.pop_front() {
                Some(p) => p,
                None => break,
            };

            info!(
                "starting lock overlay for '{}'",
                pending.request.locked_package
            );
            if let Err(e) = self.platform.launch_lock_overlay(&pending.request) {
                error!(
                    "failed to start lock overlay for '{}': {}",
                    pending.request.locked_package, e
                );
                self.session.set_overlay_showing(false);
            }
        }
    }

    /// Due time of the next deferred launch, if one is queued.
    pub fn next_deferred_due(&self) -> Option<u64> {
        self.pending.front().map(|p| p.due_at_ms)
    }

    /// Overlay collaborator callback: the gate was passed.
    pub fn on_unlock_succeeded(&self, package: &str, now_ms: u64) -> Result<(), AppError> {
        self.session.set_temporarily_unlocked(package);
        let duration = self.settings.unlock_time_duration()?;
        self.session.record_unlock_success(package, now_ms, duration);
        self.session.set_overlay_showing(false);
        Ok(())
    }

    /// Overlay collaborator callback: dismissed without success.
    pub fn on_overlay_closed(&self) {
        self.session.set_overlay_showing(false);
    }

    /// Device-lock signal: every grace window is invalidated immediately,
    /// without waiting for a follow-up event to observe the lock.
    pub fn on_device_locked(&self) {
        debug!("device locked, wiping unlock grace state");
        self.session.on_device_locked();
    }

    pub fn on_biometric_started(&self) {
        self.session.set_biometric_state(BiometricState::AuthStarted);
    }

    pub fn on_biometric_finished(&self) {
        self.session.set_biometric_state(BiometricState::Idle);
    }

    pub fn on_interrupted(&self) {
        debug!("detector interrupted");
    }

    /// Stream teardown: flip the running flag and hand detection over to a
    /// fallback service so protection continues without us.
    pub fn on_disconnected(&self) -> Result<(), AppError> {
        self.running.store(false, Ordering::SeqCst);
        info!("detector disconnected");

        self.start_fallback_service()?;

        if self.platform.has_privileged_shell() && self.settings.is_anti_uninstall_enabled()? {
            if let Err(e) = self.platform.request_accessibility_reenable() {
                error!("privileged accessibility re-enable failed: {}", e);
            }
        }

        Ok(())
    }

    fn start_primary_backend_service(&self) -> Result<(), AppError> {
        for backend in Backend::SERVICE_BACKENDS {
            if let Err(e) = self.platform.stop_backend_service(backend) {
                error!("failed to stop {:?} service: {}", backend, e);
            }
        }

        let configured = self.settings.backend_implementation()?;
        match configured {
            Backend::Accessibility => {
                debug!("accessibility is the primary detection backend");
            }
            other => {
                debug!("starting {:?} service as primary backend", other);
                if let Err(e) = self.platform.start_backend_service(other) {
                    error!("failed to start {:?} service: {}", other, e);
                }
            }
        }
        Ok(())
    }

    fn start_fallback_service(&self) -> Result<(), AppError> {
        let configured = self.settings.backend_implementation()?;
        let fallback = match configured {
            Backend::Accessibility => Backend::UsageStats,
            other => other,
        };

        if !self.restarts.try_attempt() {
            warn!(
                "not restarting {:?} service, attempt limit reached",
                fallback
            );
            return Ok(());
        }

        info!("starting {:?} service as fallback detector", fallback);
        if let Err(e) = self.platform.start_backend_service(fallback) {
            error!("failed to start {:?} service: {}", fallback, e);
        }
        Ok(())
    }
}
