use crate::overlay::messages::{HostToOverlay, OverlayIntent, OverlayToHost};
use crate::overlay::window::{spawn_overlay, OverlayWorkerHandles};
use crate::overlay::OverlayError;
use once_cell::sync::Lazy;
use std::sync::mpsc::{RecvTimeoutError, TryRecvError};
use std::sync::Mutex;
use std::thread::JoinHandle;
use std::time::Duration;

const WINDOW_READY_TIMEOUT: Duration = Duration::from_secs(2);
const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// A new overlay window was created for this request.
    Created,
    /// An overlay was already on screen; its content was replaced in place.
    Updated,
}

struct OverlaySession {
    target_id: String,
    worker_thread: Option<JoinHandle<()>>,
    host_to_overlay_tx: std::sync::mpsc::Sender<HostToOverlay>,
    overlay_to_host_rx: std::sync::mpsc::Receiver<OverlayToHost>,
}

#[derive(Default)]
struct ManagerState {
    session: Option<OverlaySession>,
    /// Reserved while a `present` call is between spawning the worker and
    /// installing the session, so overlapping calls cannot each create a
    /// window of their own.
    creating: bool,
}

/// Owns the single overlay window of the process. All host-side interaction
/// with the overlay goes through here; the invariant "at most one session" is
/// enforced by the locked state, not by call discipline.
pub struct OverlayManager {
    state: Mutex<ManagerState>,
}

static OVERLAY_RUNTIME: Lazy<OverlayManager> = Lazy::new(|| OverlayManager {
    state: Mutex::new(ManagerState::default()),
});

pub fn runtime() -> &'static OverlayManager {
    &OVERLAY_RUNTIME
}

type SpawnHook = Box<dyn Fn(&str, &str) -> Result<OverlayWorkerHandles, OverlayError> + Send + Sync>;
type LaunchHook = Box<dyn Fn(&str) -> anyhow::Result<()> + Send + Sync>;

static SPAWN_HOOK: Lazy<Mutex<Option<SpawnHook>>> = Lazy::new(|| Mutex::new(None));
static LAUNCH_HOOK: Lazy<Mutex<Option<LaunchHook>>> = Lazy::new(|| Mutex::new(None));

/// Replace the real overlay worker with a scripted one. Test seam.
pub fn set_overlay_spawn_hook(hook: Option<SpawnHook>) {
    if let Ok(mut guard) = SPAWN_HOOK.lock() {
        *guard = hook;
    }
}

/// Replace the real app launcher. Test seam.
pub fn set_launch_hook(hook: Option<LaunchHook>) {
    if let Ok(mut guard) = LAUNCH_HOOK.lock() {
        *guard = hook;
    }
}

impl OverlayManager {
    /// Show the overlay for `target_id` with the given warning list. If an
    /// overlay is already visible its content is replaced over the message
    /// channel and the window is reused; otherwise a worker thread is spawned
    /// and the call waits for the window-creation handshake so that a refusal
    /// surfaces here as a recoverable error.
    pub fn present(
        &self,
        target_id: &str,
        warnings: &[String],
    ) -> Result<PresentOutcome, OverlayError> {
        let warnings_json =
            serde_json::to_string(warnings).unwrap_or_else(|_| "[]".to_string());

        {
            let mut state = self.lock_state();
            if let Some(session) = state.session.as_mut() {
                let update = HostToOverlay::UpdateContent {
                    target_id: target_id.to_string(),
                    warnings_json: warnings_json.clone(),
                };
                if session.host_to_overlay_tx.send(update).is_ok() {
                    session.target_id = target_id.to_string();
                    tracing::info!(%target_id, "overlay content updated in place");
                    return Ok(PresentOutcome::Updated);
                }
                // Worker is gone; reap it and fall through to a fresh window,
                // keeping the slot reserved across the unlocked stretch.
                tracing::warn!("overlay worker unreachable, recreating window");
                let stale = state.session.take();
                state.creating = true;
                drop(state);
                Self::reap_session(stale);
            } else if state.creating {
                return Err(OverlayError::Busy);
            } else {
                state.creating = true;
            }
        }

        // The slot is reserved; spawn and handshake happen without the lock,
        // then the reservation is resolved in one place below.
        let created = self.create_session(target_id, &warnings_json);

        let mut state = self.lock_state();
        state.creating = false;
        let session = created?;
        state.session = Some(session);
        tracing::info!(%target_id, "overlay window created");
        Ok(PresentOutcome::Created)
    }

    fn create_session(
        &self,
        target_id: &str,
        warnings_json: &str,
    ) -> Result<OverlaySession, OverlayError> {
        let handles = self.spawn_worker(target_id, warnings_json)?;

        match handles.overlay_to_host_rx.recv_timeout(WINDOW_READY_TIMEOUT) {
            Ok(OverlayToHost::WindowReady) => {}
            Ok(OverlayToHost::WindowFailed { error }) => {
                Self::join_worker_with_timeout(handles.worker_thread);
                return Err(error);
            }
            Ok(other) => {
                return Err(OverlayError::Startup(format!(
                    "unexpected handshake message: {other:?}"
                )))
            }
            Err(RecvTimeoutError::Timeout) => {
                return Err(OverlayError::Startup(
                    "timed out waiting for overlay window".to_string(),
                ))
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(OverlayError::Startup(
                    "overlay worker exited before the window came up".to_string(),
                ))
            }
        }

        let _ = handles.host_to_overlay_tx.send(HostToOverlay::Show);

        Ok(OverlaySession {
            target_id: target_id.to_string(),
            worker_thread: Some(handles.worker_thread),
            host_to_overlay_tx: handles.host_to_overlay_tx,
            overlay_to_host_rx: handles.overlay_to_host_rx,
        })
    }

    /// Tear the overlay down. Safe to call at any time; when no window exists
    /// this is a no-op, and teardown failures are logged and swallowed since
    /// the end state (no window) holds either way.
    pub fn dismiss(&self) {
        let session = {
            let mut state = self.lock_state();
            state.session.take()
        };
        if session.is_some() {
            tracing::info!("overlay dismissed");
        }
        Self::reap_session(session);
    }

    /// The allow path: try to launch the target, then dismiss. A target that
    /// cannot be resolved or started is skipped, never fatal; the user must
    /// not be left stuck behind the overlay.
    pub fn on_allow(&self, target_id: &str) {
        let result = {
            let hook = LAUNCH_HOOK.lock().ok();
            match hook.as_ref().and_then(|g| g.as_ref()) {
                Some(launch) => launch(target_id),
                None => crate::launch::launch_target(target_id),
            }
        };
        match result {
            Ok(()) => tracing::info!(%target_id, "target launched"),
            Err(err) => tracing::warn!(%target_id, %err, "target launch skipped"),
        }
        self.dismiss();
    }

    pub fn on_close(&self) {
        self.dismiss();
    }

    /// Drain pending overlay intents and act on them. Called from the host
    /// UI loop every frame; never blocks.
    pub fn pump_events(&self) {
        let mut intents = Vec::new();
        let mut worker_gone = false;
        {
            let state = self.lock_state();
            let Some(session) = state.session.as_ref() else {
                return;
            };
            loop {
                match session.overlay_to_host_rx.try_recv() {
                    Ok(msg) => intents.push(msg),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        worker_gone = true;
                        break;
                    }
                }
            }
        }

        for msg in intents {
            match msg {
                OverlayToHost::Intent(OverlayIntent::Allow { target_id }) => {
                    self.on_allow(&target_id)
                }
                OverlayToHost::Intent(OverlayIntent::Close) => self.on_close(),
                OverlayToHost::WindowFailed { error } => {
                    tracing::warn!(%error, "overlay window failed while visible");
                    self.dismiss();
                }
                OverlayToHost::WindowReady => {}
            }
        }

        if worker_gone {
            tracing::warn!("overlay worker disconnected, cleaning up session");
            self.dismiss();
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock_state().session.is_some()
    }

    pub fn active_target(&self) -> Option<String> {
        self.lock_state()
            .session
            .as_ref()
            .map(|s| s.target_id.clone())
    }

    fn spawn_worker(
        &self,
        target_id: &str,
        warnings_json: &str,
    ) -> Result<OverlayWorkerHandles, OverlayError> {
        let hook = SPAWN_HOOK.lock().ok();
        match hook.as_ref().and_then(|g| g.as_ref()) {
            Some(spawn) => spawn(target_id, warnings_json),
            None => spawn_overlay(target_id.to_string(), warnings_json.to_string()),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ManagerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn reap_session(session: Option<OverlaySession>) {
        let Some(mut session) = session else {
            return;
        };
        let _ = session.host_to_overlay_tx.send(HostToOverlay::Dismiss);
        if let Some(handle) = session.worker_thread.take() {
            Self::join_worker_with_timeout(handle);
        }
    }

    /// Join the worker from a side thread with a bounded wait. `dismiss` runs
    /// on the host UI thread, so a worker that never exits may cost at most
    /// `WORKER_JOIN_TIMEOUT`; past that it is logged and detached.
    fn join_worker_with_timeout(handle: JoinHandle<()>) {
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let waiter = std::thread::Builder::new()
            .name("overlay-join".to_string())
            .spawn(move || {
                let _ = done_tx.send(handle.join().is_err());
            });
        if waiter.is_err() {
            tracing::warn!("could not spawn overlay join thread");
            return;
        }
        match done_rx.recv_timeout(WORKER_JOIN_TIMEOUT) {
            Ok(true) => tracing::warn!("overlay worker panicked during teardown"),
            Ok(false) => {}
            Err(_) => tracing::warn!("overlay worker did not exit in time, detaching it"),
        }
    }
}
