use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serial_test::serial;
use warning_gate::overlay::messages::{HostToOverlay, OverlayIntent, OverlayToHost};
use warning_gate::overlay::window::OverlayWorkerHandles;
use warning_gate::overlay::{
    runtime, set_launch_hook, set_overlay_spawn_hook, OverlayError, PresentOutcome,
};

/// Scripted overlay worker installed through the spawn hook: acknowledges the
/// window handshake, records every message from the manager, and exposes a
/// sender the test can use to inject user intents.
struct FakeOverlay {
    sent: Arc<Mutex<Vec<HostToOverlay>>>,
    intent_tx: Arc<Mutex<Option<Sender<OverlayToHost>>>>,
    spawn_count: Arc<AtomicUsize>,
}

impl FakeOverlay {
    fn install() -> Self {
        Self::install_with_latency(Duration::ZERO)
    }

    /// Like `install`, but window creation takes `creation_latency` before the
    /// handshake completes.
    fn install_with_latency(creation_latency: Duration) -> Self {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let intent_tx = Arc::new(Mutex::new(None::<Sender<OverlayToHost>>));
        let spawn_count = Arc::new(AtomicUsize::new(0));

        let sent_hook = sent.clone();
        let intent_hook = intent_tx.clone();
        let count_hook = spawn_count.clone();
        set_overlay_spawn_hook(Some(Box::new(move |_target, _warnings| {
            count_hook.fetch_add(1, Ordering::SeqCst);
            if !creation_latency.is_zero() {
                thread::sleep(creation_latency);
            }
            let (host_tx, host_rx) = channel::<HostToOverlay>();
            let (overlay_tx, overlay_rx) = channel::<OverlayToHost>();
            overlay_tx
                .send(OverlayToHost::WindowReady)
                .expect("handshake send");
            *intent_hook.lock().unwrap() = Some(overlay_tx);

            let sent_worker = sent_hook.clone();
            let worker_thread = thread::spawn(move || {
                while let Ok(msg) = host_rx.recv() {
                    let dismissed = msg == HostToOverlay::Dismiss;
                    sent_worker.lock().unwrap().push(msg);
                    if dismissed {
                        break;
                    }
                }
            });

            Ok(OverlayWorkerHandles {
                worker_thread,
                host_to_overlay_tx: host_tx,
                overlay_to_host_rx: overlay_rx,
            })
        })));

        Self {
            sent,
            intent_tx,
            spawn_count,
        }
    }

    fn send_intent(&self, intent: OverlayIntent) {
        let guard = self.intent_tx.lock().unwrap();
        guard
            .as_ref()
            .expect("overlay not spawned")
            .send(OverlayToHost::Intent(intent))
            .expect("intent send");
    }

    fn messages(&self) -> Vec<HostToOverlay> {
        self.sent.lock().unwrap().clone()
    }

    fn spawns(&self) -> usize {
        self.spawn_count.load(Ordering::SeqCst)
    }
}

fn reset_runtime() {
    set_overlay_spawn_hook(None);
    set_launch_hook(None);
    runtime().dismiss();
}

#[test]
#[serial]
fn second_present_updates_in_place_instead_of_creating() {
    reset_runtime();
    let fake = FakeOverlay::install();

    let first = runtime()
        .present("com.example.video", &["Warning A".into(), "Warning B".into()])
        .unwrap();
    assert_eq!(first, PresentOutcome::Created);
    assert_eq!(runtime().active_target(), Some("com.example.video".into()));

    let second = runtime()
        .present("com.example.other", &["different".into()])
        .unwrap();
    assert_eq!(second, PresentOutcome::Updated);
    assert_eq!(fake.spawns(), 1, "no second window may be created");
    assert_eq!(runtime().active_target(), Some("com.example.other".into()));

    runtime().dismiss();
    let messages = fake.messages();
    assert_eq!(
        messages,
        vec![
            HostToOverlay::Show,
            HostToOverlay::UpdateContent {
                target_id: "com.example.other".into(),
                warnings_json: "[\"different\"]".into(),
            },
            HostToOverlay::Dismiss,
        ]
    );
    reset_runtime();
}

#[test]
#[serial]
fn overlapping_present_calls_share_one_window() {
    reset_runtime();
    let fake = FakeOverlay::install_with_latency(Duration::from_millis(200));

    // Second call lands while the first is still mid window creation.
    let racer = thread::spawn(|| runtime().present("com.example.video", &["w".into()]));
    thread::sleep(Duration::from_millis(50));
    let second = runtime().present("com.example.other", &["w".into()]);
    let first = racer.join().unwrap();

    assert_eq!(first.unwrap(), PresentOutcome::Created);
    assert_eq!(second.unwrap_err(), OverlayError::Busy);
    assert_eq!(fake.spawns(), 1, "at most one overlay window may exist");
    assert_eq!(runtime().active_target(), Some("com.example.video".into()));
    reset_runtime();
}

#[test]
#[serial]
fn dismiss_returns_even_when_the_worker_ignores_it() {
    reset_runtime();
    set_overlay_spawn_hook(Some(Box::new(|_, _| {
        let (host_tx, host_rx) = channel::<HostToOverlay>();
        let (overlay_tx, overlay_rx) = channel::<OverlayToHost>();
        overlay_tx
            .send(OverlayToHost::WindowReady)
            .expect("handshake send");
        let worker_thread = thread::spawn(move || {
            // Swallows every message, including the dismissal, then lingers.
            let _keep_alive = overlay_tx;
            while host_rx.recv().is_ok() {}
            thread::sleep(Duration::from_secs(30));
        });
        Ok(OverlayWorkerHandles {
            worker_thread,
            host_to_overlay_tx: host_tx,
            overlay_to_host_rx: overlay_rx,
        })
    })));

    runtime().present("com.example.video", &["w".into()]).unwrap();
    let started = Instant::now();
    runtime().dismiss();
    assert!(!runtime().is_active());
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "dismiss must not hang on a stuck worker"
    );
    reset_runtime();
}

#[test]
#[serial]
fn dismiss_is_idempotent() {
    reset_runtime();
    let _fake = FakeOverlay::install();

    runtime().present("com.example.video", &["w".into()]).unwrap();
    assert!(runtime().is_active());

    runtime().dismiss();
    assert!(!runtime().is_active());

    // Second dismissal with no window is a no-op, never an error.
    runtime().dismiss();
    assert!(!runtime().is_active());
    reset_runtime();
}

#[test]
#[serial]
fn allow_intent_launches_then_dismisses() {
    reset_runtime();
    let fake = FakeOverlay::install();
    let launched = Arc::new(Mutex::new(Vec::<String>::new()));
    let launched_hook = launched.clone();
    set_launch_hook(Some(Box::new(move |target| {
        launched_hook.lock().unwrap().push(target.to_string());
        Ok(())
    })));

    runtime().present("com.example.video", &["w".into()]).unwrap();
    fake.send_intent(OverlayIntent::Allow {
        target_id: "com.example.video".into(),
    });
    runtime().pump_events();

    assert_eq!(launched.lock().unwrap().as_slice(), ["com.example.video"]);
    assert!(!runtime().is_active(), "overlay must be torn down after allow");
    reset_runtime();
}

#[test]
#[serial]
fn failed_launch_is_skipped_and_overlay_still_dismisses() {
    reset_runtime();
    let fake = FakeOverlay::install();
    set_launch_hook(Some(Box::new(|_| Err(anyhow::anyhow!("not installed")))));

    runtime().present("com.example.gone", &["w".into()]).unwrap();
    fake.send_intent(OverlayIntent::Allow {
        target_id: "com.example.gone".into(),
    });
    runtime().pump_events();

    assert!(!runtime().is_active(), "user must never be stuck behind the overlay");
    reset_runtime();
}

#[test]
#[serial]
fn close_intent_dismisses_without_launching() {
    reset_runtime();
    let fake = FakeOverlay::install();
    let launched = Arc::new(AtomicUsize::new(0));
    let launched_hook = launched.clone();
    set_launch_hook(Some(Box::new(move |_| {
        launched_hook.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })));

    runtime().present("com.example.video", &["w".into()]).unwrap();
    fake.send_intent(OverlayIntent::Close);
    runtime().pump_events();

    assert_eq!(launched.load(Ordering::SeqCst), 0);
    assert!(!runtime().is_active());
    reset_runtime();
}

#[test]
#[serial]
fn window_refusal_surfaces_as_recoverable_error() {
    reset_runtime();
    set_overlay_spawn_hook(Some(Box::new(|_, _| {
        let (host_tx, _host_rx) = channel::<HostToOverlay>();
        let (overlay_tx, overlay_rx) = channel::<OverlayToHost>();
        let worker_thread = thread::spawn(move || {
            let _ = overlay_tx.send(OverlayToHost::WindowFailed {
                error: OverlayError::NotPermitted,
            });
        });
        Ok(OverlayWorkerHandles {
            worker_thread,
            host_to_overlay_tx: host_tx,
            overlay_to_host_rx: overlay_rx,
        })
    })));

    let err = runtime()
        .present("com.example.video", &["w".into()])
        .unwrap_err();
    assert_eq!(err, OverlayError::NotPermitted);
    assert!(!runtime().is_active());

    reset_runtime();
}

#[cfg(not(windows))]
#[test]
#[serial]
fn real_worker_round_trip_on_stub_window() {
    reset_runtime();

    let outcome = runtime()
        .present("com.example.video", &["Warning A".into()])
        .unwrap();
    assert_eq!(outcome, PresentOutcome::Created);
    assert!(runtime().is_active());

    let outcome = runtime()
        .present("com.example.video", &["Warning B".into()])
        .unwrap();
    assert_eq!(outcome, PresentOutcome::Updated);

    // Give the worker a couple of ticks before tearing it down.
    thread::sleep(Duration::from_millis(50));
    runtime().dismiss();
    assert!(!runtime().is_active());
}
