//! In-memory transport and notifier doubles shared by unit tests.
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};

use crate::bus::{AppEvent, EventBus};
use crate::console::{Console, ConsoleKind};
use crate::controller::{ControllerContext, PresenceController};
use crate::dialog::{Dialog, Notifier};
use crate::event::DaemonEvent;
use crate::presence::Presence;
use crate::transport::{ErrorObserver, PresenceTransport, TransportFactory};

#[derive(Default)]
pub struct Record {
    pub connects: Vec<String>,
    pub updates: Vec<Presence>,
    pub disconnects: usize,
}

#[derive(Default)]
pub struct FakeTransports {
    pub record: Arc<Mutex<Record>>,
    pub observers: Mutex<Vec<ErrorObserver>>,
}

struct FakeTransport {
    record: Arc<Mutex<Record>>,
}

impl PresenceTransport for FakeTransport {
    fn update_presence(&mut self, presence: &Presence) {
        self.record.lock().unwrap().updates.push(presence.clone());
    }

    fn disconnect(&mut self) {
        self.record.lock().unwrap().disconnects += 1;
    }
}

impl TransportFactory for FakeTransports {
    fn connect(&self, app_id: &str, on_error: ErrorObserver) -> Box<dyn PresenceTransport> {
        self.record.lock().unwrap().connects.push(app_id.to_string());
        self.observers.lock().unwrap().push(on_error);
        Box::new(FakeTransport {
            record: Arc::clone(&self.record),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub shown: Mutex<Vec<Dialog>>,
}

impl Notifier for RecordingNotifier {
    fn show(&self, dialog: Dialog) {
        self.shown.lock().unwrap().push(dialog);
    }
}

/// A controller context wired to the doubles above, plus handles to inspect them.
pub struct Harness {
    pub ctx: ControllerContext,
    pub transports: Arc<FakeTransports>,
    pub notifier: Arc<RecordingNotifier>,
    pub bus_rx: broadcast::Receiver<AppEvent>,
    pub events_rx: mpsc::UnboundedReceiver<DaemonEvent>,
}

impl Harness {
    pub fn new() -> Self {
        let transports = Arc::new(FakeTransports::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let bus = Arc::new(EventBus::new(16));
        let bus_rx = bus.subscribe();
        let (events, events_rx) = mpsc::unbounded_channel();
        let ctx = ControllerContext {
            transports: transports.clone(),
            notifier: notifier.clone(),
            bus,
            events,
            verbose: true,
            alert_user: true,
            log_dir: PathBuf::from("/tmp/psdiscord/logs"),
            version: "0.1.0".to_string(),
        };
        Self {
            ctx,
            transports,
            notifier,
            bus_rx,
            events_rx,
        }
    }

    pub fn start(&self, kind: ConsoleKind) -> PresenceController {
        PresenceController::start(Console::new(kind), self.ctx.clone())
    }

    pub fn connects(&self) -> Vec<String> {
        self.transports.record.lock().unwrap().connects.clone()
    }

    pub fn updates(&self) -> Vec<Presence> {
        self.transports.record.lock().unwrap().updates.clone()
    }

    pub fn last_update(&self) -> Presence {
        self.updates().last().cloned().expect("no update sent")
    }

    pub fn disconnects(&self) -> usize {
        self.transports.record.lock().unwrap().disconnects
    }

    pub fn dialogs(&self) -> Vec<Dialog> {
        self.notifier.shown.lock().unwrap().clone()
    }

    /// Drains everything published on the bus so far.
    pub fn bus_events(&mut self) -> Vec<AppEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.bus_rx.try_recv() {
            out.push(event);
        }
        out
    }
}
