use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::connection::ConnectionWriter;
use crate::event::Event;
use crate::locks;
use crate::sequence::IdSequence;

pub type SubscriptionId = u64;

type Subscribers = Arc<RwLock<HashMap<SubscriptionId, ConnectionWriter>>>;

struct BusWorker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

#[derive(Clone)]
pub struct EventBus {
    sender: mpsc::UnboundedSender<Event>,
    subscribers: Subscribers,
    ids: Arc<IdSequence>,
    worker: Arc<Mutex<Option<BusWorker>>>,
}

impl EventBus {
    pub fn start(window: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let subscribers: Subscribers = Arc::default();
        let handle = tokio::spawn(run_windows(
            receiver,
            shutdown_rx,
            subscribers.clone(),
            window,
        ));

        Self {
            sender,
            subscribers,
            ids: Arc::new(IdSequence::new("subscription")),
            worker: Arc::new(Mutex::new(Some(BusWorker { shutdown, handle }))),
        }
    }

    pub fn publish(&self, event: Event) {
        if self.sender.send(event).is_err() {
            debug!("event bus stopped, event dropped");
        }
    }

    pub fn subscribe(&self, writer: ConnectionWriter) -> SubscriptionId {
        let id = self.ids.next_raw();
        locks::write(&self.subscribers).insert(id, writer);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        locks::write(&self.subscribers).remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        locks::read(&self.subscribers).len()
    }

    pub async fn stop(&self) {
        let Some(worker) = self.worker.lock().await.take() else {
            return;
        };
        let _ = worker.shutdown.send(true);
        if let Err(err) = worker.handle.await {
            warn!(error = %err, "event bus task failed");
        }
    }
}

async fn run_windows(
    mut receiver: mpsc::UnboundedReceiver<Event>,
    mut shutdown: watch::Receiver<bool>,
    subscribers: Subscribers,
    window: Duration,
) {
    let mut pending = Vec::new();
    let mut ticker = tokio::time::interval(window);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.reset();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            received = receiver.recv() => match received {
                Some(event) => pending.push(event),
                None => break,
            },
            _ = ticker.tick() => {
                if !pending.is_empty() {
                    flush(&subscribers, std::mem::take(&mut pending));
                }
            }
        }
    }

    receiver.close();
    while let Ok(event) = receiver.try_recv() {
        pending.push(event);
    }
    if !pending.is_empty() {
        flush(&subscribers, pending);
    }
}

fn flush(subscribers: &Subscribers, events: Vec<Event>) {
    let serialized: Vec<String> = events
        .iter()
        .filter_map(|event| match event.to_json() {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(error = %err, event_type = ?event.event_type, "dropping unserializable event");
                None
            }
        })
        .collect();
    if serialized.is_empty() {
        return;
    }
    let window = format!("[{}]", serialized.join(","));

    for writer in locks::read(subscribers).values() {
        writer.write(window.clone());
    }
}
