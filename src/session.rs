use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::bedrock::BedrockPacket;
use crate::connection::{ConnectionReader, ConnectionWriter};
use crate::constants::TICK_MS;
use crate::engine::{GameEngine, StepOutcome};
use crate::error::CodecError;
use crate::event::{Event, EventPayload, EventType, Origin};
use crate::event_bus::EventBus;
use crate::piece::Piece;
use crate::player::Player;
use crate::types::{Command, FieldPayload, GamePayload, ItemKind, ScorePayload};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionSignal {
    GameOver(String),
    Disconnected(String),
    UseItem { source_id: String, item: ItemKind },
}

#[derive(Clone)]
pub struct SessionContext {
    pub bus: EventBus,
    pub bedrock: Option<mpsc::UnboundedSender<BedrockPacket>>,
    pub signals: mpsc::UnboundedSender<SessionSignal>,
    pub field_width: usize,
    pub field_height: usize,
}

#[derive(Default)]
struct SessionTasks {
    shutdown: Option<watch::Sender<bool>>,
    tick: Option<JoinHandle<()>>,
    commands: Option<JoinHandle<()>>,
}

pub struct Session {
    id: String,
    player: Player,
    engine: Mutex<GameEngine>,
    over: AtomicBool,
    writer: ConnectionWriter,
    context: SessionContext,
    tasks: Mutex<SessionTasks>,
}

impl Session {
    pub fn new(
        id: String,
        player: Player,
        writer: ConnectionWriter,
        context: SessionContext,
    ) -> Arc<Self> {
        let engine = GameEngine::new(context.field_width, context.field_height);
        Arc::new(Self {
            id,
            player,
            engine: Mutex::new(engine),
            over: AtomicBool::new(true),
            writer,
            context,
            tasks: Mutex::new(SessionTasks::default()),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn writer(&self) -> &ConnectionWriter {
        &self.writer
    }

    pub fn is_over(&self) -> bool {
        self.over.load(Ordering::Acquire)
    }

    pub fn to_payload(&self) -> GamePayload {
        GamePayload {
            id: self.id.clone(),
            player_name: self.player.name().to_string(),
            over: self.is_over(),
        }
    }

    pub async fn score_payload(&self) -> ScorePayload {
        self.engine.lock().await.score().to_payload()
    }

    pub async fn field_payload(&self) -> FieldPayload {
        self.engine.lock().await.field().to_payload()
    }

    pub async fn attach(self: &Arc<Self>, reader: ConnectionReader) {
        let mut tasks = self.tasks.lock().await;
        if tasks.commands.is_some() {
            return;
        }
        let shutdown = tasks.shutdown.get_or_insert_with(|| watch::channel(false).0);
        let handle = tokio::spawn(run_commands(self.clone(), reader, shutdown.subscribe()));
        tasks.commands = Some(handle);
    }

    pub async fn start(self: &Arc<Self>, seed: i64) {
        let outcome = {
            let mut engine = self.engine.lock().await;
            let outcome = engine.start(seed);
            self.over.store(engine.is_over(), Ordering::Release);
            outcome
        };
        self.publish(EventType::GameStart, EventPayload::Game(self.to_payload()));
        self.apply_outcome(outcome);

        let mut tasks = self.tasks.lock().await;
        // The previous round's loop may still be winding down after a game over.
        if let Some(tick) = tasks.tick.take() {
            tick.abort();
            if let Err(err) = tick.await {
                if !err.is_cancelled() {
                    warn!(session_id = %self.id, error = %err, "tick task failed");
                }
            }
        }
        let shutdown = tasks.shutdown.get_or_insert_with(|| watch::channel(false).0);
        tasks.tick = Some(tokio::spawn(run_ticks(self.clone(), shutdown.subscribe())));
        debug!(session_id = %self.id, seed, "session started");
    }

    pub async fn finish(&self) {
        let mut engine = self.engine.lock().await;
        engine.set_override_piece(None);
        if !engine.is_over() {
            engine.force_over();
        }
        self.over.store(true, Ordering::Release);
    }

    pub async fn stop(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        if let Some(shutdown) = tasks.shutdown {
            let _ = shutdown.send(true);
        }
        for handle in [tasks.tick, tasks.commands].into_iter().flatten() {
            if let Err(err) = handle.await {
                warn!(session_id = %self.id, error = %err, "session task failed");
            }
        }
        self.finish().await;
        debug!(session_id = %self.id, "session stopped");
    }

    pub async fn handle_command(&self, command: Command) {
        if command == Command::UseItem {
            let item = self.engine.lock().await.take_item();
            if let Some(item) = item {
                self.signal(SessionSignal::UseItem {
                    source_id: self.id.clone(),
                    item,
                });
            }
            return;
        }
        let outcome = self.engine.lock().await.command(command);
        self.apply_outcome(outcome);
    }

    pub async fn receive_bedrock(&self, amount: usize) {
        let outcome = self.engine.lock().await.receive_bedrock(amount);
        self.apply_outcome(outcome);
    }

    pub async fn set_field<S: AsRef<str>>(&self, words: &[S]) -> Result<(), CodecError> {
        self.engine.lock().await.load_field(words)
    }

    pub async fn grant_item(&self, item: ItemKind) -> bool {
        self.engine.lock().await.grant_item(item)
    }

    pub async fn shuffle_field(&self) {
        let outcome = self.engine.lock().await.shuffle_field();
        self.apply_outcome(outcome);
    }

    pub async fn set_override_piece(&self, piece: Option<&'static Piece>) {
        self.engine.lock().await.set_override_piece(piece);
    }

    pub async fn set_rotation_locked(&self, locked: bool) {
        self.engine.lock().await.set_rotation_locked(locked);
    }

    async fn tick(&self, dt_ms: i64) -> bool {
        let (outcome, updates, over) = {
            let mut engine = self.engine.lock().await;
            let outcome = engine.step(dt_ms);
            (outcome, engine.drain_updates(), engine.is_over())
        };
        for (event_type, payload) in updates {
            self.publish(event_type, payload);
        }
        self.apply_outcome(outcome);
        !over
    }

    fn apply_outcome(&self, outcome: StepOutcome) {
        if outcome.produced_bedrock > 0 {
            if let Some(bedrock) = &self.context.bedrock {
                let packet = BedrockPacket {
                    source_id: self.id.clone(),
                    amount: outcome.produced_bedrock,
                };
                if bedrock.send(packet).is_err() {
                    debug!(session_id = %self.id, "bedrock queue closed");
                }
            }
        }
        if outcome.game_over {
            self.over.store(true, Ordering::Release);
            info!(session_id = %self.id, player = %self.player.name(), "game over");
            self.publish(EventType::GameOver, EventPayload::Game(self.to_payload()));
            self.signal(SessionSignal::GameOver(self.id.clone()));
        }
    }

    fn publish(&self, event_type: EventType, payload: EventPayload) {
        self.context
            .bus
            .publish(Event::new(event_type, Origin::game(&self.id), payload));
    }

    fn signal(&self, signal: SessionSignal) {
        if self.context.signals.send(signal).is_err() {
            debug!(session_id = %self.id, "room no longer listening");
        }
    }
}

async fn run_ticks(session: Arc<Session>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(TICK_MS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = Instant::now();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        let now = Instant::now();
        let dt_ms = now.duration_since(last).as_millis() as i64;
        last = now;
        if !session.tick(dt_ms).await {
            break;
        }
    }
}

async fn run_commands(
    session: Arc<Session>,
    mut reader: ConnectionReader,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            received = reader.read() => match received {
                Some(raw) => match Command::parse(&raw) {
                    Some(command) => session.handle_command(command).await,
                    None => debug!(session_id = %session.id, raw = %raw, "ignoring unknown command"),
                },
                None => {
                    session.signal(SessionSignal::Disconnected(session.id.clone()));
                    break;
                }
            },
        }
    }
}
