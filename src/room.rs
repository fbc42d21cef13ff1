use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::bedrock::{bedrock_queue, run_distribution};
use crate::connection::{Connection, ConnectionReader, ConnectionWriter};
use crate::constants::{
    EVENT_WINDOW_MS, FIELD_HEIGHT, FIELD_WIDTH, HANDSHAKE_MAX_ATTEMPTS, HANDSHAKE_TIMEOUT_MS,
    ITEMS_INTERVAL_MS, ITEM_EFFECT_MS, TARGETS_INTERVAL_MS,
};
use crate::directory::SessionDirectory;
use crate::error::{HandshakeError, RoomError};
use crate::event::{Event, EventPayload, EventType, Origin};
use crate::event_bus::{EventBus, SubscriptionId};
use crate::items::{run_grants, ItemDistribution, ItemEffects};
use crate::locks;
use crate::player::Player;
use crate::rng::Rng;
use crate::sequence::IdSequence;
use crate::server_protocol::parse_hello_response;
use crate::session::{Session, SessionContext, SessionSignal};
use crate::targets::{refresh_targets, run_randomizer, TargetsDistribution};
use crate::types::{
    HelloAckPayload, ItemKind, PlayerScorePayload, RoomPayload, RoomScoresPayload,
};

#[derive(Clone, Debug)]
pub struct RoomSettings {
    pub field_width: usize,
    pub field_height: usize,
    pub bedrock_enabled: bool,
    pub items_enabled: bool,
    pub event_window: Duration,
    pub targets_interval: Duration,
    pub items_interval: Duration,
    pub item_effect: Duration,
    pub handshake_attempts: usize,
    pub handshake_timeout: Duration,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            field_width: FIELD_WIDTH,
            field_height: FIELD_HEIGHT,
            bedrock_enabled: true,
            items_enabled: true,
            event_window: Duration::from_millis(EVENT_WINDOW_MS),
            targets_interval: Duration::from_millis(TARGETS_INTERVAL_MS),
            items_interval: Duration::from_millis(ITEMS_INTERVAL_MS),
            item_effect: Duration::from_millis(ITEM_EFFECT_MS),
            handshake_attempts: HANDSHAKE_MAX_ATTEMPTS,
            handshake_timeout: Duration::from_millis(HANDSHAKE_TIMEOUT_MS),
        }
    }
}

#[derive(Default)]
pub struct RoomGames {
    sessions: RwLock<Vec<Arc<Session>>>,
}

impl RoomGames {
    fn insert(&self, session: Arc<Session>) {
        locks::write(&self.sessions).push(session);
    }

    fn remove(&self, id: &str) -> Option<Arc<Session>> {
        let mut sessions = locks::write(&self.sessions);
        let index = sessions.iter().position(|session| session.id() == id)?;
        Some(sessions.remove(index))
    }

    fn take_all(&self) -> Vec<Arc<Session>> {
        std::mem::take(&mut *locks::write(&self.sessions))
    }

    pub fn all(&self) -> Vec<Arc<Session>> {
        locks::read(&self.sessions).clone()
    }

    pub fn len(&self) -> usize {
        locks::read(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn first_id(&self) -> Option<String> {
        locks::read(&self.sessions)
            .first()
            .map(|session| session.id().to_string())
    }
}

impl SessionDirectory for RoomGames {
    fn live_session_ids(&self) -> Vec<String> {
        self.all()
            .iter()
            .filter(|session| !session.is_over())
            .map(|session| session.id().to_string())
            .collect()
    }

    fn session(&self, id: &str) -> Option<Arc<Session>> {
        self.all().into_iter().find(|session| session.id() == id)
    }
}

#[derive(Default)]
struct Round {
    running: bool,
    players: usize,
}

pub struct Room {
    id: String,
    settings: RoomSettings,
    games: Arc<RoomGames>,
    bus: EventBus,
    targets: Arc<TargetsDistribution>,
    context: SessionContext,
    session_ids: IdSequence,
    subscriptions: Mutex<HashMap<String, SubscriptionId>>,
    host_id: RwLock<Option<String>>,
    seeds: Mutex<Rng>,
    round: tokio::sync::Mutex<Round>,
    closed: AtomicBool,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    item_effects: ItemEffects,
    effects: tokio::sync::Mutex<JoinSet<()>>,
}

impl Room {
    pub fn new(id: String, settings: RoomSettings, seed: i64) -> Arc<Self> {
        let mut seeds = Rng::from_seed(seed);
        let targets = Arc::new(TargetsDistribution::new(seeds.next_i64()));
        let items = Arc::new(ItemDistribution::new(seeds.next_i64()));
        let games = Arc::new(RoomGames::default());
        let bus = EventBus::start(settings.event_window);
        let (shutdown, _) = watch::channel(false);
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let (bedrock_tx, bedrock_rx) = bedrock_queue();

        let context = SessionContext {
            bus: bus.clone(),
            bedrock: settings.bedrock_enabled.then_some(bedrock_tx),
            signals: signals_tx,
            field_width: settings.field_width,
            field_height: settings.field_height,
        };
        let item_effects = ItemEffects {
            bus: bus.clone(),
            duration: settings.item_effect,
            shutdown: shutdown.subscribe(),
        };

        let room = Arc::new(Self {
            id,
            settings,
            games,
            bus,
            targets,
            context,
            session_ids: IdSequence::new("game"),
            subscriptions: Mutex::new(HashMap::new()),
            host_id: RwLock::new(None),
            seeds: Mutex::new(seeds),
            round: tokio::sync::Mutex::new(Round::default()),
            closed: AtomicBool::new(false),
            shutdown,
            tasks: Mutex::new(Vec::new()),
            item_effects,
            effects: tokio::sync::Mutex::new(JoinSet::new()),
        });

        let directory: Arc<dyn SessionDirectory> = room.games.clone();
        let mut tasks = Vec::new();
        if room.settings.bedrock_enabled {
            tasks.push(tokio::spawn(run_distribution(
                bedrock_rx,
                room.targets.clone(),
                directory.clone(),
                room.shutdown.subscribe(),
            )));
        }
        tasks.push(tokio::spawn(run_randomizer(
            room.targets.clone(),
            directory.clone(),
            room.bus.clone(),
            room.id.clone(),
            room.settings.targets_interval,
            room.shutdown.subscribe(),
        )));
        if room.settings.items_enabled {
            tasks.push(tokio::spawn(run_grants(
                items,
                directory,
                room.settings.items_interval,
                room.shutdown.subscribe(),
            )));
        }
        tasks.push(tokio::spawn(run_signals(
            Arc::downgrade(&room),
            signals_rx,
            room.shutdown.subscribe(),
        )));
        *locks::lock(&room.tasks) = tasks;

        info!(room_id = %room.id, seed, "room created");
        room
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn host_id(&self) -> Option<String> {
        locks::read(&self.host_id).clone()
    }

    pub fn session(&self, id: &str) -> Option<Arc<Session>> {
        self.games.session(id)
    }

    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.games.all()
    }

    pub fn to_payload(&self) -> RoomPayload {
        RoomPayload {
            id: self.id.clone(),
            games: self.games.all().iter().map(|s| s.to_payload()).collect(),
            host_id: self.host_id(),
        }
    }

    pub async fn join(&self, connection: Connection) -> Result<Arc<Session>, RoomError> {
        if self.is_closed() {
            return Err(RoomError::ShuttingDown);
        }
        let Connection { mut reader, writer } = connection;

        write_event(
            &writer,
            Event::new(EventType::Hello, Origin::room(&self.id), EventPayload::Empty),
        );
        let name = match self.handshake(&mut reader).await {
            Ok(name) => name,
            Err(err) => {
                debug!(room_id = %self.id, error = %err, "handshake failed");
                return Err(err.into());
            }
        };
        if self.is_closed() {
            return Err(RoomError::ShuttingDown);
        }

        let id = self.session_ids.next_id();
        let session = Session::new(
            id.clone(),
            Player::new(&name),
            writer.clone(),
            self.context.clone(),
        );
        let host = {
            let mut host_id = locks::write(&self.host_id);
            if host_id.is_none() {
                *host_id = Some(id.clone());
            }
            host_id.as_deref() == Some(id.as_str())
        };
        self.games.insert(session.clone());

        write_event(
            &writer,
            Event::new(
                EventType::HelloAck,
                Origin::room(&self.id),
                EventPayload::HelloAck(HelloAckPayload {
                    room: self.to_payload(),
                    controlled_game: session.to_payload(),
                    host,
                }),
            ),
        );
        let subscription = self.bus.subscribe(writer);
        locks::lock(&self.subscriptions).insert(id.clone(), subscription);
        session.attach(reader).await;

        self.publish(EventType::RoomJoin, EventPayload::Game(session.to_payload()));
        self.refresh_targets();
        info!(room_id = %self.id, session_id = %id, player = %session.player().name(), host, "player joined");
        Ok(session)
    }

    async fn handshake(&self, reader: &mut ConnectionReader) -> Result<String, HandshakeError> {
        let attempts = self.settings.handshake_attempts.max(1);
        for attempt in 1..=attempts {
            let raw = match timeout(self.settings.handshake_timeout, reader.read()).await {
                Err(_) => return Err(HandshakeError::Timeout),
                Ok(None) => return Err(HandshakeError::Closed),
                Ok(Some(raw)) => raw,
            };
            if let Some(name) = parse_hello_response(&raw) {
                return Ok(name);
            }
            debug!(room_id = %self.id, attempt, "invalid hello response");
        }
        Err(HandshakeError::ProtocolViolation { attempts })
    }

    pub async fn leave(&self, session_id: &str) -> bool {
        let Some(session) = self.games.remove(session_id) else {
            return false;
        };
        let subscription = locks::lock(&self.subscriptions).remove(session_id);
        if let Some(subscription) = subscription {
            self.bus.unsubscribe(subscription);
        }
        session.stop().await;

        {
            let mut host_id = locks::write(&self.host_id);
            if host_id.as_deref() == Some(session_id) {
                *host_id = self.games.first_id();
            }
        }

        self.publish(EventType::RoomLeave, EventPayload::Game(session.to_payload()));
        self.refresh_targets();
        info!(room_id = %self.id, session_id, remaining = self.games.len(), "player left");
        self.check_round_end().await;
        true
    }

    pub async fn start(&self) -> Result<(), RoomError> {
        if self.is_closed() {
            return Err(RoomError::ShuttingDown);
        }
        let mut round = self.round.lock().await;
        let sessions = self.games.all();
        round.running = true;
        round.players = sessions.len();

        self.publish(EventType::RoomStart, EventPayload::Room(self.to_payload()));
        for session in &sessions {
            let seed = locks::lock(&self.seeds).next_i64();
            session.start(seed).await;
        }
        drop(round);

        self.refresh_targets();
        info!(room_id = %self.id, players = sessions.len(), "round started");
        Ok(())
    }

    async fn check_round_end(&self) -> bool {
        let mut round = self.round.lock().await;
        if !round.running {
            return false;
        }
        let live = self.games.live_session_ids().len();
        let ended = if round.players > 1 { live <= 1 } else { live == 0 };
        if !ended {
            return false;
        }
        round.running = false;
        drop(round);

        for session in self.games.all() {
            session.finish().await;
        }
        let scores = self.publish_scores().await;
        info!(room_id = %self.id, players = scores.scores.len(), "round ended");
        true
    }

    pub async fn scores(&self) -> RoomScoresPayload {
        let mut scores = Vec::new();
        for session in self.games.all() {
            scores.push(PlayerScorePayload {
                game: session.to_payload(),
                score: session.score_payload().await,
            });
        }
        sort_scores(&mut scores);
        RoomScoresPayload { scores }
    }

    pub async fn publish_scores(&self) -> RoomScoresPayload {
        let scores = self.scores().await;
        self.publish(EventType::RoomScores, EventPayload::RoomScores(scores.clone()));
        scores
    }

    pub async fn set_field<S: AsRef<str>>(
        &self,
        session_id: &str,
        words: &[S],
    ) -> Result<(), RoomError> {
        let session = self
            .games
            .session(session_id)
            .ok_or_else(|| RoomError::SessionNotFound(session_id.to_string()))?;
        session.set_field(words).await?;
        debug!(room_id = %self.id, session_id, "field replaced from console");
        Ok(())
    }

    pub async fn activate_item(&self, source_id: &str, item: ItemKind) {
        let Some(source) = self.games.session(source_id) else {
            return;
        };
        let target = self
            .targets
            .target_of(source_id)
            .and_then(|target_id| self.games.session(&target_id));

        let mut effects = self.effects.lock().await;
        while effects.try_join_next().is_some() {}
        self.item_effects
            .activate(item, source, target, &mut effects)
            .await;
    }

    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for session in self.games.take_all() {
            session.stop().await;
        }
        let subscriptions: Vec<SubscriptionId> = locks::lock(&self.subscriptions)
            .drain()
            .map(|(_, subscription)| subscription)
            .collect();
        for subscription in subscriptions {
            self.bus.unsubscribe(subscription);
        }
        let _ = self.shutdown.send(true);

        let handles = std::mem::take(&mut *locks::lock(&self.tasks));
        for handle in handles {
            if let Err(err) = handle.await {
                warn!(room_id = %self.id, error = %err, "room task failed");
            }
        }
        let mut effects = self.effects.lock().await;
        while effects.join_next().await.is_some() {}
        drop(effects);

        self.bus.stop().await;
        info!(room_id = %self.id, "room shut down");
    }

    async fn handle_signal(&self, signal: SessionSignal) {
        match signal {
            SessionSignal::GameOver(session_id) => {
                debug!(room_id = %self.id, session_id = %session_id, "session over");
                self.refresh_targets();
                self.check_round_end().await;
            }
            SessionSignal::Disconnected(session_id) => {
                self.leave(&session_id).await;
            }
            SessionSignal::UseItem { source_id, item } => {
                self.activate_item(&source_id, item).await;
            }
        }
    }

    fn refresh_targets(&self) {
        refresh_targets(&self.targets, self.games.as_ref(), &self.bus, &self.id);
    }

    fn publish(&self, event_type: EventType, payload: EventPayload) {
        self.bus
            .publish(Event::new(event_type, Origin::room(&self.id), payload));
    }
}

pub fn sort_scores(scores: &mut [PlayerScorePayload]) {
    scores.sort_by(|a, b| {
        b.score
            .score
            .cmp(&a.score.score)
            .then(b.score.lines.cmp(&a.score.lines))
    });
}

fn write_event(writer: &ConnectionWriter, event: Event) {
    match event.to_json() {
        Ok(json) => {
            writer.write(json);
        }
        Err(err) => warn!(error = %err, "failed to serialize event"),
    }
}

async fn run_signals(
    room: Weak<Room>,
    mut signals: mpsc::UnboundedReceiver<SessionSignal>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let signal = tokio::select! {
            _ = shutdown.changed() => break,
            signal = signals.recv() => match signal {
                Some(signal) => signal,
                None => break,
            },
        };
        let Some(room) = room.upgrade() else {
            break;
        };
        room.handle_signal(signal).await;
    }
}
