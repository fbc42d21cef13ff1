use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::constants::{DEATH_MATCH_MAX_PLAYERS, TARGET_SKIP_PROBABILITY};
use crate::directory::SessionDirectory;
use crate::event::{Event, EventPayload, EventType, Origin};
use crate::event_bus::EventBus;
use crate::locks;
use crate::rng::Rng;
use crate::types::TargetsPayload;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetsMode {
    Default,
    DeathMatch,
}

impl TargetsMode {
    pub fn for_live_count(live: usize) -> Self {
        if live > DEATH_MATCH_MAX_PLAYERS {
            Self::Default
        } else {
            Self::DeathMatch
        }
    }
}

pub fn default_targets(rng: &mut Rng, live_ids: &[String]) -> BTreeMap<String, String> {
    let mut sources = live_ids.to_vec();
    let mut targets = live_ids.to_vec();
    rng.shuffle(&mut sources);
    rng.shuffle(&mut targets);

    let mut map = BTreeMap::new();
    for (source, target) in sources.into_iter().zip(targets) {
        if rng.bool(TARGET_SKIP_PROBABILITY) || source == target {
            continue;
        }
        map.insert(source, target);
    }
    map
}

pub fn death_match_targets(rng: &mut Rng, live_ids: &[String]) -> BTreeMap<String, String> {
    if live_ids.len() < 2 {
        return BTreeMap::new();
    }
    let mut ring = live_ids.to_vec();
    rng.shuffle(&mut ring);
    ring.iter()
        .enumerate()
        .map(|(index, source)| (source.clone(), ring[(index + 1) % ring.len()].clone()))
        .collect()
}

#[derive(Debug)]
pub struct TargetsDistribution {
    rng: Mutex<Rng>,
    targets: RwLock<BTreeMap<String, String>>,
}

impl TargetsDistribution {
    pub fn new(seed: i64) -> Self {
        Self {
            rng: Mutex::new(Rng::from_seed(seed)),
            targets: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn randomize(&self, live_ids: &[String]) -> TargetsPayload {
        let targets = {
            let mut rng = locks::lock(&self.rng);
            match TargetsMode::for_live_count(live_ids.len()) {
                TargetsMode::Default => default_targets(&mut rng, live_ids),
                TargetsMode::DeathMatch => death_match_targets(&mut rng, live_ids),
            }
        };
        self.replace_targets(targets.clone());
        TargetsPayload { targets }
    }

    pub fn replace_targets(&self, targets: BTreeMap<String, String>) {
        *locks::write(&self.targets) = targets;
    }

    pub fn target_of(&self, source_id: &str) -> Option<String> {
        locks::read(&self.targets).get(source_id).cloned()
    }

    pub fn snapshot(&self) -> TargetsPayload {
        TargetsPayload {
            targets: locks::read(&self.targets).clone(),
        }
    }
}

pub fn refresh_targets(
    distribution: &TargetsDistribution,
    directory: &dyn SessionDirectory,
    bus: &EventBus,
    room_id: &str,
) {
    let live_ids = directory.live_session_ids();
    let payload = distribution.randomize(&live_ids);
    debug!(room_id, live = live_ids.len(), targets = payload.targets.len(), "targets randomized");
    bus.publish(Event::new(
        EventType::RoomBedrockTargetsUpdate,
        Origin::room(room_id),
        EventPayload::Targets(payload),
    ));
}

pub async fn run_randomizer(
    distribution: Arc<TargetsDistribution>,
    directory: Arc<dyn SessionDirectory>,
    bus: EventBus,
    room_id: String,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.reset();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                refresh_targets(&distribution, directory.as_ref(), &bus, &room_id);
            }
        }
    }
}
