use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::bag::Bag;
use crate::constants::ITEM_GRANT_PROBABILITY;
use crate::directory::SessionDirectory;
use crate::event::{Event, EventPayload, EventType, Origin};
use crate::event_bus::EventBus;
use crate::locks;
use crate::piece::I;
use crate::rng::Rng;
use crate::session::Session;
use crate::types::{ItemAffectionPayload, ItemKind};

#[derive(Debug)]
pub struct ItemDistribution {
    bag: Mutex<Bag<ItemKind>>,
    rng: Mutex<Rng>,
}

impl ItemDistribution {
    pub fn new(seed: i64) -> Self {
        Self {
            bag: Mutex::new(Bag::new(seed, ItemKind::ALL.to_vec())),
            rng: Mutex::new(Rng::from_seed(seed.wrapping_add(1))),
        }
    }

    fn roll(&self) -> Option<ItemKind> {
        if !locks::lock(&self.rng).bool(ITEM_GRANT_PROBABILITY) {
            return None;
        }
        locks::lock(&self.bag).next_element()
    }

    pub async fn grant_round(&self, directory: &dyn SessionDirectory) -> Vec<(String, ItemKind)> {
        let mut granted = Vec::new();
        for id in directory.live_session_ids() {
            let Some(session) = directory.session(&id) else {
                continue;
            };
            let Some(item) = self.roll() else {
                continue;
            };
            if session.grant_item(item).await {
                debug!(session_id = %id, ?item, "item granted");
                granted.push((id, item));
            }
        }
        granted
    }
}

pub async fn run_grants(
    items: Arc<ItemDistribution>,
    directory: Arc<dyn SessionDirectory>,
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
                items.grant_round(directory.as_ref()).await;
            }
        }
    }
}

pub struct ItemEffects {
    pub bus: EventBus,
    pub duration: Duration,
    pub shutdown: watch::Receiver<bool>,
}

impl ItemEffects {
    fn publish_affection(&self, affected_id: &str, item: Option<ItemKind>, source_id: &str) {
        self.bus.publish(Event::new(
            EventType::ItemAffectionUpdate,
            Origin::game(affected_id),
            EventPayload::ItemAffection(ItemAffectionPayload {
                item,
                source_game_id: source_id.to_string(),
            }),
        ));
    }

    pub async fn activate(
        &self,
        item: ItemKind,
        source: Arc<Session>,
        target: Option<Arc<Session>>,
        tasks: &mut JoinSet<()>,
    ) {
        let target = target.filter(|target| !target.is_over());
        info!(source_id = %source.id(), target_id = ?target.as_ref().map(|t| t.id().to_string()), ?item, "item used");

        match item {
            ItemKind::Tornado => {
                if let Some(target) = target {
                    target.shuffle_field().await;
                }
            }
            ItemKind::OnlyIPieces => {
                source.set_override_piece(Some(&I)).await;
                self.publish_affection(source.id(), Some(item), source.id());
                let mut effects = self.timed();
                tasks.spawn(async move {
                    effects.wait().await;
                    source.set_override_piece(None).await;
                    effects.publish_affection(source.id(), None, source.id());
                });
            }
            ItemKind::LockRotation => {
                let Some(target) = target else {
                    return;
                };
                target.set_rotation_locked(true).await;
                self.publish_affection(target.id(), Some(item), source.id());
                let mut effects = self.timed();
                tasks.spawn(async move {
                    effects.wait().await;
                    target.set_rotation_locked(false).await;
                    effects.publish_affection(target.id(), None, source.id());
                });
            }
        }
    }

    fn timed(&self) -> ItemEffects {
        ItemEffects {
            bus: self.bus.clone(),
            duration: self.duration,
            shutdown: self.shutdown.clone(),
        }
    }

    async fn wait(&mut self) {
        tokio::select! {
            _ = tokio::time::sleep(self.duration) => {}
            _ = self.shutdown.changed() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_draws_every_kind_eventually() {
        let items = ItemDistribution::new(5);
        let mut seen = Vec::new();
        for _ in 0..200 {
            if let Some(kind) = items.roll() {
                if !seen.contains(&kind) {
                    seen.push(kind);
                }
            }
        }
        assert_eq!(seen.len(), ItemKind::ALL.len());
    }

    #[test]
    fn roll_sometimes_grants_nothing() {
        let items = ItemDistribution::new(9);
        let misses = (0..400).filter(|_| items.roll().is_none()).count();
        assert!(misses > 0);
        assert!(misses < 200);
    }
}
