use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::directory::SessionDirectory;
use crate::targets::TargetsDistribution;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BedrockPacket {
    pub source_id: String,
    pub amount: usize,
}

pub fn bedrock_queue() -> (
    mpsc::UnboundedSender<BedrockPacket>,
    mpsc::UnboundedReceiver<BedrockPacket>,
) {
    mpsc::unbounded_channel()
}

pub async fn deliver(
    packet: &BedrockPacket,
    targets: &TargetsDistribution,
    directory: &dyn SessionDirectory,
) -> bool {
    let Some(target_id) = targets.target_of(&packet.source_id) else {
        debug!(source_id = %packet.source_id, amount = packet.amount, "no target, bedrock dropped");
        return false;
    };
    let Some(target) = directory.session(&target_id) else {
        return false;
    };
    if target.is_over() {
        return false;
    }
    target.receive_bedrock(packet.amount).await;
    debug!(source_id = %packet.source_id, target_id = %target_id, amount = packet.amount, "bedrock delivered");
    true
}

pub async fn run_distribution(
    mut queue: mpsc::UnboundedReceiver<BedrockPacket>,
    targets: Arc<TargetsDistribution>,
    directory: Arc<dyn SessionDirectory>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            packet = queue.recv() => match packet {
                Some(packet) => {
                    deliver(&packet, &targets, directory.as_ref()).await;
                }
                None => break,
            },
        }
    }
}
