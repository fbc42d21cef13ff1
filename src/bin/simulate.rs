use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use quadis_rust_server::connection::{connection_pair, ConnectionPeer};
use quadis_rust_server::constants::CONNECTION_QUEUE;
use quadis_rust_server::rng::Rng;
use quadis_rust_server::room::{Room, RoomSettings};
use quadis_rust_server::server_utils::make_seed;
use quadis_rust_server::types::{Command, PlayerScorePayload};
use serde::Serialize;
use serde_json::json;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::info;
use tracing_subscriber::EnvFilter;

const BOT_COMMANDS: [Command; 7] = [
    Command::Left,
    Command::Right,
    Command::Down,
    Command::Rotate,
    Command::HardDrop,
    Command::Hold,
    Command::UseItem,
];

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs a room full of random bots")]
struct Cli {
    #[arg(long, default_value_t = 4)]
    players: usize,
    #[arg(long, default_value_t = 10)]
    seconds: u64,
    #[arg(long)]
    seed: Option<i64>,
    #[arg(long, default_value_t = 50)]
    command_interval_ms: u64,
    #[arg(long)]
    disable_bedrock: bool,
    #[arg(long)]
    disable_items: bool,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Serialize)]
struct BotStats {
    #[serde(rename = "commandsSent")]
    commands_sent: u64,
    #[serde(rename = "messagesReceived")]
    messages_received: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    seed: i64,
    players: usize,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    #[serde(rename = "roundEnded")]
    round_ended: bool,
    #[serde(rename = "commandsSent")]
    commands_sent: u64,
    #[serde(rename = "messagesReceived")]
    messages_received: u64,
    scores: Vec<PlayerScorePayload>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let seed = cli.seed.unwrap_or_else(make_seed);
    let settings = RoomSettings {
        bedrock_enabled: !cli.disable_bedrock,
        items_enabled: !cli.disable_items,
        ..RoomSettings::default()
    };
    let summary = run_simulation(
        settings,
        cli.players.max(1),
        seed,
        Duration::from_secs(cli.seconds),
        Duration::from_millis(cli.command_interval_ms.max(1)),
    )
    .await?;

    let rendered = serde_json::to_string_pretty(&summary)?;
    println!("{rendered}");
    if let Some(path) = cli.summary_out.as_deref() {
        write_summary(path, &rendered)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
    }
    Ok(())
}

async fn run_simulation(
    settings: RoomSettings,
    players: usize,
    seed: i64,
    duration: Duration,
    command_interval: Duration,
) -> anyhow::Result<RunSummary> {
    let room = Room::new("simulation".to_string(), settings, seed);
    let (shutdown, _) = watch::channel(false);
    let mut seeds = Rng::from_seed(seed);
    let mut bots = Vec::with_capacity(players);

    for index in 0..players {
        let (connection, peer) = connection_pair(CONNECTION_QUEUE);
        peer.inbound
            .send(json!({ "playerName": format!("bot-{}", index + 1) }).to_string())
            .await
            .context("bot connection closed before handshake")?;
        room.join(connection).await?;
        bots.push(tokio::spawn(run_bot(
            peer,
            seeds.next_i64(),
            command_interval,
            shutdown.subscribe(),
        )));
    }

    let started = Instant::now();
    room.start().await?;
    info!(players, seed, "simulation started");

    let mut round_ended = false;
    let deadline = started + duration;
    while Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if room.sessions().iter().all(|session| session.is_over()) {
            round_ended = true;
            break;
        }
    }
    let duration_ms = started.elapsed().as_millis() as u64;

    let _ = shutdown.send(true);
    let mut totals = BotStats::default();
    for bot in bots {
        let stats = bot.await.context("bot task failed")?;
        totals.commands_sent += stats.commands_sent;
        totals.messages_received += stats.messages_received;
    }
    let scores = room.scores().await;
    room.shutdown().await;

    Ok(RunSummary {
        seed,
        players,
        duration_ms,
        round_ended,
        commands_sent: totals.commands_sent,
        messages_received: totals.messages_received,
        scores: scores.scores,
    })
}

async fn run_bot(
    peer: ConnectionPeer,
    seed: i64,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> BotStats {
    let ConnectionPeer {
        inbound,
        mut outbound,
    } = peer;
    let mut rng = Rng::from_seed(seed);
    let mut stats = BotStats::default();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            received = outbound.recv() => match received {
                Some(_) => stats.messages_received += 1,
                None => break,
            },
            _ = ticker.tick() => {
                let command = BOT_COMMANDS[rng.pick_index(BOT_COMMANDS.len())];
                if inbound.send(command.as_str().to_string()).await.is_err() {
                    break;
                }
                stats.commands_sent += 1;
            }
        }
    }
    stats
}

fn write_summary(path: &Path, rendered: &str) -> io::Result<()> {
    std::fs::write(path, rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_settings() -> RoomSettings {
        RoomSettings {
            event_window: Duration::from_millis(5),
            items_interval: Duration::from_millis(200),
            item_effect: Duration::from_millis(100),
            ..RoomSettings::default()
        }
    }

    #[tokio::test]
    async fn short_simulation_reports_every_player() {
        let summary = run_simulation(
            quick_settings(),
            3,
            42,
            Duration::from_millis(500),
            Duration::from_millis(10),
        )
        .await
        .expect("simulation runs");

        assert_eq!(summary.players, 3);
        assert_eq!(summary.scores.len(), 3);
        assert!(summary.commands_sent > 0);
        assert!(summary.messages_received > 0);
        for pair in summary.scores.windows(2) {
            assert!(pair[0].score.score >= pair[1].score.score);
        }
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let path = PathBuf::from("/nonexistent-dir-for-simulate-test/summary.json");
        assert!(write_summary(&path, "{}").is_err());
    }
}
