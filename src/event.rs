use chrono::Utc;
use serde::Serialize;

use crate::types::{
    FallingPiecePayload, FieldPayload, GamePayload, HelloAckPayload, ItemAffectionPayload,
    ItemPayload, PieceSlotPayload, RoomPayload, RoomScoresPayload, ScorePayload, TargetsPayload,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Hello,
    HelloAck,
    RoomStart,
    RoomJoin,
    RoomLeave,
    RoomBedrockTargetsUpdate,
    RoomScores,
    FieldUpdate,
    FallingPieceUpdate,
    HoldingPieceUpdate,
    NextPieceUpdate,
    ScoreUpdate,
    GameStart,
    GameOver,
    ItemUpdate,
    ItemAffectionUpdate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Origin {
    System,
    Room { id: String },
    Game { id: String },
}

impl Origin {
    pub fn room(id: &str) -> Self {
        Self::Room { id: id.to_string() }
    }

    pub fn game(id: &str) -> Self {
        Self::Game { id: id.to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    Empty,
    Field(FieldPayload),
    FallingPiece(FallingPiecePayload),
    PieceSlot(PieceSlotPayload),
    Score(ScorePayload),
    Game(GamePayload),
    Room(RoomPayload),
    Targets(TargetsPayload),
    RoomScores(RoomScoresPayload),
    HelloAck(HelloAckPayload),
    Item(ItemPayload),
    ItemAffection(ItemAffectionPayload),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub origin: Origin,
    pub payload: EventPayload,
    #[serde(rename = "publishedAt")]
    pub published_at: i64,
}

impl Event {
    pub fn new(event_type: EventType, origin: Origin, payload: EventPayload) -> Self {
        Self {
            event_type,
            origin,
            payload,
            published_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
