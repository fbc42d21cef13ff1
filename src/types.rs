use std::collections::BTreeMap;

use serde::Serialize;

use crate::piece::Token;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Left,
    Right,
    Down,
    Rotate,
    HardDrop,
    Hold,
    UseItem,
}

impl Command {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "L" => Some(Self::Left),
            "R" => Some(Self::Right),
            "D" => Some(Self::Down),
            "X" => Some(Self::Rotate),
            "P" => Some(Self::HardDrop),
            "H" => Some(Self::Hold),
            "I" => Some(Self::UseItem),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "L",
            Self::Right => "R",
            Self::Down => "D",
            Self::Rotate => "X",
            Self::HardDrop => "P",
            Self::Hold => "H",
            Self::UseItem => "I",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Tornado,
    OnlyIPieces,
    LockRotation,
}

impl ItemKind {
    pub const ALL: [ItemKind; 3] = [Self::Tornado, Self::OnlyIPieces, Self::LockRotation];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "tornado" => Some(Self::Tornado),
            "only_i_pieces" => Some(Self::OnlyIPieces),
            "lock_rotation" => Some(Self::LockRotation),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldPayload {
    pub width: usize,
    pub height: usize,
    pub bedrock: usize,
    pub data: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FallingPiecePayload {
    pub token: Option<Token>,
    pub rotation: usize,
    pub x: i32,
    pub y: i32,
    #[serde(rename = "rotationLocked")]
    pub rotation_locked: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PieceSlotPayload {
    pub token: Option<Token>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScorePayload {
    pub score: u64,
    pub lines: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GamePayload {
    pub id: String,
    #[serde(rename = "playerName")]
    pub player_name: String,
    pub over: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoomPayload {
    pub id: String,
    pub games: Vec<GamePayload>,
    #[serde(rename = "hostId")]
    pub host_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TargetsPayload {
    pub targets: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlayerScorePayload {
    pub game: GamePayload,
    pub score: ScorePayload,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoomScoresPayload {
    pub scores: Vec<PlayerScorePayload>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HelloAckPayload {
    pub room: RoomPayload,
    #[serde(rename = "controlledGame")]
    pub controlled_game: GamePayload,
    pub host: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemPayload {
    #[serde(rename = "type")]
    pub item: Option<ItemKind>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemAffectionPayload {
    #[serde(rename = "type")]
    pub item: Option<ItemKind>,
    #[serde(rename = "sourceGameId")]
    pub source_game_id: String,
}
