pub const TICK_RATE: u32 = 100;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const FIELD_WIDTH: usize = 10;
pub const FIELD_HEIGHT: usize = 20;

pub const EVENT_WINDOW_MS: u64 = 10;

pub const BASE_FALL_INTERVAL_MS: i64 = 1_000;
pub const BASE_FALL_SPEED: i64 = 1;

pub const TARGETS_INTERVAL_MS: u64 = 5_000;
pub const TARGET_SKIP_PROBABILITY: f32 = 0.1;
pub const DEATH_MATCH_MAX_PLAYERS: usize = 2;

pub const ITEMS_INTERVAL_MS: u64 = 10_000;
pub const ITEM_GRANT_PROBABILITY: f32 = 0.75;
pub const ITEM_EFFECT_MS: u64 = 5_000;

pub const HANDSHAKE_MAX_ATTEMPTS: usize = 3;
pub const HANDSHAKE_TIMEOUT_MS: u64 = 10_000;

pub const CONNECTION_QUEUE: usize = 256;
pub const PLAYER_NAME_MAX_LEN: usize = 16;
pub const ROOM_ID_LEN: usize = 8;

pub fn get_line_clear_score(lines: usize) -> u64 {
    match lines {
        1 => 60,
        2 => 150,
        3 => 420,
        4 => 2_500,
        _ => 0,
    }
}

pub fn get_fall_interval_ms(speed: i64) -> i64 {
    if speed <= 0 {
        return BASE_FALL_INTERVAL_MS;
    }
    BASE_FALL_INTERVAL_MS / speed
}
