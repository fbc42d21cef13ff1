pub mod bag;
pub mod bedrock;
pub mod config;
pub mod connection;
pub mod constants;
pub mod directory;
pub mod engine;
pub mod error;
pub mod event;
pub mod event_bus;
pub mod falling_piece;
pub mod field;
pub mod items;
pub mod locks;
pub mod piece;
pub mod player;
pub mod rng;
pub mod room;
pub mod score;
pub mod sequence;
pub mod server_protocol;
pub mod server_utils;
pub mod session;
pub mod targets;
pub mod types;
