use std::time::Duration;

use clap::Parser;

use crate::constants::{FIELD_HEIGHT, FIELD_WIDTH, TARGETS_INTERVAL_MS};
use crate::room::RoomSettings;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Multiplayer falling-block room server")]
pub struct ServerConfig {
    #[arg(long, env = "PORT", default_value_t = 7000)]
    pub port: u16,
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: String,
    #[arg(long, default_value_t = FIELD_WIDTH)]
    pub field_width: usize,
    #[arg(long, default_value_t = FIELD_HEIGHT)]
    pub field_height: usize,
    #[arg(long)]
    pub disable_bedrock: bool,
    #[arg(long)]
    pub disable_items: bool,
    #[arg(long, env = "DEBUG_CONSOLE")]
    pub debug_console: bool,
    #[arg(long, default_value_t = TARGETS_INTERVAL_MS)]
    pub targets_interval_ms: u64,
    #[arg(long, default_value_t = 15 * 60)]
    pub room_curfew_secs: u64,
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn room_curfew(&self) -> Duration {
        Duration::from_secs(self.room_curfew_secs)
    }

    pub fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            field_width: self.field_width.max(4),
            field_height: self.field_height.max(4),
            bedrock_enabled: !self.disable_bedrock,
            items_enabled: !self.disable_items,
            targets_interval: Duration::from_millis(self.targets_interval_ms.max(100)),
            ..RoomSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_standard_game() {
        let config = ServerConfig::parse_from(["server"]);
        assert_eq!(config.field_width, 10);
        assert_eq!(config.field_height, 20);
        let settings = config.room_settings();
        assert!(settings.bedrock_enabled);
        assert!(settings.items_enabled);
        assert_eq!(settings.targets_interval, Duration::from_secs(5));
        assert_eq!(settings.event_window, Duration::from_millis(10));
    }

    #[test]
    fn flags_disable_features() {
        let config = ServerConfig::parse_from([
            "server",
            "--disable-bedrock",
            "--disable-items",
            "--field-width",
            "2",
            "--port",
            "9000",
        ]);
        let settings = config.room_settings();
        assert!(!settings.bedrock_enabled);
        assert!(!settings.items_enabled);
        assert_eq!(settings.field_width, 4);
        assert_eq!(config.port, 9000);
    }
}
