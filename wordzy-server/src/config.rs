use std::env;
use std::str::FromStr;
use std::time::Duration;

use wordzy_core::RoomSettings;
use wordzy_types::{DEFAULT_ROOM_CAPACITY, MIN_PLAYERS_TO_START};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
    #[error("JWT_SECRET must be set unless AUTH_DEV_MODE=true")]
    MissingJwtSecret,
    #[error("MIN_PLAYERS_TO_START ({min}) exceeds MAX_PLAYERS_PER_ROOM ({max})")]
    PlayerBounds { min: usize, max: usize },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_players_per_room: usize,
    pub min_players_to_start: usize,
    pub round_time_limit_seconds: u64,
    pub timer_tick_millis: u64,
    pub recent_word_window: usize,
    /// Replaces the embedded target list when set.
    pub words_file: Option<String>,
    pub require_dictionary_words: bool,
    pub room_idle_timeout_seconds: u64,
    pub connection_timeout_seconds: u64,
    pub rate_limit_burst: u32,
    pub rate_limit_refill_millis: u64,
    pub auth_dev_mode: bool,
    pub jwt_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any key lookup; missing keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse = |name: &'static str| lookup(name).map(|v| v.trim().to_string());

        let config = Self {
            host: parse("HOST").unwrap_or(defaults.host),
            port: parse_or(&parse, "PORT", defaults.port)?,
            max_players_per_room: parse_or(
                &parse,
                "MAX_PLAYERS_PER_ROOM",
                defaults.max_players_per_room,
            )?,
            min_players_to_start: parse_or(
                &parse,
                "MIN_PLAYERS_TO_START",
                defaults.min_players_to_start,
            )?,
            round_time_limit_seconds: parse_or(
                &parse,
                "ROUND_TIME_LIMIT_SECONDS",
                defaults.round_time_limit_seconds,
            )?,
            timer_tick_millis: parse_or(&parse, "TIMER_TICK_MILLIS", defaults.timer_tick_millis)?,
            recent_word_window: parse_or(
                &parse,
                "RECENT_WORD_WINDOW",
                defaults.recent_word_window,
            )?,
            words_file: parse("WORDS_FILE").filter(|v| !v.is_empty()),
            require_dictionary_words: parse_bool(
                &parse,
                "REQUIRE_DICTIONARY_WORDS",
                defaults.require_dictionary_words,
            )?,
            room_idle_timeout_seconds: parse_or(
                &parse,
                "ROOM_IDLE_TIMEOUT_SECONDS",
                defaults.room_idle_timeout_seconds,
            )?,
            connection_timeout_seconds: parse_or(
                &parse,
                "CONNECTION_TIMEOUT_SECONDS",
                defaults.connection_timeout_seconds,
            )?,
            rate_limit_burst: parse_or(&parse, "RATE_LIMIT_BURST", defaults.rate_limit_burst)?,
            rate_limit_refill_millis: parse_or(
                &parse,
                "RATE_LIMIT_REFILL_MILLIS",
                defaults.rate_limit_refill_millis,
            )?,
            auth_dev_mode: parse_bool(&parse, "AUTH_DEV_MODE", defaults.auth_dev_mode)?,
            jwt_secret: parse("JWT_SECRET").filter(|v| !v.is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.auth_dev_mode && self.jwt_secret.is_none() {
            return Err(ConfigError::MissingJwtSecret);
        }
        if self.min_players_to_start > self.max_players_per_room {
            return Err(ConfigError::PlayerBounds {
                min: self.min_players_to_start,
                max: self.max_players_per_room,
            });
        }
        if self.timer_tick_millis == 0 {
            return Err(ConfigError::InvalidValue {
                name: "TIMER_TICK_MILLIS",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            capacity: self.max_players_per_room,
            min_players: self.min_players_to_start,
            time_limit_ms: self.round_time_limit_seconds * 1000,
            recent_window: self.recent_word_window,
            require_dictionary: self.require_dictionary_words,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.timer_tick_millis)
    }

    pub fn room_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.room_idle_timeout_seconds)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }

    pub fn rate_limit_refill(&self) -> Duration {
        Duration::from_millis(self.rate_limit_refill_millis)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_players_per_room: DEFAULT_ROOM_CAPACITY,
            min_players_to_start: MIN_PLAYERS_TO_START,
            round_time_limit_seconds: 300,
            timer_tick_millis: 1000,
            recent_word_window: 10,
            words_file: None,
            require_dictionary_words: false,
            room_idle_timeout_seconds: 30 * 60,
            connection_timeout_seconds: 300,
            rate_limit_burst: 30,
            rate_limit_refill_millis: 500,
            auth_dev_mode: false,
            jwt_secret: None,
        }
    }
}

fn parse_or<T, F>(parse: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&'static str) -> Option<String>,
{
    match parse(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}

fn parse_bool<F>(parse: &F, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    match parse(name) {
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidValue { name, value }),
        },
        None => Ok(default),
    }
}
