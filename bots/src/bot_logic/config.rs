use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lib_stream::core::StreamConfig;
use lib_stream::markets::hyperliquid::{MAINNET_WS_URL, TESTNET_WS_URL};
use lib_stream::strategy::StrategyParams;

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Multi-setup mean-reversion bot on the Hyperliquid allMids feed", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "BOT_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "BOT_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "BOT_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "BOT_WS_URL", help = "Feed WebSocket URL. Overrides --network.")]
    pub ws_url: Option<String>,

    #[clap(long, env = "BOT_NETWORK", help = "Feed network: mainnet or testnet.")]
    pub network: Option<String>,

    #[clap(long, env = "BOT_RECONNECT_INTERVAL_SECONDS", help = "Seconds to wait before reconnecting.")]
    pub reconnect_interval_seconds: Option<u64>,

    #[clap(long, env = "BOT_PING_INTERVAL_SECONDS", help = "Seconds between keepalive pings.")]
    pub ping_interval_seconds: Option<u64>,

    #[clap(long, env = "BOT_MAX_RECONNECT_ATTEMPTS", help = "Consecutive failed connects before exiting. Unset retries forever.")]
    pub max_reconnect_attempts: Option<u32>,

    #[clap(long, env = "BOT_COIN", help = "Coin to trade.")]
    pub coin: Option<String>,

    #[clap(long = "sz", env = "BOT_SIZE", help = "Trading size (e.g., 0.01).")]
    pub size: Option<f64>,

    #[clap(long, env = "BOT_WINDOW", help = "Z-score window in evaluations.")]
    pub window: Option<usize>,

    #[clap(long, env = "BOT_EVAL_INTERVAL_SECONDS", help = "Seconds between strategy evaluations.")]
    pub eval_interval_seconds: Option<u64>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            ws_url: other.ws_url.or(self.ws_url),
            network: other.network.or(self.network),
            reconnect_interval_seconds: other.reconnect_interval_seconds.or(self.reconnect_interval_seconds),
            ping_interval_seconds: other.ping_interval_seconds.or(self.ping_interval_seconds),
            max_reconnect_attempts: other.max_reconnect_attempts.or(self.max_reconnect_attempts),
            coin: other.coin.or(self.coin),
            size: other.size.or(self.size),
            window: other.window.or(self.window),
            eval_interval_seconds: other.eval_interval_seconds.or(self.eval_interval_seconds),
        }
    }

    fn defaults() -> Config {
        let stream = StreamConfig::default();
        let params = StrategyParams::default();
        Config {
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            network: Some("mainnet".to_string()),
            reconnect_interval_seconds: Some(stream.reconnect_interval.as_secs()),
            ping_interval_seconds: Some(stream.ping_interval.as_secs()),
            coin: Some(params.coin),
            size: Some(params.size),
            window: Some(params.window),
            eval_interval_seconds: Some(params.eval_interval.as_secs()),
            ..Default::default()
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn stream_config(&self) -> StreamConfig {
        let mut stream = StreamConfig::default();
        stream.url = match (&self.ws_url, self.network.as_deref()) {
            (Some(url), _) => url.clone(),
            (None, Some("testnet")) => TESTNET_WS_URL.to_string(),
            _ => MAINNET_WS_URL.to_string(),
        };
        if let Some(secs) = self.reconnect_interval_seconds {
            stream.reconnect_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.ping_interval_seconds {
            stream.ping_interval = Duration::from_secs(secs);
        }
        stream.max_reconnect_attempts = self.max_reconnect_attempts;
        stream
    }

    pub fn strategy_params(&self) -> StrategyParams {
        let mut params = StrategyParams::default();
        if let Some(coin) = &self.coin {
            params.coin = coin.clone();
        }
        if let Some(size) = self.size {
            params.size = size;
        }
        if let Some(window) = self.window {
            params.window = window;
        }
        if let Some(secs) = self.eval_interval_seconds {
            params.eval_interval = Duration::from_secs(secs);
        }
        params
    }
}

/// A config-loading diagnostic, held back until the logger is up.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigNote {
    pub level: log::Level,
    pub message: String,
}

impl ConfigNote {
    fn new(level: log::Level, message: String) -> Self {
        Self { level, message }
    }

    pub fn emit(&self) {
        log::log!(self.level, "{}", self.message);
    }
}

fn read_config_file(path: &Path, notes: &mut Vec<ConfigNote>) -> Option<Config> {
    if !path.exists() {
        notes.push(ConfigNote::new(
            log::Level::Info,
            format!("Config file not found at {}. Using defaults and environment/CLI variables.", path.display()),
        ));
        return None;
    }
    let Ok(config_str) = fs::read_to_string(path) else {
        notes.push(ConfigNote::new(
            log::Level::Warn,
            format!("Failed to read config file: {}. Falling back to other sources.", path.display()),
        ));
        return None;
    };
    match serde_json::from_str::<Config>(&config_str) {
        Ok(file_config) => Some(file_config),
        Err(e) => {
            notes.push(ConfigNote::new(
                log::Level::Warn,
                format!("Failed to parse config file {}: {}. Falling back to other sources.", path.display(), e),
            ));
            None
        }
    }
}

/// Defaults, then the JSON file, then environment variables and CLI flags.
///
/// Diagnostics come back as notes; emit them once logging is set up.
pub fn resolve_config(cli_args: Config) -> (Config, Vec<ConfigNote>) {
    let config_file_path = cli_args.config_path.clone().unwrap_or_else(|| PathBuf::from("bot_meanrev.conf"));

    let mut notes = Vec::new();
    let mut current_config = Config::defaults();
    if let Some(file_config) = read_config_file(&config_file_path, &mut notes) {
        current_config = current_config.merge(file_config);
    }
    (current_config.merge(cli_args), notes)
}

pub fn load_config() -> (Config, Vec<ConfigNote>) {
    // clap::Parser handles env vars and CLI args together.
    resolve_config(Config::parse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_library_defaults() {
        let (config, notes) = resolve_config(Config {
            config_path: Some(PathBuf::from("/nonexistent/bot_meanrev.conf")),
            ..Default::default()
        });
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, log::Level::Info);
        assert_eq!(config.stream_config().url, MAINNET_WS_URL);
        assert_eq!(config.stream_config().ping_interval, Duration::from_secs(50));
        assert_eq!(config.strategy_params(), StrategyParams::default());
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn file_overrides_defaults_and_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.conf");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, r#"{{"coin":"BTC","size":0.5,"network":"testnet","pingIntervalSeconds":20}}"#).unwrap();

        let (config, notes) = resolve_config(Config {
            config_path: Some(path),
            size: Some(2.0),
            ..Default::default()
        });
        assert!(notes.is_empty());

        let params = config.strategy_params();
        assert_eq!(params.coin, "BTC");
        assert_eq!(params.size, 2.0);
        let stream = config.stream_config();
        assert_eq!(stream.url, TESTNET_WS_URL);
        assert_eq!(stream.ping_interval, Duration::from_secs(20));
        assert_eq!(stream.max_reconnect_attempts, None);
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.conf");
        fs::write(&path, "not json").unwrap();

        let (config, notes) = resolve_config(Config { config_path: Some(path.clone()), ..Default::default() });
        assert_eq!(config.coin.as_deref(), Some("HYPE"));
        assert_eq!(config.config_path, Some(path));

        // Reported to the caller rather than logged before the logger exists.
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, log::Level::Warn);
        assert!(notes[0].message.contains("Failed to parse config file"));
    }

    #[test]
    fn explicit_url_beats_network() {
        let config = Config {
            ws_url: Some("ws://127.0.0.1:9000/ws".into()),
            network: Some("testnet".into()),
            ..Default::default()
        };
        assert_eq!(config.stream_config().url, "ws://127.0.0.1:9000/ws");
    }
}
