use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use lib_kegtap::core::{FLOW_DETECTION_THRESHOLD, keg_level::LED_COUNT};
use lib_kegtap::retrieve::ClientOptions;
use serde::{Deserialize, Serialize};

use super::sensor::PulseScript;

const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
const DEFAULT_TAP_ID: &str = "tap_1";
const DEFAULT_FLOW_TIMEOUT_MS: u64 = 2000;
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_DISPLAY_WIDTH: u32 = 240;
const DEFAULT_DISPLAY_HEIGHT: u32 = 240;
const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_CONFIG_FILE: &str = "tap_monitor.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Keg tap flow monitor", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "TAP_SERVER_URL", help = "Base URL of the tap server.")]
    pub server_url: Option<String>,

    #[clap(long, env = "TAP_ID", help = "Identifier of the tap this device watches.")]
    pub tap_id: Option<String>,

    #[clap(long, env = "TAP_FLOW_DETECTION_THRESHOLD", help = "Pulses per window that count as flow.")]
    pub flow_detection_threshold: Option<u32>,

    #[clap(long, env = "TAP_FLOW_TIMEOUT_MS", help = "Length of one detection window in milliseconds.")]
    pub flow_timeout_ms: Option<u64>,

    #[clap(long, env = "TAP_REFRESH_INTERVAL_SECS", help = "Seconds between tap info refreshes.")]
    pub refresh_interval_secs: Option<u64>,

    #[clap(long, env = "TAP_LED_COUNT", help = "Number of LEDs in the keg level bar.")]
    pub led_count: Option<usize>,

    #[clap(long, env = "TAP_REQUEST_TIMEOUT_SECS", help = "Per-attempt HTTP timeout in seconds.")]
    pub request_timeout_secs: Option<u64>,

    #[clap(long, env = "TAP_MAX_RETRIES", help = "Retries for transient HTTP failures.")]
    pub max_retries: Option<u32>,

    #[clap(long, env = "TAP_DISPLAY_WIDTH", help = "Display width in pixels.")]
    pub display_width: Option<u32>,

    #[clap(long, env = "TAP_DISPLAY_HEIGHT", help = "Display height in pixels.")]
    pub display_height: Option<u32>,

    #[clap(long, env = "TAP_SIMULATE", help = "Simulated pulse script, e.g. \"pour:4@40,idle:3\".")]
    pub simulate: Option<String>,

    #[clap(long, env = "TAP_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "TAP_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "TAP_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            server_url: other.server_url.or(self.server_url),
            tap_id: other.tap_id.or(self.tap_id),
            flow_detection_threshold: other.flow_detection_threshold.or(self.flow_detection_threshold),
            flow_timeout_ms: other.flow_timeout_ms.or(self.flow_timeout_ms),
            refresh_interval_secs: other.refresh_interval_secs.or(self.refresh_interval_secs),
            led_count: other.led_count.or(self.led_count),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            max_retries: other.max_retries.or(self.max_retries),
            display_width: other.display_width.or(self.display_width),
            display_height: other.display_height.or(self.display_height),
            simulate: other.simulate.or(self.simulate),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
        }
    }

    pub fn server_url(&self) -> &str {
        self.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    pub fn tap_id(&self) -> &str {
        self.tap_id.as_deref().unwrap_or(DEFAULT_TAP_ID)
    }

    pub fn flow_detection_threshold(&self) -> u32 {
        self.flow_detection_threshold.unwrap_or(FLOW_DETECTION_THRESHOLD)
    }

    pub fn flow_timeout(&self) -> Duration {
        Duration::from_millis(self.flow_timeout_ms.unwrap_or(DEFAULT_FLOW_TIMEOUT_MS).max(1))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(
            self.refresh_interval_secs
                .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS)
                .max(1),
        )
    }

    pub fn led_count(&self) -> usize {
        self.led_count.unwrap_or(LED_COUNT)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(
                self.request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
                    .max(1),
            ),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        }
    }

    pub fn display_size(&self) -> (u32, u32) {
        (
            self.display_width.unwrap_or(DEFAULT_DISPLAY_WIDTH),
            self.display_height.unwrap_or(DEFAULT_DISPLAY_HEIGHT),
        )
    }

    /// The simulated pulse script, if one is configured.
    pub fn pulse_script(&self) -> anyhow::Result<Option<PulseScript>> {
        self.simulate
            .as_deref()
            .map(|raw| raw.parse::<PulseScript>().context("Invalid simulate script"))
            .transpose()
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

/// Layers the JSON config file and CLI/env values (highest wins) over the defaults.
pub fn resolve_config(cli: Config) -> anyhow::Result<Config> {
    let config_file = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let from_file = read_config_file(&config_file)?.unwrap_or_default();
    Ok(from_file.merge(cli))
}

fn read_config_file(path: &Path) -> anyhow::Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let parsed = serde_json::from_str::<Config>(&raw)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(Some(parsed))
}

/// Loads `.env`, parses CLI/env and resolves the final configuration.
pub fn load_config() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    resolve_config(Config::parse())
}
