use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{BeaconError, Result};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_CONFIG_FILE: &str = "beacon.toml";
pub const DEFAULT_COUNTER_PATH: &str = "eventID.txt";
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64; // queued messages per subscriber before drops
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 15;

/// Top-level config (beacon.toml + BEACON_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeaconConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub counter: CounterConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

/// Where the event counter is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterConfig {
    /// File holding the decimal text of the current counter value.
    #[serde(default = "default_counter_path")]
    pub path: String,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            path: default_counter_path(),
        }
    }
}

/// Per-subscriber streaming behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Bounded queue size for each subscriber. When a subscriber's queue is
    /// full, new messages are dropped for that subscriber only.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Interval between SSE keep-alive comments. `0` disables them.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Directory holding the page templates. Unset means the pages bundled
    /// with the gateway.
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_counter_path() -> String {
    DEFAULT_COUNTER_PATH.to_string()
}
fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}
fn default_keep_alive_secs() -> u64 {
    DEFAULT_KEEP_ALIVE_SECS
}

impl BeaconConfig {
    /// Load config from a TOML file with BEACON_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g. `BEACON_SERVER__PORT=8080`.
    /// A missing file is not an error: every field has a default.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_FILE);

        let config: BeaconConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("BEACON_").split("__"))
            .extract()
            .map_err(|e| BeaconError::Config(e.to_string()))?;

        config.validate()?;
        tracing::debug!(path, "configuration loaded");
        Ok(config)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.stream.channel_capacity == 0 {
            return Err(BeaconError::Config(
                "stream.channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.counter.path.trim().is_empty() {
            return Err(BeaconError::Config(
                "counter.path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// `bind:port` string suitable for `SocketAddr` parsing.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cfg = BeaconConfig::default();
        assert_eq!(cfg.server.port, DEFAULT_PORT);
        assert_eq!(cfg.counter.path, DEFAULT_COUNTER_PATH);
        assert_eq!(cfg.stream.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(cfg.listen_addr(), "0.0.0.0:3000");
        assert!(cfg.validate().is_ok());
    }

    // Every test that calls `load` runs inside a Jail: it owns the process
    // env and working directory while it runs, so tests never see each
    // other's BEACON_* variables.

    #[test]
    fn missing_file_yields_defaults() {
        figment::Jail::expect_with(|_jail| {
            let cfg = BeaconConfig::load(Some("absent.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.server.port, DEFAULT_PORT);
            assert_eq!(cfg.templates.dir, None);
            Ok(())
        });
    }

    #[test]
    fn toml_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "beacon.toml",
                r#"
[server]
port = 8088

[counter]
path = "/var/lib/beacon/counter.txt"

[stream]
channel_capacity = 4
"#,
            )?;

            let cfg = BeaconConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(cfg.server.port, 8088);
            assert_eq!(cfg.server.bind, DEFAULT_BIND);
            assert_eq!(cfg.counter.path, "/var/lib/beacon/counter.txt");
            assert_eq!(cfg.stream.channel_capacity, 4);
            assert_eq!(cfg.stream.keep_alive_secs, DEFAULT_KEEP_ALIVE_SECS);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "beacon.toml",
                "[server]\nport = 4000\n\n[templates]\ndir = \"pages\"\n",
            )?;
            jail.set_env("BEACON_SERVER__PORT", "8080");
            jail.set_env("BEACON_STREAM__CHANNEL_CAPACITY", "8");
            jail.set_env("BEACON_COUNTER__PATH", "/data/eventID.txt");

            let cfg = BeaconConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(cfg.server.port, 8080);
            assert_eq!(cfg.stream.channel_capacity, 8);
            assert_eq!(cfg.counter.path, "/data/eventID.txt");
            assert_eq!(cfg.templates.dir.as_deref(), Some("pages"));
            Ok(())
        });
    }

    #[test]
    fn zero_capacity_from_env_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("BEACON_STREAM__CHANNEL_CAPACITY", "0");
            let err = BeaconConfig::load(None).unwrap_err();
            assert_eq!(err.code(), "CONFIG_ERROR");
            Ok(())
        });
    }

    #[test]
    fn zero_capacity_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("beacon.toml", "[stream]\nchannel_capacity = 0\n")?;
            let err = BeaconConfig::load(None).unwrap_err();
            assert_eq!(err.code(), "CONFIG_ERROR");
            Ok(())
        });
    }

    #[test]
    fn malformed_toml_is_config_error() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("beacon.toml", "[server\nport = ")?;
            assert!(matches!(
                BeaconConfig::load(None),
                Err(BeaconError::Config(_))
            ));
            Ok(())
        });
    }
}
