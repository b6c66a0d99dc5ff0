//! Configuration management

use crate::money::parse_magnitude_str;
use crate::notify::{DispatchConfig, FormatConfig};
use crate::rooms::{default_flag_rules, FlagRule};
use crate::router::{ChannelConfig, RoutingMode, ThresholdBounds};
use crate::storage::DEFAULT_TTL_SECS;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

/// Base thresholds of the stock deployment
const MIN_SECRET: f64 = 300_000.0;
const MIN_NON_SECRET: f64 = 500_000.0;
const FIVE_M: f64 = 5_000_000.0;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub buffer: BufferConfig,
    pub routing: RoutingConfig,
    pub format: FormatConfig,
    pub dispatch: DispatchConfig,
    pub rooms: RoomsConfig,
    pub servers: ServersConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub listen_addr: String,
    /// Origins allowed by CORS ("*" allows any)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3333".to_string(),
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listen_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen_addr {}: {}", self.listen_addr, e))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Retention window in seconds
    pub ttl_secs: i64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub mode: RoutingMode,
    pub channels: Vec<ChannelConfig>,
    /// Webhook for watchlist finds
    pub finds_webhook: Option<String>,
    /// Environment variable holding the finds webhook
    pub finds_webhook_env: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            mode: RoutingMode::Broadcast,
            channels: default_channels(),
            finds_webhook: None,
            finds_webhook_env: "DISCORD_WEBHOOK_FINDS".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    /// Broadcast channel capacity
    pub capacity: usize,
    pub rules: Vec<FlagRule>,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            rules: default_flag_rules(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServersConfig {
    /// Falls back to `format.place_id`
    pub place_id: Option<u64>,
    /// Upstream `/servers` endpoints merged by the proxy route
    pub sources: Vec<String>,
}

fn channel(name: &str, env_key: &str, thresholds: ThresholdBounds) -> ChannelConfig {
    ChannelConfig {
        name: name.to_string(),
        env_key: Some(env_key.to_string()),
        webhook: None,
        badge: Some("Finder".to_string()),
        thresholds,
    }
}

/// Public, +5M and Finder66
pub fn default_channels() -> Vec<ChannelConfig> {
    let public = ThresholdBounds {
        min_secret: Some(MIN_SECRET),
        max_secret: Some(FIVE_M),
        min_non_secret: Some(MIN_NON_SECRET),
        max_non_secret: Some(FIVE_M),
    };
    let five_m = ThresholdBounds {
        min_secret: Some(FIVE_M),
        max_secret: None,
        min_non_secret: Some(FIVE_M),
        max_non_secret: None,
    };
    vec![
        channel("Public", "PUBLIC", public.clone()),
        channel("+5M", "5M", five_m),
        channel("Finder66", "FINDER66", public),
    ]
}

/// `PLOTSTREAM__SECTION__KEY` variables; list keys split on commas
fn environment() -> config::Environment {
    config::Environment::with_prefix("PLOTSTREAM")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("server.cors_origins")
        .with_list_parse_key("servers.sources")
}

impl Config {
    /// Load configuration from file, then environment
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Config path is not valid UTF-8: {}", path.display()))?;

        let settings = config::Config::builder()
            .add_source(config::File::with_name(path_str).required(false))
            .add_source(environment())
            .build()?;

        let mut config: Config = settings.try_deserialize()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from default locations, falling back to defaults + environment
    pub fn load_default() -> anyhow::Result<Self> {
        let paths = ["plotstream.toml", "config.toml", "~/.config/plotstream/config.toml"];

        for path in paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(&*expanded).exists() {
                return Self::load(&*expanded);
            }
        }

        Self::load("plotstream")
    }

    /// Apply per-channel `DISCORD_WEBHOOK_<KEY>` and `<KEY>_MIN_SECRET`-style variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        for channel in &mut self.routing.channels {
            let Some(key) = channel.env_key.clone() else {
                continue;
            };
            if let Some(url) = non_blank(&format!("DISCORD_WEBHOOK_{}", key)) {
                channel.webhook = Some(url.trim().to_string());
            }

            let bounds = &mut channel.thresholds;
            for (suffix, slot) in [
                ("MIN_SECRET", &mut bounds.min_secret),
                ("MAX_SECRET", &mut bounds.max_secret),
                ("MIN_NON_SECRET", &mut bounds.min_non_secret),
                ("MAX_NON_SECRET", &mut bounds.max_non_secret),
            ] {
                let var = format!("{}_{}", key, suffix);
                if let Some(raw) = non_blank(&var) {
                    match parse_magnitude_str(&raw) {
                        Some(value) => *slot = Some(value),
                        None => tracing::warn!("Ignoring unparseable {}={}", var, raw),
                    }
                }
            }
        }

        if self.routing.finds_webhook.is_none() {
            self.routing.finds_webhook = non_blank(&self.routing.finds_webhook_env)
                .map(|url| url.trim().to_string());
        }

        if let Some(raw) = non_blank("CORS_ORIGIN") {
            self.server.cors_origins = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }

    pub fn enabled_channel_count(&self) -> usize {
        self.routing.channels.iter().filter(|c| c.is_enabled()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.buffer.ttl_secs, 60);
        assert_eq!(config.routing.mode, RoutingMode::Broadcast);
        assert_eq!(config.routing.channels.len(), 3);
        assert_eq!(config.enabled_channel_count(), 0);
        assert_eq!(config.dispatch.batch_size, 10);
        assert_eq!(config.rooms.rules.len(), 4);
        assert!(config.server.socket_addr().is_ok());
    }

    #[test]
    fn test_default_public_bounds() {
        let channels = default_channels();
        let public = &channels[0];
        assert_eq!(public.thresholds.min_secret, Some(300_000.0));
        assert_eq!(public.thresholds.max_non_secret, Some(5_000_000.0));
        assert_eq!(channels[1].thresholds.max_secret, None);
    }

    #[test]
    fn test_env_overrides_enable_channel_and_thresholds() {
        let mut config = Config::default();
        config.apply_env_overrides(lookup(&[
            ("DISCORD_WEBHOOK_PUBLIC", " https://discord.test/api/webhooks/1/a "),
            ("PUBLIC_MIN_SECRET", "1m"),
            ("PUBLIC_MAX_NON_SECRET", "garbage"),
            ("DISCORD_WEBHOOK_5M", ""),
            ("DISCORD_WEBHOOK_FINDS", "https://discord.test/api/webhooks/2/b"),
        ]));

        let public = &config.routing.channels[0];
        assert!(public.is_enabled());
        assert_eq!(public.webhook.as_deref(), Some("https://discord.test/api/webhooks/1/a"));
        assert_eq!(public.thresholds.min_secret, Some(1_000_000.0));
        assert_eq!(public.thresholds.max_non_secret, Some(5_000_000.0));
        assert!(!config.routing.channels[1].is_enabled());
        assert_eq!(config.enabled_channel_count(), 1);
        assert!(config.routing.finds_webhook.is_some());
    }

    #[test]
    fn test_cors_override() {
        let mut config = Config::default();
        config.apply_env_overrides(lookup(&[("CORS_ORIGIN", "https://a.test, https://b.test")]));
        assert_eq!(config.server.cors_origins, vec!["https://a.test", "https://b.test"]);
    }

    #[test]
    fn test_env_source_splits_lists() {
        let vars: config::Map<String, String> = [
            ("PLOTSTREAM__SERVER__CORS_ORIGINS", "https://a.test,https://b.test"),
            ("PLOTSTREAM__SERVERS__SOURCES", "http://one.test/servers"),
            ("PLOTSTREAM__BUFFER__TTL_SECS", "90"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config: Config = config::Config::builder()
            .add_source(environment().source(Some(vars)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.server.cors_origins, vec!["https://a.test", "https://b.test"]);
        assert_eq!(config.servers.sources, vec!["http://one.test/servers"]);
        assert_eq!(config.buffer.ttl_secs, 90);
    }

    #[test]
    fn test_toml_config() {
        let raw = r#"
            [server]
            listen_addr = "127.0.0.1:8080"

            [routing]
            mode = "first_match"

            [[routing.channels]]
            name = "Vip"
            webhook = "https://discord.test/api/webhooks/9/z"

            [routing.channels.thresholds]
            min_secret = 1000000.0

            [format]
            place_id = 109983668079237

            [[rooms.rules]]
            room = "secret"
            secret = true
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.routing.mode, RoutingMode::FirstMatch);
        assert_eq!(config.routing.channels.len(), 1);
        assert_eq!(config.routing.channels[0].thresholds.min_secret, Some(1_000_000.0));
        assert!(config.routing.channels[0].is_enabled());
        assert_eq!(config.format.place_id, Some(109983668079237));
        assert_eq!(config.rooms.rules.len(), 1);
        assert_eq!(config.rooms.capacity, 256);
        assert_eq!(config.buffer.ttl_secs, 60);
    }
}
