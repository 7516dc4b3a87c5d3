use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    pub environment: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    #[serde(default = "default_coingecko_url")]
    pub coingecko_url: String,
    #[serde(default = "default_dexscreener_url")]
    pub dexscreener_url: String,
    #[serde(default = "default_jupiter_url")]
    pub jupiter_url: String,
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// CoinGecko asset platform and DexScreener chain used when a request only carries a
    /// contract address.
    #[serde(default = "default_platform")]
    pub default_platform: String,
    /// Transport timeout for read-only upstream calls. Unset keeps the client default.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    pub completions_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SwapConfig {
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u16,
    #[serde(default = "default_submit_timeout_secs")]
    pub submit_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CoinsConfig {
    #[serde(default = "default_min_time_skip_secs")]
    pub min_time_skip_secs: u64,
    #[serde(default = "default_time_skip")]
    pub default_time_skip: String,
    #[serde(default = "default_stream_interval_secs")]
    pub stream_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrapConfig {
    pub runtime: RuntimeConfig,
    pub api: ApiConfig,
    pub db: DbConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    pub ai: AiConfig,
    #[serde(default)]
    pub swap: SwapConfig,
    #[serde(default)]
    pub coins: CoinsConfig,
}

impl ScrapConfig {
    /// Loads `config/default.(toml|yaml|json)` (or the file given by `path`) and overrides it
    /// with `SCRAP__SECTION__KEY` environment variables.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SCRAP").separator("__"))
            .build()?;

        settings.try_deserialize().map_err(Into::into)
    }

    pub fn from_env() -> Result<Self> {
        Self::load("config/default")
    }
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl SwapConfig {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }
}

impl CoinsConfig {
    pub fn min_time_skip(&self) -> Duration {
        Duration::from_secs(self.min_time_skip_secs)
    }

    pub fn stream_interval(&self) -> Duration {
        Duration::from_secs(self.stream_interval_secs.max(1))
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            coingecko_url: default_coingecko_url(),
            dexscreener_url: default_dexscreener_url(),
            jupiter_url: default_jupiter_url(),
            rpc_url: default_rpc_url(),
            default_platform: default_platform(),
            request_timeout_ms: None,
        }
    }
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            slippage_bps: default_slippage_bps(),
            submit_timeout_secs: default_submit_timeout_secs(),
        }
    }
}

impl Default for CoinsConfig {
    fn default() -> Self {
        Self {
            min_time_skip_secs: default_min_time_skip_secs(),
            default_time_skip: default_time_skip(),
            stream_interval_secs: default_stream_interval_secs(),
        }
    }
}

fn default_coingecko_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_dexscreener_url() -> String {
    "https://api.dexscreener.com".to_string()
}

fn default_jupiter_url() -> String {
    "https://quote-api.jup.ag/v6".to_string()
}

fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_platform() -> String {
    "solana".to_string()
}

fn default_api_key_header() -> String {
    "ATHENOR-API-KEY".to_string()
}

fn default_slippage_bps() -> u16 {
    50
}

fn default_submit_timeout_secs() -> u64 {
    30
}

fn default_min_time_skip_secs() -> u64 {
    300
}

fn default_time_skip() -> String {
    "5m".to_string()
}

fn default_stream_interval_secs() -> u64 {
    7
}
