//! Contract detail aggregation across CoinGecko, DexScreener and the summarizer.
//!
//! The detail record is decoded straight from the CoinGecko contract payload and then
//! completed in place: the liquidity snapshot comes from the first DexScreener pool, the
//! chart is downsampled, and the summary is generated last from the assembled record.

use crate::ai::Summarizer;
use crate::config::UpstreamConfig;
use crate::db::TokenRepository;
use crate::error::{ScrapError, ScrapResult};
use crate::fanout::{fan_out_pair, fan_out_triple};
use crate::fetch::{FetchRequest, Fetcher};
use crate::series::{downsample_chart, PricePoint};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const ANALYSIS_PROMPT: &str = "Analyze the following crypto data and summarize it in English. \
Also provide suggestions on the potential of this crypto. All currency data is also in USD. \
Summarize only the important data. If there is empty or meaningless data, ignore it, because it \
does not need to be included in the output. Go straight to the core of the analysis, suggestions \
and recommendations, a maximum of 1 paragraph that already covers the most important.";

const CONTRACT_NOT_FOUND: &str = "Contract address not found, please change different contract address";

/// CoinGecko sends `null` for unknown figures.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencyValue {
    #[serde(default, deserialize_with = "nullable")]
    pub usd: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketData {
    #[serde(deserialize_with = "nullable")]
    pub current_price: CurrencyValue,
    #[serde(deserialize_with = "nullable")]
    pub price_change_percentage_1h_in_currency: CurrencyValue,
    #[serde(deserialize_with = "nullable")]
    pub market_cap: CurrencyValue,
    #[serde(deserialize_with = "nullable")]
    pub total_volume: CurrencyValue,
    #[serde(deserialize_with = "nullable")]
    pub market_cap_change_percentage_24h_in_currency: CurrencyValue,
    #[serde(deserialize_with = "nullable")]
    pub fully_diluted_valuation: CurrencyValue,
    #[serde(deserialize_with = "nullable")]
    pub liquidity: CurrencyValue,
    #[serde(deserialize_with = "nullable")]
    pub circulating_supply: f64,
    #[serde(deserialize_with = "nullable")]
    pub total_supply: f64,
    #[serde(deserialize_with = "nullable")]
    pub max_supply: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DexLiquidityInfo {
    pub liquidity_pool_size: f64,
    pub top_dex: String,
    pub volume_24h: f64,
    pub slippage_note: String,
    pub dex_liquidity_ratio: f64,
    pub liquidity_trend_7d: f64,
}

impl DexLiquidityInfo {
    // No upstream provides these yet.
    pub fn placeholder() -> Self {
        Self {
            liquidity_pool_size: 67.8,
            top_dex: "Jupiter".to_string(),
            volume_24h: 130.0,
            slippage_note: "Low (<0.5%)".to_string(),
            dex_liquidity_ratio: 4.6,
            liquidity_trend_7d: 8.2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenAnalytics {
    pub top_holder: f64,
    pub top_wallets: f64,
    pub token_viewer: f64,
    pub sniper_bot: f64,
    pub dev_sold: bool,
    pub dev_buyback: bool,
}

impl TokenAnalytics {
    pub fn placeholder() -> Self {
        Self {
            top_holder: 8.568,
            top_wallets: 8.568,
            token_viewer: 8.568,
            sniper_bot: 1.576,
            dev_sold: true,
            dev_buyback: true,
        }
    }
}

const PLACEHOLDER_LISTING_DAY: i64 = 575;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default, deserialize_with = "nullable")]
    pub small: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractDetail {
    #[serde(deserialize_with = "nullable")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub symbol: String,
    #[serde(deserialize_with = "nullable")]
    pub contract_address: String,
    #[serde(deserialize_with = "nullable")]
    pub web_slug: String,
    pub listing_day: i64,
    #[serde(deserialize_with = "nullable")]
    pub market_data: MarketData,
    pub timestamp_prices: Vec<PricePoint>,
    pub dex_liquidity_info: DexLiquidityInfo,
    pub token_analytics: TokenAnalytics,
    #[serde(deserialize_with = "nullable")]
    pub image: Image,
    pub summary_analysis: String,
}

#[derive(Debug, Deserialize)]
pub struct MarketChart {
    #[serde(default)]
    pub prices: Vec<(f64, f64)>,
}

#[derive(Debug, Deserialize)]
pub struct LiquidityPool {
    #[serde(default)]
    pub liquidity: Option<CurrencyValue>,
}

/// Completes a decoded contract record with the chart and liquidity payloads.
///
/// Fails with `NotFound` when the contract carries no symbol or the downsampled chart is
/// empty; `not_found` is the message used for both.
pub fn assemble(
    mut detail: ContractDetail,
    contract_address: &str,
    chart: &MarketChart,
    pools: &[LiquidityPool],
    time_skip: Duration,
    not_found: &str,
) -> ScrapResult<ContractDetail> {
    if detail.symbol.is_empty() {
        return Err(ScrapError::not_found(not_found));
    }

    detail.contract_address = contract_address.to_string();

    if let Some(liquidity) = pools.first().and_then(|pool| pool.liquidity.as_ref()) {
        detail.market_data.liquidity.usd = liquidity.usd;
    }

    detail.timestamp_prices = downsample_chart(&chart.prices, time_skip)?;
    if detail.timestamp_prices.is_empty() {
        return Err(ScrapError::not_found(not_found));
    }

    detail.dex_liquidity_info = DexLiquidityInfo::placeholder();
    detail.token_analytics = TokenAnalytics::placeholder();
    detail.listing_day = PLACEHOLDER_LISTING_DAY;

    Ok(detail)
}

fn decode<'a, T: Deserialize<'a>>(body: &'a [u8], what: &str) -> ScrapResult<T> {
    serde_json::from_slice(body).map_err(|e| ScrapError::decode(what, e))
}

pub struct CoinService {
    fetcher: Arc<dyn Fetcher>,
    tokens: Arc<dyn TokenRepository>,
    summarizer: Arc<dyn Summarizer>,
    coingecko_url: String,
    dexscreener_url: String,
    default_platform: String,
}

impl CoinService {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        tokens: Arc<dyn TokenRepository>,
        summarizer: Arc<dyn Summarizer>,
        upstream: &UpstreamConfig,
    ) -> Self {
        Self {
            fetcher,
            tokens,
            summarizer,
            coingecko_url: upstream.coingecko_url.trim_end_matches('/').to_string(),
            dexscreener_url: upstream.dexscreener_url.trim_end_matches('/').to_string(),
            default_platform: upstream.default_platform.clone(),
        }
    }

    fn contract_url(&self, coin_id: &str, contract_address: &str) -> String {
        format!("{}/coins/{}/contract/{}", self.coingecko_url, coin_id, contract_address)
    }

    fn chart_url(&self, coin_id: &str) -> String {
        format!(
            "{}/coins/{}/market_chart?vs_currency=usd&days=1",
            self.coingecko_url, coin_id
        )
    }

    fn liquidity_url(&self, chain: &str, contract_address: &str) -> String {
        format!("{}/tokens/v1/{}/{}", self.dexscreener_url, chain, contract_address)
    }

    /// Detail for a contract on an explicit chain; all three sources are fetched at once.
    pub async fn detail_by_chain(
        &self,
        chain_id: &str,
        contract_address: &str,
        time_skip: Duration,
    ) -> ScrapResult<ContractDetail> {
        info!("Fetching contract detail {}/{}", chain_id, contract_address);

        let (contract_body, chart_body, pools_body) = fan_out_triple(
            &self.fetcher,
            FetchRequest::get(self.contract_url(chain_id, contract_address)),
            FetchRequest::get(self.chart_url(chain_id)),
            FetchRequest::get(self.liquidity_url(chain_id, contract_address)),
        )
        .await?;

        let detail: ContractDetail = decode(&contract_body, "contract detail")?;
        let chart: MarketChart = decode(&chart_body, "market chart")?;
        let pools: Vec<LiquidityPool> = decode(&pools_body, "liquidity pools")?;

        if detail.symbol.is_empty() {
            return Err(ScrapError::not_found("Contract address not found"));
        }
        let detail = assemble(detail, contract_address, &chart, &pools, time_skip, "Token ID not found")?;

        Ok(self.with_summary(detail).await)
    }

    /// Detail for a registered contract on the default platform. The contract payload is
    /// fetched first since it carries the coin id the chart lookup needs.
    pub async fn detail_by_contract(
        &self,
        contract_address: &str,
        time_skip: Duration,
    ) -> ScrapResult<ContractDetail> {
        let known = self
            .tokens
            .find_by_addresses(&[contract_address.to_string()])
            .await?;
        if known.is_empty() {
            return Err(ScrapError::not_found(CONTRACT_NOT_FOUND));
        }

        info!("Fetching registered contract detail {}", contract_address);

        let contract_body = self
            .fetcher
            .fetch(&FetchRequest::get(
                self.contract_url(&self.default_platform, contract_address),
            ))
            .await?;
        let detail: ContractDetail = decode(&contract_body, "contract detail")?;
        if detail.symbol.is_empty() {
            return Err(ScrapError::not_found(CONTRACT_NOT_FOUND));
        }

        let (chart_body, pools_body) = fan_out_pair(
            &self.fetcher,
            FetchRequest::get(self.chart_url(&detail.id)),
            FetchRequest::get(self.liquidity_url(&self.default_platform, contract_address)),
        )
        .await?;

        let chart: MarketChart = decode(&chart_body, "market chart")?;
        let pools: Vec<LiquidityPool> = decode(&pools_body, "liquidity pools")?;
        let detail = assemble(detail, contract_address, &chart, &pools, time_skip, CONTRACT_NOT_FOUND)?;

        Ok(self.with_summary(detail).await)
    }

    async fn with_summary(&self, mut detail: ContractDetail) -> ContractDetail {
        match self.summarizer.summarize(ANALYSIS_PROMPT, &detail).await {
            Ok(summary) => detail.summary_analysis = summary,
            Err(err) => warn!("Summary for {} unavailable: {}", detail.id, err),
        }
        detail
    }

    /// Top coins by market cap, passed through untouched.
    pub async fn markets(&self) -> ScrapResult<Vec<Map<String, Value>>> {
        let url = format!(
            "{}/coins/markets?vs_currency=usd&order=market_cap_desc&per_page=100&page=1",
            self.coingecko_url
        );
        let body = self.fetcher.fetch(&FetchRequest::get(url)).await?;
        decode(&body, "market list")
    }
}
