use crate::error::{ScrapError, ScrapResult};
use crate::fetch::{FetchRequest, Fetcher};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

/// Router quote. Amounts are smallest-unit decimal strings. Fields this service does not
/// read are kept in `extra` so the quote can be posted back to `/swap` unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    #[serde(default)]
    pub input_mint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_amount: Option<String>,
    #[serde(default)]
    pub output_mint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_amount_threshold: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_mode: Option<String>,
    #[serde(default)]
    pub slippage_bps: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_fee: Option<PlatformFee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_impact_pct: Option<String>,
    #[serde(default)]
    pub route_plan: Vec<RoutePlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_slot: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_usd_value: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlatformFee {
    pub amount: String,
    pub fee_bps: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlan {
    pub swap_info: SwapInfo,
    pub percent: u8,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SwapInfo {
    pub amm_key: String,
    #[serde(default)]
    pub label: String,
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: String,
    pub out_amount: String,
    #[serde(default)]
    pub fee_amount: String,
    #[serde(default)]
    pub fee_mint: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    pub swap_transaction: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapRequest<'a> {
    quote_response: &'a QuoteResponse,
    user_public_key: &'a str,
    #[serde(rename = "wrapUnwrapSOL")]
    wrap_unwrap_sol: bool,
}

/// Error body the router returns with non-2xx statuses.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct JupiterErrorResponse {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_code: String,
}

pub struct JupiterClient {
    fetcher: Arc<dyn Fetcher>,
    base_url: String,
    slippage_bps: u16,
}

impl JupiterClient {
    pub fn new(fetcher: Arc<dyn Fetcher>, base_url: impl Into<String>, slippage_bps: u16) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            slippage_bps,
        }
    }

    pub async fn get_quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
    ) -> ScrapResult<QuoteResponse> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/quote", self.base_url),
            &[
                ("inputMint", input_mint.to_string()),
                ("outputMint", output_mint.to_string()),
                ("amount", amount.to_string()),
                ("slippageBps", self.slippage_bps.to_string()),
            ],
        )
        .map_err(|e| ScrapError::Internal(format!("invalid quote url: {e}")))?;

        info!("Requesting quote {} -> {} for {}", input_mint, output_mint, amount);

        let body = self
            .fetcher
            .fetch(&FetchRequest::get(url.as_str()))
            .await
            .map_err(router_error)?;

        serde_json::from_slice(&body).map_err(|e| ScrapError::decode("jupiter quote", e))
    }

    /// Builds the unsigned swap transaction for `quote`; returns it base64-encoded.
    pub async fn get_swap_transaction(
        &self,
        user_public_key: &str,
        quote: &QuoteResponse,
    ) -> ScrapResult<String> {
        let request = FetchRequest::post_json(
            format!("{}/swap", self.base_url),
            &SwapRequest {
                quote_response: quote,
                user_public_key,
                wrap_unwrap_sol: true,
            },
        )?;

        let body = self.fetcher.fetch(&request).await.map_err(router_error)?;
        let swap: SwapResponse =
            serde_json::from_slice(&body).map_err(|e| ScrapError::decode("jupiter swap", e))?;
        Ok(swap.swap_transaction)
    }
}

/// Turns the router's structured error body into a request error; anything else stays an
/// upstream failure.
fn router_error(err: ScrapError) -> ScrapError {
    if let ScrapError::UpstreamStatus { body, .. } = &err {
        if let Ok(parsed) = serde_json::from_str::<JupiterErrorResponse>(body) {
            if !parsed.error.is_empty() {
                return ScrapError::Validation(format!(
                    "Jupiter API error: {} (Code: {})",
                    parsed.error, parsed.error_code
                ));
            }
        }
    }
    err
}
