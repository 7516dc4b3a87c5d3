use crate::error::ApiError;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use scrap_core::{
    coin::{CoinService, ContractDetail},
    config::CoinsConfig,
    db::TokenRepository,
    models::TokenPage,
    series::parse_time_skip,
    swap::{SwapEvaluation, SwapRequest, SwapService},
    wallet::{WalletService, WalletTokenBalance},
    ScrapError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tower_http::cors::CorsLayer;
use tracing::info;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Clone)]
pub struct AppState {
    pub coins: Arc<CoinService>,
    pub swaps: Arc<SwapService>,
    pub wallets: Arc<WalletService>,
    pub tokens: Arc<dyn TokenRepository>,
    pub settings: Arc<CoinsConfig>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/coins/v2/:contract_address", get(coin_detail_by_contract))
        .route("/coins/:chain_id/:contract_address", get(coin_detail_by_chain))
        .route("/api/v1/blockchains", get(blockchains))
        .route("/api/v1/blockchains/stream", get(blockchains_stream))
        .route("/api/v1/blockchains/:contract_address", get(coin_detail_by_contract))
        .route("/api/v1/tokens", get(tokens))
        .route("/api/v1/tokens/accounts", get(token_accounts))
        .route("/api/v1/swaps", post(swap_transaction))
        .route("/api/v1/swaps/quote", post(swap_quote))
        .route("/api/v1/swaps/submit", post(swap_submit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct DetailQuery {
    #[serde(rename = "time-skip")]
    time_skip: Option<String>,
}

impl DetailQuery {
    fn spacing(&self, settings: &CoinsConfig) -> Result<Duration, ScrapError> {
        let raw = self
            .time_skip
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&settings.default_time_skip);
        parse_time_skip(raw, settings.min_time_skip())
    }
}

async fn coin_detail_by_chain(
    State(state): State<AppState>,
    Path((chain_id, contract_address)): Path<(String, String)>,
    Query(q): Query<DetailQuery>,
) -> ApiResult<ContractDetail> {
    let spacing = q.spacing(&state.settings)?;
    let detail = state
        .coins
        .detail_by_chain(&chain_id, &contract_address, spacing)
        .await?;
    Ok(Json(detail))
}

async fn coin_detail_by_contract(
    State(state): State<AppState>,
    Path(contract_address): Path<String>,
    Query(q): Query<DetailQuery>,
) -> ApiResult<ContractDetail> {
    let spacing = q.spacing(&state.settings)?;
    let detail = state
        .coins
        .detail_by_contract(&contract_address, spacing)
        .await?;
    Ok(Json(detail))
}

async fn blockchains(State(state): State<AppState>) -> ApiResult<Vec<Map<String, Value>>> {
    Ok(Json(state.coins.markets().await?))
}

async fn blockchains_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut ticker = tokio::time::interval(state.settings.stream_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Market stream client connected");

    let events = stream::unfold((state, ticker), |(state, mut ticker)| async move {
        ticker.tick().await;
        let event = match state.coins.markets().await {
            Ok(markets) => Event::default()
                .event("markets")
                .json_data(&markets)
                .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())),
            Err(err) => Event::default().event("error").data(err.to_string()),
        };
        Some((Ok(event), (state, ticker)))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct TokensQuery {
    limit: Option<String>,
    page: Option<String>,
    search: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
struct Pagination {
    total: i64,
    page: i64,
    limit: i64,
    pages: i64,
}

#[derive(Serialize)]
struct TokensResponse {
    data: TokenPage,
    pagination: Pagination,
}

const MAX_PAGE_LIMIT: i64 = 100;

fn positive_or(raw: Option<&str>, fallback: i64) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(fallback)
}

async fn tokens(
    State(state): State<AppState>,
    Query(q): Query<TokensQuery>,
) -> ApiResult<TokensResponse> {
    let limit = positive_or(q.limit.as_deref(), 10).min(MAX_PAGE_LIMIT);
    let page = positive_or(q.page.as_deref(), 1);
    let offset = (page - 1).saturating_mul(limit);

    let data = state.tokens.list(limit, offset, q.search.as_deref()).await?;
    let pagination = Pagination {
        total: data.total,
        page,
        limit,
        pages: page_count(data.total, limit),
    };

    Ok(Json(TokensResponse { data, pagination }))
}

fn page_count(total: i64, limit: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        (total - 1) / limit + 1
    }
}

#[derive(Debug, Deserialize)]
struct AccountsQuery {
    address: Option<String>,
}

async fn token_accounts(
    State(state): State<AppState>,
    Query(q): Query<AccountsQuery>,
) -> ApiResult<Vec<WalletTokenBalance>> {
    let address = q
        .address
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| ScrapError::validation("Address is required"))?;

    Ok(Json(state.wallets.balances(&address).await?))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ScrapError::validation(rejection.body_text()).into())
}

#[derive(Serialize)]
struct SwapTransactionResponse {
    transaction: String,
}

async fn swap_transaction(
    State(state): State<AppState>,
    payload: Result<Json<SwapRequest>, JsonRejection>,
) -> ApiResult<SwapTransactionResponse> {
    let request = json_body(payload)?;
    let transaction = state.swaps.build_transaction(&request).await?;
    Ok(Json(SwapTransactionResponse { transaction }))
}

async fn swap_quote(
    State(state): State<AppState>,
    payload: Result<Json<SwapRequest>, JsonRejection>,
) -> ApiResult<SwapEvaluation> {
    let request = json_body(payload)?;
    Ok(Json(state.swaps.quote(&request).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequest {
    signed_transaction: String,
}

#[derive(Serialize)]
struct SubmitResponse {
    signature: String,
}

async fn swap_submit(
    State(state): State<AppState>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<SubmitResponse> {
    let request = json_body(payload)?;
    let signature = state.swaps.submit(&request.signed_transaction).await?;
    Ok(Json(SubmitResponse { signature }))
}
