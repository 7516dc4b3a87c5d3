use crate::db::TokenRepository;
use crate::decimal::{parse_smallest, TokenAmount};
use crate::error::{ScrapError, ScrapResult, SwapSide};
use crate::jupiter::{JupiterClient, QuoteResponse};
use crate::models::{TokenMetadata, TokenSet};
use crate::wallet::{balance_of, WalletService, WalletTokenBalance};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_client::rpc_request::RpcError;
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_sdk::transaction::VersionedTransaction;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub public_key: String,
    pub input_mint: String,
    pub output_mint: String,
    /// Human units of the input token.
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapEvaluation {
    pub in_amount: f64,
    #[serde(rename = "out_mount")]
    pub out_amount: f64,
    pub swap_usd_value: f64,
    pub is_swappable: bool,
    pub balance_in_amount: f64,
}

/// Sends a signed transaction to the cluster and returns its signature.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn send(&self, transaction: &VersionedTransaction) -> ScrapResult<String>;
}

pub struct RpcSubmitter {
    client: RpcClient,
    rpc_url: String,
}

impl RpcSubmitter {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        let rpc_url = rpc_url.into();
        Self {
            client: RpcClient::new_with_commitment(rpc_url.clone(), CommitmentConfig::finalized()),
            rpc_url,
        }
    }

    fn map_error(&self, err: ClientError) -> ScrapError {
        match err.kind() {
            ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) => {
                ScrapError::Rpc {
                    code: *code,
                    message: message.clone(),
                }
            }
            _ => ScrapError::Transport {
                url: self.rpc_url.clone(),
                message: err.to_string(),
            },
        }
    }
}

#[async_trait]
impl TransactionSubmitter for RpcSubmitter {
    async fn send(&self, transaction: &VersionedTransaction) -> ScrapResult<String> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(CommitmentLevel::Finalized),
            ..Default::default()
        };

        let signature = self
            .client
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(|e| self.map_error(e))?;

        Ok(signature.to_string())
    }
}

/// Base64 wire form -> bincode `VersionedTransaction`.
pub fn decode_transaction(encoded: &str) -> ScrapResult<VersionedTransaction> {
    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ScrapError::validation(format!("signed transaction is not valid base64: {e}")))?;

    bincode::deserialize::<VersionedTransaction>(&bytes)
        .map_err(|e| ScrapError::validation(format!("signed transaction is malformed: {e}")))
}

/// Scores a router quote against the requester's holdings.
///
/// Secondary fields that fail to parse degrade to zero. The trade is swappable only when
/// the quote yields a positive output and the input balance covers the requested amount.
pub fn evaluate(
    input: &TokenMetadata,
    output: &TokenMetadata,
    requested: f64,
    quote: &QuoteResponse,
    balances: &[WalletTokenBalance],
) -> SwapEvaluation {
    let raw_out = quote.out_amount.as_deref().map(str::trim).unwrap_or("");

    let out_amount = match TokenAmount::from_smallest_str(output, raw_out) {
        Ok(amount) => amount.human(),
        Err(err) => {
            warn!("Quote output amount unusable: {}", err);
            0.0
        }
    };

    let swap_usd_value = quote
        .swap_usd_value
        .as_deref()
        .and_then(|raw| parse_smallest(raw, "swapUsdValue").ok())
        .unwrap_or(0.0);

    let balance_in_amount = balance_of(balances, &input.address)
        .and_then(|row| TokenAmount::from_smallest_str(input, &row.amount).ok())
        .map(|amount| amount.human())
        .unwrap_or(0.0);

    let is_swappable = out_amount > 0.0
        && !raw_out.is_empty()
        && raw_out != "0"
        && balance_in_amount > 0.0
        && balance_in_amount >= requested;

    SwapEvaluation {
        in_amount: requested,
        out_amount,
        swap_usd_value,
        is_swappable,
        balance_in_amount,
    }
}

pub struct SwapService {
    tokens: Arc<dyn TokenRepository>,
    jupiter: JupiterClient,
    wallet: Arc<WalletService>,
    submitter: Arc<dyn TransactionSubmitter>,
    submit_timeout: Duration,
}

impl SwapService {
    pub fn new(
        tokens: Arc<dyn TokenRepository>,
        jupiter: JupiterClient,
        wallet: Arc<WalletService>,
        submitter: Arc<dyn TransactionSubmitter>,
        submit_timeout: Duration,
    ) -> Self {
        Self {
            tokens,
            jupiter,
            wallet,
            submitter,
            submit_timeout,
        }
    }

    /// Looks up both mints; a missing one is reported with its side.
    pub async fn resolve_pair(
        &self,
        input_mint: &str,
        output_mint: &str,
    ) -> ScrapResult<(TokenMetadata, TokenMetadata)> {
        let mints = vec![input_mint.to_string(), output_mint.to_string()];
        let tokens: TokenSet = self.tokens.find_by_addresses(&mints).await?.into_iter().collect();

        let input = tokens.get(input_mint).ok_or_else(|| ScrapError::UnsupportedToken {
            side: SwapSide::Input,
            mint: input_mint.to_string(),
        })?;
        let output = tokens.get(output_mint).ok_or_else(|| ScrapError::UnsupportedToken {
            side: SwapSide::Output,
            mint: output_mint.to_string(),
        })?;

        Ok((input.clone(), output.clone()))
    }

    async fn request_quote(
        &self,
        request: &SwapRequest,
        input: &TokenMetadata,
    ) -> ScrapResult<QuoteResponse> {
        let amount = TokenAmount::from_human(input, request.amount)?;
        self.jupiter
            .get_quote(&request.input_mint, &request.output_mint, amount.smallest_units())
            .await
    }

    pub async fn quote(&self, request: &SwapRequest) -> ScrapResult<SwapEvaluation> {
        let (input, output) = self
            .resolve_pair(&request.input_mint, &request.output_mint)
            .await?;

        let (quote, balances) = tokio::join!(
            self.request_quote(request, &input),
            self.wallet.balances(&request.public_key)
        );
        let quote = quote?;
        let balances = balances.unwrap_or_else(|err| {
            warn!("Balance lookup for {} failed, using 0: {}", request.public_key, err);
            Vec::new()
        });

        let evaluation = evaluate(&input, &output, request.amount, &quote, &balances);
        info!(
            "Quote {} {} -> {} {} (swappable: {})",
            evaluation.in_amount,
            input.symbol,
            evaluation.out_amount,
            output.symbol,
            evaluation.is_swappable
        );
        Ok(evaluation)
    }

    /// Quote plus swap build; returns the unsigned transaction, base64-encoded.
    pub async fn build_transaction(&self, request: &SwapRequest) -> ScrapResult<String> {
        let (input, _) = self
            .resolve_pair(&request.input_mint, &request.output_mint)
            .await?;
        let quote = self.request_quote(request, &input).await?;
        self.jupiter
            .get_swap_transaction(&request.public_key, &quote)
            .await
    }

    pub async fn submit(&self, signed_transaction: &str) -> ScrapResult<String> {
        let transaction = decode_transaction(signed_transaction)?;

        match tokio::time::timeout(self.submit_timeout, self.submitter.send(&transaction)).await {
            Ok(Ok(signature)) => {
                info!("Submitted transaction {}", signature);
                Ok(signature)
            }
            Ok(Err(err)) => {
                error!("Transaction submission failed: {}", err);
                Err(err)
            }
            Err(_) => Err(ScrapError::Transport {
                url: "sendTransaction".to_string(),
                message: format!("no response within {}s", self.submit_timeout.as_secs_f64()),
            }),
        }
    }
}
