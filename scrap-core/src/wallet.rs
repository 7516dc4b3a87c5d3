// Native + SPL balances of one wallet, enriched from the token registry.

use crate::db::TokenRepository;
use crate::error::{ScrapError, ScrapResult};
use crate::fanout::fan_out_pair;
use crate::fetch::{FetchRequest, Fetcher};
use crate::models::{TokenSet, NATIVE_SOL_MINT, SPL_TOKEN_PROGRAM_ID};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletTokenBalance {
    /// Mint address; the native row uses the wrapped SOL mint.
    pub address: String,
    #[serde(rename = "logoURI")]
    pub logo_uri: String,
    /// Raw amount in smallest units.
    pub amount: String,
    pub symbol: String,
    pub name: String,
    pub decimals: Option<u32>,
    #[serde(rename = "isNative")]
    pub is_native: bool,
}

impl WalletTokenBalance {
    fn unresolved(address: String, amount: String, is_native: bool) -> Self {
        Self {
            address,
            logo_uri: String::new(),
            amount,
            symbol: String::new(),
            name: String::new(),
            decimals: None,
            is_native,
        }
    }
}

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: &'a str,
    method: &'a str,
    params: P,
}

#[derive(Deserialize, Debug)]
struct RpcEnvelope<T> {
    result: Option<RpcValue<T>>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize, Debug)]
struct RpcValue<T> {
    value: T,
}

#[derive(Deserialize, Debug)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TokenAccountEntry {
    pub account: TokenAccount,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TokenAccount {
    pub data: TokenAccountData,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TokenAccountData {
    pub parsed: ParsedTokenData,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ParsedTokenData {
    pub info: TokenAccountInfo,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccountInfo {
    pub mint: String,
    pub token_amount: TokenAmountDetail,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmountDetail {
    pub amount: String,
}

fn decode_rpc<T: DeserializeOwned>(body: &[u8], method: &str) -> ScrapResult<T> {
    let envelope: RpcEnvelope<T> =
        serde_json::from_slice(body).map_err(|e| ScrapError::decode(method, e))?;

    if let Some(err) = envelope.error {
        return Err(ScrapError::Rpc {
            code: err.code,
            message: err.message,
        });
    }

    envelope
        .result
        .map(|r| r.value)
        .ok_or_else(|| ScrapError::decode(method, "response has neither result nor error"))
}

/// Native row first, then one row per token account in RPC order.
pub fn merge_balances(native_lamports: u64, accounts: &[TokenAccountEntry]) -> Vec<WalletTokenBalance> {
    let mut balances = Vec::with_capacity(accounts.len() + 1);
    balances.push(WalletTokenBalance::unresolved(
        NATIVE_SOL_MINT.to_string(),
        native_lamports.to_string(),
        true,
    ));

    for entry in accounts {
        let info = &entry.account.data.parsed.info;
        balances.push(WalletTokenBalance::unresolved(
            info.mint.clone(),
            info.token_amount.amount.clone(),
            false,
        ));
    }

    balances
}

/// Fills metadata for rows whose mint is known. Unknown mints keep empty metadata.
pub fn enrich(balances: &mut [WalletTokenBalance], tokens: &TokenSet) {
    for balance in balances.iter_mut() {
        if let Some(token) = tokens.get(&balance.address) {
            balance.logo_uri = token.logo_uri.clone();
            balance.symbol = token.symbol.clone();
            balance.name = token.name.clone();
            balance.decimals = Some(token.precision());
        }
    }
}

/// First row holding `mint`. The native row comes first, so SOL resolves to the native
/// balance.
pub fn balance_of<'a>(balances: &'a [WalletTokenBalance], mint: &str) -> Option<&'a WalletTokenBalance> {
    balances.iter().find(|b| b.address == mint)
}

pub fn validate_address(address: &str) -> ScrapResult<Pubkey> {
    Pubkey::from_str(address.trim()).map_err(|_| ScrapError::validation("Invalid Solana address"))
}

pub struct WalletService {
    fetcher: Arc<dyn Fetcher>,
    rpc_url: String,
    tokens: Arc<dyn TokenRepository>,
}

impl WalletService {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        rpc_url: impl Into<String>,
        tokens: Arc<dyn TokenRepository>,
    ) -> Self {
        Self {
            fetcher,
            rpc_url: rpc_url.into(),
            tokens,
        }
    }

    pub async fn balances(&self, owner: &str) -> ScrapResult<Vec<WalletTokenBalance>> {
        let owner = validate_address(owner)?.to_string();

        let accounts_request = FetchRequest::post_json(
            &self.rpc_url,
            &RpcRequest {
                jsonrpc: "2.0",
                id: "1",
                method: "getTokenAccountsByOwner",
                params: json!([
                    owner,
                    { "programId": SPL_TOKEN_PROGRAM_ID },
                    { "encoding": "jsonParsed" }
                ]),
            },
        )?;
        let balance_request = FetchRequest::post_json(
            &self.rpc_url,
            &RpcRequest {
                jsonrpc: "2.0",
                id: "1",
                method: "getBalance",
                params: json!([owner]),
            },
        )?;

        let (accounts_body, balance_body) =
            fan_out_pair(&self.fetcher, accounts_request, balance_request).await?;

        let accounts: Vec<TokenAccountEntry> =
            decode_rpc(&accounts_body, "getTokenAccountsByOwner")?;
        let lamports: u64 = decode_rpc(&balance_body, "getBalance")?;

        let mut balances = merge_balances(lamports, &accounts);

        let mints: Vec<String> = balances.iter().map(|b| b.address.clone()).collect();
        let tokens: TokenSet = self.tokens.find_by_addresses(&mints).await?.into_iter().collect();
        enrich(&mut balances, &tokens);

        info!(
            "Resolved {} balances for {} ({} with metadata)",
            balances.len(),
            owner,
            balances.iter().filter(|b| b.decimals.is_some()).count()
        );

        Ok(balances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::token;
    use crate::testing::{RouteFetcher, StaticTokens};

    const OWNER: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn account(mint: &str, amount: &str) -> serde_json::Value {
        json!({
            "pubkey": format!("ata-{mint}"),
            "account": {
                "data": {
                    "program": "spl-token",
                    "parsed": {
                        "info": {
                            "isNative": false,
                            "mint": mint,
                            "owner": OWNER,
                            "state": "initialized",
                            "tokenAmount": {
                                "amount": amount,
                                "decimals": 6,
                                "uiAmount": 1.0,
                                "uiAmountString": "1"
                            }
                        },
                        "type": "account"
                    },
                    "space": 165
                },
                "executable": false,
                "lamports": 2039280,
                "owner": SPL_TOKEN_PROGRAM_ID,
                "rentEpoch": 0,
                "space": 165
            }
        })
    }

    fn accounts_body(accounts: Vec<serde_json::Value>) -> String {
        json!({
            "jsonrpc": "2.0",
            "id": "1",
            "result": { "context": { "apiVersion": "1.18.0", "slot": 1 }, "value": accounts }
        })
        .to_string()
    }

    fn balance_body(lamports: u64) -> String {
        json!({ "jsonrpc": "2.0", "id": "1", "result": { "context": { "slot": 1 }, "value": lamports } })
            .to_string()
    }

    fn service(fetcher: RouteFetcher) -> (Arc<RouteFetcher>, WalletService) {
        let fetcher = Arc::new(fetcher);
        let tokens = Arc::new(StaticTokens(vec![
            token(NATIVE_SOL_MINT, "SOL", 9),
            token(USDC, "USDC", 6),
        ]));
        let service = WalletService::new(fetcher.clone(), "http://rpc.test", tokens);
        (fetcher, service)
    }

    #[tokio::test]
    async fn test_balances_merge_native_first_and_enrich() {
        let (fetcher, service) = service(
            RouteFetcher::new()
                .ok("getTokenAccountsByOwner", accounts_body(vec![
                    account(USDC, "2500000"),
                    account("UnknownMint1111111111111111111111111111111", "7"),
                ]))
                .ok("getBalance", balance_body(1_500_000_000)),
        );

        let balances = service.balances(OWNER).await.unwrap();
        assert_eq!(balances.len(), 3);

        assert_eq!(balances[0].address, NATIVE_SOL_MINT);
        assert!(balances[0].is_native);
        assert_eq!(balances[0].amount, "1500000000");
        assert_eq!(balances[0].symbol, "SOL");
        assert_eq!(balances[0].decimals, Some(9));

        assert_eq!(balances[1].symbol, "USDC");
        assert_eq!(balances[1].amount, "2500000");

        // Unknown mints stay, with empty metadata.
        assert_eq!(balances[2].amount, "7");
        assert_eq!(balances[2].symbol, "");
        assert_eq!(balances[2].decimals, None);

        assert_eq!(fetcher.urls().len(), 2);
    }

    #[tokio::test]
    async fn test_native_row_present_with_zero_token_accounts() {
        let (_, service) = service(
            RouteFetcher::new()
                .ok("getTokenAccountsByOwner", accounts_body(vec![]))
                .ok("getBalance", balance_body(0)),
        );

        let balances = service.balances(OWNER).await.unwrap();
        assert_eq!(balances.len(), 1);
        assert!(balances[0].is_native);
        assert_eq!(balances[0].amount, "0");
    }

    #[test]
    fn test_native_row_exactly_once_and_first() {
        for n in [0usize, 1, 5, 40] {
            let accounts: Vec<TokenAccountEntry> = (0..n)
                .map(|i| serde_json::from_value(account(&format!("mint{i}"), "1")).unwrap())
                .collect();
            let merged = merge_balances(42, &accounts);
            assert_eq!(merged.len(), n + 1);
            assert!(merged[0].is_native);
            assert_eq!(merged.iter().filter(|b| b.is_native).count(), 1);
        }
    }

    #[tokio::test]
    async fn test_either_rpc_failure_fails_the_call() {
        let (_, service) = service(
            RouteFetcher::new()
                .ok("getTokenAccountsByOwner", accounts_body(vec![account(USDC, "1")]))
                .fail("getBalance", 503, "unavailable"),
        );
        let err = service.balances(OWNER).await.unwrap_err();
        assert_eq!(err.kind(), "UPSTREAM_STATUS_FAILURE");
    }

    #[tokio::test]
    async fn test_rpc_error_object_is_upstream_failure() {
        let (_, service) = service(
            RouteFetcher::new()
                .ok(
                    "getTokenAccountsByOwner",
                    r#"{"jsonrpc":"2.0","id":"1","error":{"code":-32602,"message":"Invalid param"}}"#,
                )
                .ok("getBalance", balance_body(1)),
        );
        let err = service.balances(OWNER).await.unwrap_err();
        assert!(matches!(err, ScrapError::Rpc { code: -32602, .. }));
    }

    #[tokio::test]
    async fn test_invalid_address_is_rejected_before_any_call() {
        let (fetcher, service) = service(RouteFetcher::new());
        let err = service.balances("not-a-key").await.unwrap_err();
        assert_eq!(err.kind(), "VALIDATION_FAILURE");
        assert_eq!(err.to_string(), "Invalid Solana address");
        assert!(fetcher.urls().is_empty());
    }

    #[test]
    fn test_balance_of_prefers_native_row() {
        let wsol_account: TokenAccountEntry =
            serde_json::from_value(account(NATIVE_SOL_MINT, "5")).unwrap();
        let merged = merge_balances(1_000, &[wsol_account]);
        assert_eq!(balance_of(&merged, NATIVE_SOL_MINT).unwrap().amount, "1000");
        assert!(balance_of(&merged, USDC).is_none());
    }
}
