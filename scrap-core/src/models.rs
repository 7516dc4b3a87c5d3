use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mint address of wrapped SOL, also used as the sentinel for native balances.
pub const NATIVE_SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// SPL Token program id on Solana mainnet.
pub const SPL_TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Token registry row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TokenMetadata {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: i32,
    #[serde(rename = "logoURI")]
    pub logo_uri: String,
    pub daily_volume: Option<f64>,
    pub freeze_authority: Option<String>,
    pub mint_authority: Option<String>,
    pub permanent_delegate: Option<String>,
    pub minted_at: Option<DateTime<Utc>>,
    pub tags: Option<serde_json::Value>,
    pub extensions: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl TokenMetadata {
    /// Decimal places as a non-negative exponent.
    pub fn precision(&self) -> u32 {
        self.decimals.max(0) as u32
    }
}

/// Registry rows resolved for one request, keyed by mint address.
#[derive(Debug, Clone, Default)]
pub struct TokenSet {
    by_address: HashMap<String, TokenMetadata>,
}

impl TokenSet {
    pub fn get(&self, mint: &str) -> Option<&TokenMetadata> {
        self.by_address.get(mint)
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

impl FromIterator<TokenMetadata> for TokenSet {
    fn from_iter<I: IntoIterator<Item = TokenMetadata>>(iter: I) -> Self {
        Self {
            by_address: iter
                .into_iter()
                .map(|token| (token.address.clone(), token))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPage {
    pub tokens: Vec<TokenMetadata>,
    pub total: i64,
}

#[cfg(test)]
pub(crate) fn token(address: &str, symbol: &str, decimals: i32) -> TokenMetadata {
    TokenMetadata {
        address: address.to_string(),
        name: format!("{symbol} token"),
        symbol: symbol.to_string(),
        decimals,
        logo_uri: format!("https://img.example/{symbol}.png"),
        daily_volume: None,
        freeze_authority: None,
        mint_authority: None,
        permanent_delegate: None,
        minted_at: None,
        tags: None,
        extensions: None,
        created_at: chrono::TimeZone::timestamp_opt(&Utc, 0, 0).unwrap(),
    }
}
