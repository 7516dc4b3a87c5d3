//! Conversion between smallest on-chain units and human-readable token amounts.
//!
//! A `TokenAmount` borrows the `TokenMetadata` it was built from, so an amount can only ever
//! be scaled with the decimals of its own mint.

use crate::error::{ScrapError, ScrapResult};
use crate::models::TokenMetadata;

#[derive(Debug, Clone, Copy)]
pub struct TokenAmount<'t> {
    token: &'t TokenMetadata,
    smallest: f64,
}

impl<'t> TokenAmount<'t> {
    /// `smallest = human * 10^decimals`.
    pub fn from_human(token: &'t TokenMetadata, human: f64) -> ScrapResult<Self> {
        if !human.is_finite() || human < 0.0 {
            return Err(ScrapError::validation(format!(
                "amount must be a non-negative number, got {human}"
            )));
        }
        Ok(Self {
            token,
            smallest: human * scale(token),
        })
    }

    /// Parses a smallest-unit amount as reported by the router or the chain.
    pub fn from_smallest_str(token: &'t TokenMetadata, raw: &str) -> ScrapResult<Self> {
        Ok(Self {
            token,
            smallest: parse_smallest(raw, &token.symbol)?,
        })
    }

    pub fn token(&self) -> &'t TokenMetadata {
        self.token
    }

    pub fn smallest(&self) -> f64 {
        self.smallest
    }

    /// Smallest units rounded to an integer, as sent to the router.
    pub fn smallest_units(&self) -> u64 {
        self.smallest.round() as u64
    }

    /// `human = smallest / 10^decimals`.
    pub fn human(&self) -> f64 {
        self.smallest / scale(self.token)
    }
}

fn scale(token: &TokenMetadata) -> f64 {
    match token.precision() {
        0 => 1.0,
        d => 10f64.powi(d as i32),
    }
}

/// Parses a non-negative decimal string. `field` only labels the error.
pub fn parse_smallest(raw: &str, field: &str) -> ScrapResult<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ScrapError::decode(field, "amount is empty"));
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|e| ScrapError::decode(field, format!("'{trimmed}' is not a number: {e}")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(ScrapError::decode(
            field,
            format!("'{trimmed}' is not a non-negative amount"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::token;

    #[test]
    fn test_human_to_smallest() {
        let usdc = token("usdc", "USDC", 6);
        let amount = TokenAmount::from_human(&usdc, 12.5).unwrap();
        assert_eq!(amount.smallest_units(), 12_500_000);

        let sol = token("sol", "SOL", 9);
        assert_eq!(TokenAmount::from_human(&sol, 0.0001).unwrap().smallest_units(), 100_000);
    }

    #[test]
    fn test_smallest_to_human() {
        let sol = token("sol", "SOL", 9);
        let amount = TokenAmount::from_smallest_str(&sol, "2500000000").unwrap();
        assert!((amount.human() - 2.5).abs() < 1e-12);
        assert_eq!(amount.token().address, "sol");
    }

    #[test]
    fn test_zero_decimals_is_identity() {
        let nft = token("nft", "NFT", 0);
        assert_eq!(TokenAmount::from_human(&nft, 7.0).unwrap().smallest(), 7.0);
        assert_eq!(TokenAmount::from_smallest_str(&nft, "42").unwrap().human(), 42.0);
    }

    #[test]
    fn test_round_trip_within_tolerance() {
        for decimals in [0, 2, 6, 9, 12, 18] {
            let t = token("m", "M", decimals);
            for human in [0.0, 0.29, 1.0, 3.14159, 1234.5678, 1e6] {
                let smallest = TokenAmount::from_human(&t, human).unwrap().smallest();
                let back = TokenAmount::from_smallest_str(&t, &format!("{smallest}"))
                    .unwrap()
                    .human();
                let tolerance = f64::EPSILON * 16.0 * human.max(1.0);
                assert!((back - human).abs() <= tolerance, "{human} @ {decimals}: {back}");
            }
        }
    }

    #[test]
    fn test_rounding_avoids_float_truncation() {
        // 0.29 * 100 = 28.999999999999996 in f64.
        let t = token("m", "M", 2);
        assert_eq!(TokenAmount::from_human(&t, 0.29).unwrap().smallest_units(), 29);
    }

    #[test]
    fn test_invalid_inputs() {
        let t = token("m", "M", 6);
        assert_eq!(TokenAmount::from_smallest_str(&t, "").unwrap_err().kind(), "DECODE_FAILURE");
        assert_eq!(TokenAmount::from_smallest_str(&t, "abc").unwrap_err().kind(), "DECODE_FAILURE");
        assert_eq!(TokenAmount::from_smallest_str(&t, "-5").unwrap_err().kind(), "DECODE_FAILURE");
        assert_eq!(TokenAmount::from_smallest_str(&t, "NaN").unwrap_err().kind(), "DECODE_FAILURE");
        assert_eq!(TokenAmount::from_human(&t, -1.0).unwrap_err().kind(), "VALIDATION_FAILURE");
        assert_eq!(
            TokenAmount::from_human(&t, f64::INFINITY).unwrap_err().kind(),
            "VALIDATION_FAILURE"
        );
    }
}
