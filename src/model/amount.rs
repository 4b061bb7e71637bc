use alloy::primitives::U256;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serializer};

/// Token decimals of the staking token (18, like every ERC20 used by the protocol).
pub const TOKEN_DECIMALS: u32 = 18;

/// 10^18 wei per whole token.
pub const WEI_PER_TOKEN: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Parse a decimal string (as returned by the indexer) into a wei amount.
pub fn parse_amount(value: &str) -> Result<U256> {
    U256::from_str_radix(value.trim(), 10)
        .with_context(|| format!("invalid decimal amount '{value}'"))
}

/// Convert a whole-token amount from configuration into wei.
pub fn tokens_to_wei(tokens: u64) -> U256 {
    U256::from(tokens) * WEI_PER_TOKEN
}

/// Sum a sequence of amounts.
pub fn sum<'a>(amounts: impl IntoIterator<Item = &'a U256>) -> U256 {
    amounts.into_iter().fold(U256::ZERO, |acc, a| acc + *a)
}

/// Human-readable token amount: whole tokens with thousands separators,
/// plus two decimals when the fractional part is visible.
///
/// `1234500000000000000000` → `"1,234.50"`, `1234000000000000000000` → `"1,234"`.
pub fn format_tokens(wei: U256) -> String {
    let whole = wei / WEI_PER_TOKEN;
    let cents = (wei % WEI_PER_TOKEN) / U256::from(10_000_000_000_000_000u64);
    let grouped = group_thousands(&whole.to_string());
    if cents.is_zero() {
        grouped
    } else {
        format!("{grouped}.{:0>2}", cents.to_string())
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ── serde helpers ───────────────────────────────────────────────────

/// Deserialize a decimal-string amount into `U256`.
pub fn de_amount<'de, D>(deserializer: D) -> std::result::Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_amount(&raw).map_err(serde::de::Error::custom)
}

/// Deserialize an optional decimal-string amount.
pub fn de_opt_amount<'de, D>(deserializer: D) -> std::result::Result<Option<U256>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    raw.map(|s| parse_amount(&s).map_err(serde::de::Error::custom))
        .transpose()
}

/// Serialize a `U256` as a decimal string.
pub fn ser_amount<S>(value: &U256, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}
