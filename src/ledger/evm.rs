use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};

// ── Provider factory ───────────────────────────────────────────────

/// Read-only HTTP provider.
pub fn read_provider(rpc_url: &str) -> Result<impl Provider + Clone> {
    let url = rpc_url
        .parse()
        .with_context(|| format!("invalid RPC URL '{rpc_url}'"))?;
    Ok(ProviderBuilder::new().connect_http(url))
}

/// HTTP provider that signs with the given private key.
pub fn signer_provider(private_key: &str, rpc_url: &str) -> Result<impl Provider + Clone> {
    let signer: PrivateKeySigner = private_key
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid private key: {e}"))?;
    let wallet = EthereumWallet::from(signer);
    let url = rpc_url
        .parse()
        .with_context(|| format!("invalid RPC URL '{rpc_url}'"))?;
    Ok(ProviderBuilder::new().wallet(wallet).connect_http(url))
}

/// Address derived from a private key.
pub fn address_of(private_key: &str) -> Result<Address> {
    let signer: PrivateKeySigner = private_key
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid private key: {e}"))?;
    Ok(signer.address())
}

// ── Utility functions ──────────────────────────────────────────────

/// Format an address for display (shortened).
pub fn short_addr(addr: &Address) -> String {
    let s = format!("{addr}");
    if s.len() > 10 {
        format!("{}...{}", &s[..6], &s[s.len() - 4..])
    } else {
        s
    }
}
