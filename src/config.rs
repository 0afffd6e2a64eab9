use anyhow::{anyhow, Context, Result};
use ethers::signers::LocalWallet;
use ethers::types::Address;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use userop_fixtures::{PartialUserOperation, UserOperation};

/// Reads a (possibly partial) UserOperation JSON file. `-` reads stdin.
pub fn load_partial_op(path: &Path) -> Result<PartialUserOperation> {
    let raw = read_source(path)?;
    parse_partial_op(&raw)
        .with_context(|| format!("failed to parse userOp json at {}", path.display()))
}

/// Reads a complete UserOperation JSON file, e.g. the output of `userop sign`.
pub fn load_complete_op(path: &Path) -> Result<UserOperation> {
    let raw = read_source(path)?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse signed userOp json at {}", path.display()))
}

pub fn parse_partial_op(raw: &str) -> Result<PartialUserOperation> {
    Ok(serde_json::from_str(raw)?)
}

pub fn load_wallet(private_key: Option<&str>) -> Result<LocalWallet> {
    let pk = private_key.ok_or_else(|| {
        anyhow!("missing USEROP_SIGNER_PRIVATE_KEY (or --private-key)")
    })?;
    LocalWallet::from_str(pk.trim()).context("invalid signer private key")
}

pub fn parse_addr(s: &str) -> Result<Address> {
    s.trim()
        .parse::<Address>()
        .map_err(|e| anyhow!("invalid address '{s}': {e}"))
}

fn read_source(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read userOp json from stdin")?;
        return Ok(raw);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read userOp json at {}", path.display()))
}
