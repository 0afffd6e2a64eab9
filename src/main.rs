mod config;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::Signer;
use std::path::PathBuf;
use std::sync::Arc;
use userop_fixtures::encoding::{fmt_address, fmt_bytes, fmt_h256};
use userop_fixtures::signing::personal_digest;
use userop_fixtures::{
    fill_and_sign, fill_user_op, pack_user_op, recover_signer, sign_user_op, user_op_hash,
    UserOperation,
};

#[derive(Parser, Debug)]
#[command(name = "userop", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the packed encoding, hash and signed digest of a UserOperation.
    Pack(OpArgs),

    /// Fill unset fields with the zero-op defaults and sign (no RPC).
    Sign(SignArgs),

    /// Resolve nonce, gas and fees from a node, then sign.
    FillAndSign(FillAndSignArgs),

    /// Recover the signer of a signed UserOperation.
    Recover(OpArgs),
}

#[derive(Args, Debug)]
struct OpArgs {
    /// UserOperation JSON (camelCase fields). Use `-` for stdin.
    #[arg(long)]
    op: PathBuf,
}

#[derive(Args, Debug)]
struct SignerArgs {
    /// Signer private key.
    ///
    /// Recommended: set via env var USEROP_SIGNER_PRIVATE_KEY.
    #[arg(long, env = "USEROP_SIGNER_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,
}

#[derive(Args, Debug)]
struct SignArgs {
    #[command(flatten)]
    op: OpArgs,

    #[command(flatten)]
    signer: SignerArgs,
}

#[derive(Args, Debug)]
struct FillAndSignArgs {
    #[command(flatten)]
    op: OpArgs,

    #[command(flatten)]
    signer: SignerArgs,

    /// Chain RPC URL.
    #[arg(long, env = "USEROP_RPC_URL")]
    rpc: String,

    /// Singleton (account registry) address. Required when the op has initCode but no target.
    #[arg(long, env = "USEROP_SINGLETON")]
    singleton: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        // stdout carries the JSON result only
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Pack(args) => cmd_pack(args),
        Command::Sign(args) => cmd_sign(args),
        Command::FillAndSign(args) => cmd_fill_and_sign(args).await,
        Command::Recover(args) => cmd_recover(args),
    }
}

fn cmd_pack(args: OpArgs) -> Result<()> {
    let partial = config::load_partial_op(&args.op)?;
    let op = fill_user_op(&partial, &UserOperation::default());

    let hash = user_op_hash(&op);
    let out = serde_json::json!({
        "packed": fmt_bytes(&pack_user_op(&op)),
        "userOpHash": fmt_h256(hash),
        "digest": fmt_h256(personal_digest(hash)),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_sign(args: SignArgs) -> Result<()> {
    let wallet = config::load_wallet(args.signer.private_key.as_deref())?;
    let partial = config::load_partial_op(&args.op.op)?;

    let op = fill_user_op(&partial, &UserOperation::default());
    let signed = sign_user_op(&op, &wallet)?;

    tracing::info!(signer = %fmt_address(signed.signer), "signed user operation");
    print_op(&signed)
}

async fn cmd_fill_and_sign(args: FillAndSignArgs) -> Result<()> {
    let wallet = config::load_wallet(args.signer.private_key.as_deref())?;
    let partial = config::load_partial_op(&args.op.op)?;
    let singleton = args
        .singleton
        .as_deref()
        .map(config::parse_addr)
        .transpose()
        .context("invalid --singleton")?;

    let provider = Provider::<Http>::try_from(args.rpc.as_str())
        .with_context(|| format!("invalid RPC URL {}", args.rpc))?;
    let chain_id = provider
        .get_chainid()
        .await
        .context("eth_chainId failed")?
        .as_u64();
    let wallet = wallet.with_chain_id(chain_id);

    tracing::info!(
        chain_id,
        signer = %fmt_address(wallet.address()),
        singleton = ?singleton,
        "filling user operation"
    );

    let client = Arc::new(SignerMiddleware::new(provider, wallet));
    let signed = fill_and_sign(&partial, client, singleton).await?;

    tracing::info!(
        target_account = %fmt_address(signed.target),
        nonce = %signed.nonce,
        call_gas = signed.call_gas,
        "signed user operation"
    );
    print_op(&signed)
}

fn cmd_recover(args: OpArgs) -> Result<()> {
    let op = config::load_complete_op(&args.op)?;
    let recovered = recover_signer(&op)?;

    let out = serde_json::json!({
        "recovered": fmt_address(recovered),
        "signer": fmt_address(op.signer),
        "valid": recovered == op.signer,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn print_op(op: &UserOperation) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(op)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_fill_and_sign_flags() {
        let cli = Cli::try_parse_from([
            "userop",
            "fill-and-sign",
            "--op",
            "op.json",
            "--rpc",
            "http://localhost:8545",
            "--singleton",
            "0x5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e",
            "--private-key",
            "0x01",
        ])
        .unwrap();

        match cli.cmd {
            Command::FillAndSign(args) => {
                assert_eq!(args.op.op.to_str(), Some("op.json"));
                assert_eq!(args.rpc, "http://localhost:8545");
                assert!(args.singleton.is_some());
                assert_eq!(args.signer.private_key.as_deref(), Some("0x01"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn pack_requires_op() {
        assert!(Cli::try_parse_from(["userop", "pack"]).is_err());
    }
}
