use crate::contracts::{Singleton, SmartAccount};
use crate::signing::sign_user_op;
use crate::types::{PartialUserOperation, UserOperation};
use anyhow::{anyhow, Context, Result};
use ethers::middleware::SignerMiddleware;
use ethers::providers::Middleware;
use ethers::signers::LocalWallet;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, BlockNumber, TransactionRequest, U256};
use std::sync::Arc;

/// Added to `eth_estimateGas`, which assumes a direct call from the owner and misses the
/// account wrapper's execution cost.
pub const CALL_GAS_OVERHEAD: u64 = 55_000;

pub const MISSING_SINGLETON: &str = "must have singleton when using initCode";

/// Field-wise merge: set fields of `op` win, unset fields come from `defaults`.
///
/// No validation happens here. Pass `&UserOperation::default()` for the zero operation.
pub fn fill_user_op(op: &PartialUserOperation, defaults: &UserOperation) -> UserOperation {
    UserOperation {
        target: op.target.unwrap_or(defaults.target),
        nonce: op.nonce.unwrap_or(defaults.nonce),
        init_code: op
            .init_code
            .clone()
            .unwrap_or_else(|| defaults.init_code.clone()),
        call_data: op
            .call_data
            .clone()
            .unwrap_or_else(|| defaults.call_data.clone()),
        call_gas: op.call_gas.unwrap_or(defaults.call_gas),
        max_fee_per_gas: op.max_fee_per_gas.unwrap_or(defaults.max_fee_per_gas),
        max_priority_fee_per_gas: op
            .max_priority_fee_per_gas
            .unwrap_or(defaults.max_priority_fee_per_gas),
        paymaster: op.paymaster.unwrap_or(defaults.paymaster),
        signer: op.signer.unwrap_or(defaults.signer),
        signature: op
            .signature
            .clone()
            .unwrap_or_else(|| defaults.signature.clone()),
    }
}

/// Resolves every unset field of `op` and signs the result with the client's wallet.
///
/// `singleton` is only required when `op` carries `init_code` but no `target`.
///
/// Stages run strictly in order since later ones read what earlier ones resolve:
/// deployment (target, nonce) -> nonce -> call gas -> max fee -> priority fee ->
/// zero-op defaults -> signature. Any failed query aborts the whole fill.
pub async fn fill_and_sign<M: Middleware + 'static>(
    op: &PartialUserOperation,
    client: Arc<SignerMiddleware<M, LocalWallet>>,
    singleton: Option<Address>,
) -> Result<UserOperation> {
    let mut op1 = op.clone();

    resolve_deployment(&mut op1, client.clone(), singleton).await?;
    resolve_nonce(&mut op1, client.clone()).await?;
    resolve_call_gas(&mut op1, &*client).await?;
    resolve_max_fee(&mut op1, &*client).await?;
    resolve_priority_fee(&mut op1, &*client).await?;

    let op2 = fill_user_op(&op1, &UserOperation::default());
    sign_user_op(&op2, client.signer())
}

/// Reads `init_code`, `target`. Sets `nonce` (forced to 0) and `target` (counterfactual
/// address) when deploying.
async fn resolve_deployment<M: Middleware + 'static>(
    op: &mut PartialUserOperation,
    client: Arc<M>,
    singleton: Option<Address>,
) -> Result<()> {
    let Some(init_code) = op.init_code.clone() else {
        return Ok(());
    };

    op.nonce = Some(U256::zero());
    if op.target.is_some() {
        return Ok(());
    }

    let singleton = singleton.ok_or_else(|| anyhow!(MISSING_SINGLETON))?;
    let registry = Singleton::new(singleton, client);
    let target: Address = registry
        .get_account_address(init_code, U256::zero())
        .call()
        .await
        .context("singleton.getAccountAddress failed")?;

    tracing::debug!(?singleton, account = ?target, "derived counterfactual target");
    op.target = Some(target);
    Ok(())
}

/// Reads `target`. Sets `nonce` from the account's `nonce()` view.
async fn resolve_nonce<M: Middleware + 'static>(
    op: &mut PartialUserOperation,
    client: Arc<M>,
) -> Result<()> {
    if op.nonce.is_some() {
        return Ok(());
    }

    let target = op
        .target
        .ok_or_else(|| anyhow!("cannot read nonce: target is not set"))?;
    let account = SmartAccount::new(target, client);
    let nonce: U256 = account
        .nonce()
        .call()
        .await
        .context("account.nonce failed")?;

    tracing::debug!(account = ?target, %nonce, "fetched account nonce");
    op.nonce = Some(nonce);
    Ok(())
}

/// Reads `target`, `call_data`. Sets `call_gas` to a direct-call estimate from the signer
/// plus [`CALL_GAS_OVERHEAD`].
async fn resolve_call_gas<M: Middleware + 'static>(
    op: &mut PartialUserOperation,
    client: &SignerMiddleware<M, LocalWallet>,
) -> Result<()> {
    if op.call_gas.is_some() {
        return Ok(());
    }

    let mut tx = TransactionRequest::new().from(client.address());
    if let Some(target) = op.target {
        tx = tx.to(target);
    }
    if let Some(data) = op.call_data.clone() {
        tx = tx.data(data);
    }
    let tx: TypedTransaction = tx.into();

    let estimated = client
        .estimate_gas(&tx, None)
        .await
        .context("eth_estimateGas failed")?;

    let call_gas = estimated
        .checked_add(U256::from(CALL_GAS_OVERHEAD))
        .filter(|gas| *gas <= U256::from(u64::MAX))
        .ok_or_else(|| {
            anyhow!("callGas estimate {estimated} + {CALL_GAS_OVERHEAD} overflows uint64")
        })?;

    tracing::debug!(%estimated, call_gas = call_gas.as_u64(), "estimated call gas");
    op.call_gas = Some(call_gas.as_u64());
    Ok(())
}

/// Sets `max_fee_per_gas` from `eth_gasPrice`.
async fn resolve_max_fee<M: Middleware + 'static>(
    op: &mut PartialUserOperation,
    client: &M,
) -> Result<()> {
    if op.max_fee_per_gas.is_some() {
        return Ok(());
    }

    let gas_price = client
        .get_gas_price()
        .await
        .context("failed to fetch gas price")?;

    tracing::debug!(%gas_price, "fetched gas price");
    op.max_fee_per_gas = Some(gas_price);
    Ok(())
}

/// Reads `max_fee_per_gas`. Sets `max_priority_fee_per_gas` to the latest block's base fee,
/// or to `max_fee_per_gas` on chains without one.
async fn resolve_priority_fee<M: Middleware + 'static>(
    op: &mut PartialUserOperation,
    client: &M,
) -> Result<()> {
    if op.max_priority_fee_per_gas.is_some() {
        return Ok(());
    }

    let block = client
        .get_block(BlockNumber::Latest)
        .await
        .context("failed to fetch latest block")?
        .ok_or_else(|| anyhow!("latest block not found"))?;

    if block.base_fee_per_gas.is_none() {
        tracing::debug!("latest block has no base fee; using maxFeePerGas");
    }
    op.max_priority_fee_per_gas = block.base_fee_per_gas.or(op.max_fee_per_gas);
    Ok(())
}
